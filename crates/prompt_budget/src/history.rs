//! Earlier conversation turns that still fit next to the prompt.

use chat_core::{Message, MessageStatus};

use crate::counter::TokenCounter;

/// Pick completed messages, newest first, while their tokens fit in what the
/// budget has left after `used`. Returns them oldest first, ready to send.
///
/// The walk stops at the first message that does not fit; older messages are
/// never packed in behind it.
pub fn fit_history<'a>(
    messages: &'a [Message],
    used: i64,
    budget: i64,
    counter: &dyn TokenCounter,
) -> Vec<&'a Message> {
    let mut used = used;
    let mut kept = Vec::new();
    for message in messages
        .iter()
        .rev()
        .filter(|message| message.status == MessageStatus::Done)
    {
        let tokens = i64::from(counter.count_text(&message.content));
        if used + tokens > budget {
            break;
        }
        used += tokens;
        kept.push(message);
    }
    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::HeuristicTokenCounter;
    use chat_core::CreatorRole;

    fn char_counter() -> HeuristicTokenCounter {
        HeuristicTokenCounter::new(1.0, 1.0)
    }

    fn message(content: &str, status: MessageStatus) -> Message {
        Message::new("c1", CreatorRole::User, content, status)
    }

    fn contents(messages: &[&Message]) -> Vec<String> {
        messages.iter().map(|m| m.content.clone()).collect()
    }

    #[test]
    fn keeps_newest_messages_that_fit() {
        let messages = vec![
            message("aaaaaaaaaa", MessageStatus::Done),
            message("bbbbb", MessageStatus::Done),
            message("ccccc", MessageStatus::Done),
        ];
        let kept = fit_history(&messages, 0, 12, &char_counter());
        assert_eq!(contents(&kept), vec!["bbbbb", "ccccc"]);
    }

    #[test]
    fn skips_unfinished_messages() {
        let messages = vec![
            message("done", MessageStatus::Done),
            message("broken", MessageStatus::Failed),
            message("", MessageStatus::Loading),
        ];
        let kept = fit_history(&messages, 0, 100, &char_counter());
        assert_eq!(contents(&kept), vec!["done"]);
    }

    #[test]
    fn prompt_already_over_budget_keeps_nothing() {
        let messages = vec![message("a", MessageStatus::Done)];
        assert!(fit_history(&messages, 100, 100, &char_counter()).is_empty());
    }
}
