use chat_core::{Conversation, Message, MessageStatus, SelectionState};
use tokio::sync::RwLock;

/// Conversations and their messages.
#[derive(Default)]
pub struct ConversationService {
    conversations: RwLock<Vec<Conversation>>,
    messages: RwLock<Vec<Message>>,
}

impl ConversationService {
    pub fn new(conversations: Vec<Conversation>, messages: Vec<Message>) -> Self {
        Self {
            conversations: RwLock::new(conversations),
            messages: RwLock::new(messages),
        }
    }

    pub async fn list(&self) -> Vec<Conversation> {
        self.conversations.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Conversation> {
        self.conversations
            .read()
            .await
            .iter()
            .find(|conversation| conversation.id == id)
            .cloned()
    }

    pub async fn create(&self, conversation: Conversation) -> Conversation {
        tracing::info!(conversation_id = %conversation.id, "Conversation created");
        self.conversations.write().await.push(conversation.clone());
        conversation
    }

    /// Apply `f` to a conversation and return the updated copy.
    pub async fn update<F>(&self, id: &str, f: F) -> Option<Conversation>
    where
        F: FnOnce(&mut Conversation),
    {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations.iter_mut().find(|c| c.id == id)?;
        f(conversation);
        Some(conversation.clone())
    }

    /// Remove a conversation together with its messages.
    pub async fn delete(&self, id: &str) -> bool {
        let removed = {
            let mut conversations = self.conversations.write().await;
            let before = conversations.len();
            conversations.retain(|conversation| conversation.id != id);
            conversations.len() != before
        };
        if removed {
            self.messages
                .write()
                .await
                .retain(|message| message.conversation_id != id);
            tracing::info!(conversation_id = %id, "Conversation deleted");
        }
        removed
    }

    /// Turn every conversation on a deleted connection back into a general
    /// chat. Returns how many were touched.
    pub async fn detach_connection(&self, connection_id: &str) -> usize {
        let mut detached = 0;
        for conversation in self
            .conversations
            .write()
            .await
            .iter_mut()
            .filter(|c| c.connection_id.as_deref() == Some(connection_id))
        {
            conversation.connection_id = None;
            conversation.database_name = None;
            conversation.selection = SelectionState::default();
            detached += 1;
        }
        detached
    }

    /// Messages of a conversation in the order they were added.
    pub async fn messages(&self, conversation_id: &str) -> Vec<Message> {
        self.messages
            .read()
            .await
            .iter()
            .filter(|message| message.conversation_id == conversation_id)
            .cloned()
            .collect()
    }

    pub async fn all_messages(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }

    pub async fn push_message(&self, message: Message) {
        self.messages.write().await.push(message);
    }

    /// Store the final content and status of a streamed reply.
    pub async fn finish_message(&self, id: &str, content: String, status: MessageStatus) -> bool {
        let mut messages = self.messages.write().await;
        match messages.iter_mut().find(|message| message.id == id) {
            Some(message) => {
                message.content = content;
                message.status = status;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delete_drops_messages_of_that_conversation_only() {
        let service = ConversationService::default();
        let kept = service.create(Conversation::new("bot", "kept")).await;
        let dropped = service.create(Conversation::new("bot", "dropped")).await;
        service.push_message(Message::user(kept.id.clone(), "a")).await;
        service.push_message(Message::user(dropped.id.clone(), "b")).await;

        assert!(service.delete(&dropped.id).await);
        assert!(!service.delete(&dropped.id).await);
        assert_eq!(service.all_messages().await.len(), 1);
        assert_eq!(service.messages(&kept.id).await[0].content, "a");
    }

    #[tokio::test]
    async fn finish_message_sets_content_and_status() {
        let service = ConversationService::default();
        let pending = Message::pending_reply("c1");
        let id = pending.id.clone();
        service.push_message(pending).await;

        assert!(
            service
                .finish_message(&id, "SELECT 1;".to_string(), MessageStatus::Done)
                .await
        );
        let message = &service.messages("c1").await[0];
        assert_eq!(message.content, "SELECT 1;");
        assert_eq!(message.status, MessageStatus::Done);
        assert!(!service.finish_message("nope", String::new(), MessageStatus::Done).await);
    }

    #[tokio::test]
    async fn detach_connection_resets_selection() {
        let service = ConversationService::default();
        let mut attached = Conversation::new("bot", "attached");
        attached.connection_id = Some("c1".to_string());
        attached.database_name = Some("app".to_string());
        attached.selection.select_schema("public");
        let attached = service.create(attached).await;
        service.create(Conversation::new("bot", "general")).await;

        assert_eq!(service.detach_connection("c1").await, 1);
        let conversation = service.get(&attached.id).await.unwrap();
        assert!(conversation.connection_id.is_none());
        assert!(conversation.database_name.is_none());
        assert_eq!(conversation.selection, SelectionState::default());
    }

    #[tokio::test]
    async fn update_returns_none_for_unknown_id() {
        let service = ConversationService::default();
        assert!(service.update("nope", |c| c.title.clear()).await.is_none());
    }
}
