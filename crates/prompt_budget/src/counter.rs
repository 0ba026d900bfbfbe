//! Token counting for prompt budgeting.
//!
//! Counting runs for every table of a schema during default selection and on
//! every prompt composition, so implementations must be pure and do no I/O.

use std::sync::Arc;

use tiktoken_rs::CoreBPE;

use crate::types::TokenizerError;

/// Trait for token counting implementations.
pub trait TokenCounter: Send + Sync {
    /// Count tokens in a plain text string.
    fn count_text(&self, text: &str) -> u32;
}

/// Arc-wrapped token counter for easy sharing.
pub type SharedTokenCounter = Arc<dyn TokenCounter>;

/// Model-compatible tokenizer backed by tiktoken's `r50k_base` encoding
/// (the GPT-3 byte-pair encoding).
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Load the encoding tables. Done once at process start.
    pub fn new() -> Result<Self, TokenizerError> {
        let bpe = tiktoken_rs::r50k_base().map_err(|e| TokenizerError::Init(e.to_string()))?;
        log::debug!("Loaded r50k_base tokenizer");
        Ok(Self { bpe })
    }
}

impl std::fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenCounter")
            .field("encoding", &"r50k_base")
            .finish()
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_text(&self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }
        u32::try_from(self.bpe.encode_ordinary(text).len()).unwrap_or(u32::MAX)
    }
}

/// Heuristic token counter using character-based estimation.
///
/// Uses the approximation: tokens ≈ characters / 4, with a 10% safety margin.
/// Only built for tests, where `new(1.0, 1.0)` counts one token per character.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone)]
pub struct HeuristicTokenCounter {
    /// Characters per token ratio (default: 4)
    chars_per_token: f64,
    /// Safety margin multiplier (default: 1.1 = 10% extra)
    safety_margin: f64,
}

#[cfg(any(test, feature = "test-utils"))]
impl HeuristicTokenCounter {
    pub fn new(chars_per_token: f64, safety_margin: f64) -> Self {
        Self {
            chars_per_token,
            safety_margin,
        }
    }

    pub fn with_defaults() -> Self {
        Self {
            chars_per_token: 4.0,
            safety_margin: 1.1,
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for HeuristicTokenCounter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl TokenCounter for HeuristicTokenCounter {
    fn count_text(&self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }

        let char_count = text.chars().count() as f64;
        let base_tokens = char_count / self.chars_per_token;
        let adjusted_tokens = base_tokens * self.safety_margin;

        adjusted_tokens.ceil() as u32
    }
}
