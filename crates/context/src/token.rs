//! Token counting utilities.
//!
//! [`HeuristicCounter`] uses a character-based heuristic: ~4 characters per
//! token. This approximation is accurate within ~10% for BPE tokenizers on
//! English text and is the default when no real tokenizer is injected.
//!
//! A message costs its content plus its role label plus its speaker name.

use async_trait::async_trait;
use futures::future::try_join_all;
use loreweave_core::message::Message;
use loreweave_core::{CollaboratorError, TokenCounter};

/// Heuristic counter: 1 token ≈ 4 characters, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicCounter;

impl HeuristicCounter {
    pub fn estimate(text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        text.len().div_ceil(4)
    }
}

#[async_trait]
impl TokenCounter for HeuristicCounter {
    async fn count(&self, text: &str) -> Result<usize, CollaboratorError> {
        Ok(Self::estimate(text))
    }
}

/// Token cost of a single message: content + role label + optional name.
pub async fn message_tokens(
    counter: &dyn TokenCounter,
    message: &Message,
) -> Result<usize, CollaboratorError> {
    let mut total = counter.count(&message.content).await?;
    total += counter.count(message.role.as_str()).await?;
    if let Some(name) = &message.name {
        total += counter.count(name).await?;
    }
    Ok(total)
}

/// Per-message costs for independent messages, counted concurrently.
///
/// The returned costs are in input order, so summing them is deterministic.
pub async fn messages_tokens(
    counter: &dyn TokenCounter,
    messages: &[Message],
) -> Result<Vec<usize>, CollaboratorError> {
    try_join_all(messages.iter().map(|m| message_tokens(counter, m))).await
}
