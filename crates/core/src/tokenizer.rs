//! TokenCounter trait: the abstraction over tokenizers.
//!
//! The assembler never tokenizes text itself. It asks a counter, which may
//! be a local BPE table, a remote endpoint, or a heuristic.

use async_trait::async_trait;

use crate::error::CollaboratorError;

/// Counts tokens for a piece of text.
///
/// Implementations must be deterministic: the same text yields the same
/// count for the duration of an assembly call.
#[async_trait]
pub trait TokenCounter: Send + Sync {
    /// Count the tokens in `text`.
    async fn count(&self, text: &str) -> Result<usize, CollaboratorError>;
}
