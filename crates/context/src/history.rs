//! History packing: greedy reverse-chronological inclusion of chat turns.
//!
//! Walks history newest-first and keeps each message while it fits under
//! `limit - margin`. The first message that does not fit ends the walk:
//! older messages are never retried, even when they would fit on their own.

use loreweave_core::message::Message;
use loreweave_core::{CollaboratorError, TokenCounter};
use tracing::debug;

use crate::assembler::{DropInfo, LayerStats};
use crate::budget::BudgetTracker;
use crate::token;

/// Result of packing one history.
#[derive(Debug, Clone)]
pub struct PackedHistory {
    /// Kept messages, oldest first
    pub messages: Vec<Message>,
    pub stats: LayerStats,
    pub drop: Option<DropInfo>,
}

/// Packs chat history under the running budget.
#[derive(Debug, Clone, Copy)]
pub struct HistoryPacker {
    /// Margin when any supplementary document group is non-empty
    pub margin_with_documents: usize,
    /// Margin otherwise
    pub margin: usize,
}

impl HistoryPacker {
    pub fn new(margin_with_documents: usize, margin: usize) -> Self {
        Self {
            margin_with_documents,
            margin,
        }
    }

    /// Pack `history` (ordered oldest to newest), charging every kept message.
    pub async fn pack(
        &self,
        history: &[Message],
        has_supplementary_docs: bool,
        counter: &dyn TokenCounter,
        tracker: &mut BudgetTracker,
    ) -> Result<PackedHistory, CollaboratorError> {
        let layer = "history";
        let margin = if has_supplementary_docs {
            self.margin_with_documents
        } else {
            self.margin
        };

        let mut used = 0;
        let mut included: Vec<Message> = Vec::new();
        let mut drop = None;

        for (offset, msg) in history.iter().rev().enumerate() {
            let msg_tokens = token::message_tokens(counter, msg).await?;
            if !tracker.fits(msg_tokens, margin) {
                let overflow = tracker.overflow(msg_tokens, margin);
                let dropped = history.len() - offset;
                debug!(
                    stage = layer,
                    overflow,
                    dropped,
                    margin,
                    "History budget exhausted, dropping older turns"
                );
                drop = Some(DropInfo {
                    layer: layer.into(),
                    items_dropped: dropped,
                    tokens_dropped: msg_tokens,
                    reason: format!("Stopped at first turn over budget by {overflow} tokens"),
                });
                break;
            }
            tracker.charge(msg_tokens);
            used += msg_tokens;
            included.push(msg.clone());
        }

        // Restore chronological order.
        included.reverse();

        let included_count = included.len();
        Ok(PackedHistory {
            messages: included,
            stats: LayerStats {
                name: layer.into(),
                tokens: used,
                items_included: included_count,
                items_total: history.len(),
            },
            drop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::WordCounter;

    fn packer() -> HistoryPacker {
        HistoryPacker::new(480, 80)
    }

    fn words(n: usize) -> String {
        vec!["w"; n].join(" ")
    }

    #[tokio::test]
    async fn everything_fits() {
        let history = vec![Message::user("hello there"), Message::assistant("hi")];
        let mut tracker = BudgetTracker::new(1000);
        let packed = packer()
            .pack(&history, false, &WordCounter, &mut tracker)
            .await
            .unwrap();
        assert_eq!(packed.messages, history);
        // (2 + 1) + (1 + 1)
        assert_eq!(tracker.usage(), 5);
        assert_eq!(packed.stats.tokens, 5);
        assert!(packed.drop.is_none());
    }

    #[tokio::test]
    async fn keeps_newest_in_chronological_order() {
        let history: Vec<Message> = (0..10).map(|i| Message::user(format!("turn {i}"))).collect();
        // Each turn costs 3. Limit 100 - margin 80 leaves 20 → 6 turns.
        let mut tracker = BudgetTracker::new(100);
        let packed = packer()
            .pack(&history, false, &WordCounter, &mut tracker)
            .await
            .unwrap();

        let kept: Vec<&str> = packed.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(kept, vec!["turn 4", "turn 5", "turn 6", "turn 7", "turn 8", "turn 9"]);
        assert_eq!(tracker.usage(), 18);
        let drop = packed.drop.unwrap();
        assert_eq!(drop.items_dropped, 4);
        assert_eq!(drop.layer, "history");
    }

    #[tokio::test]
    async fn stops_at_first_miss() {
        let history = vec![
            Message::user("m1"),
            Message::user(words(50)),
            Message::user("m3"),
        ];
        let mut tracker = BudgetTracker::new(100);
        let packed = packer()
            .pack(&history, false, &WordCounter, &mut tracker)
            .await
            .unwrap();

        // m1 alone would fit, but the walk stopped at m2.
        assert_eq!(packed.messages, vec![Message::user("m3")]);
        assert_eq!(packed.drop.unwrap().items_dropped, 2);
    }

    #[tokio::test]
    async fn documents_widen_the_margin() {
        let history: Vec<Message> = (0..10).map(|i| Message::user(format!("turn {i}"))).collect();
        let mut without = BudgetTracker::new(500);
        let mut with = BudgetTracker::new(500);

        let a = packer().pack(&history, false, &WordCounter, &mut without).await.unwrap();
        let b = packer().pack(&history, true, &WordCounter, &mut with).await.unwrap();

        assert_eq!(a.messages.len(), 10);
        // 500 - 480 = 20 → 6 turns
        assert_eq!(b.messages.len(), 6);
    }

    #[tokio::test]
    async fn respects_prior_usage() {
        let history = vec![Message::user("a"), Message::user("b")];
        let mut tracker = BudgetTracker::new(100);
        tracker.charge(18);
        let packed = packer()
            .pack(&history, false, &WordCounter, &mut tracker)
            .await
            .unwrap();
        // 18 + 2 = 20 fits exactly, the next would not.
        assert_eq!(packed.messages, vec![Message::user("b")]);
        assert_eq!(tracker.usage(), 20);
    }

    #[tokio::test]
    async fn empty_history() {
        let mut tracker = BudgetTracker::new(100);
        let packed = packer().pack(&[], true, &WordCounter, &mut tracker).await.unwrap();
        assert!(packed.messages.is_empty());
        assert_eq!(packed.stats.items_total, 0);
        assert!(packed.drop.is_none());
    }
}
