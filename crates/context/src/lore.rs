//! Lore injection: budgets world-info entries and splices them by anchor.
//!
//! The ceiling is computed once, from the budget remaining when injection
//! starts, minus a reserve (the first entry-level `token_budget`, else the
//! configured default). Entries are then taken in caller order; the first
//! one that would cross the ceiling stops injection for every entry after it.
//!
//! Accepted entries are grouped by anchor, one combined system message per
//! anchor. The template text and role label of each group message are
//! charged once the group is rendered. The `Default` group goes right before the long-memory
//! acknowledgment when one is present, otherwise to the end.

use loreweave_core::document::{AnchorPosition, LoreEntry};
use loreweave_core::message::{AnchorTag, Message};
use loreweave_core::{CollaboratorError, TemplateRenderer, TokenCounter, Variables};
use tracing::{debug, warn};

use crate::assembler::{DropInfo, LayerStats};
use crate::budget::BudgetTracker;
use crate::position;
use crate::token;

/// Result of one injection pass.
#[derive(Debug, Clone)]
pub struct InjectedLore {
    /// Tokens charged for accepted entries and their group messages
    pub tokens: usize,
    /// Where each group message landed, in splice order
    pub placements: Vec<(AnchorPosition, usize)>,
    pub stats: LayerStats,
    pub drop: Option<DropInfo>,
}

/// Budgets and splices lore entries.
#[derive(Debug, Clone)]
pub struct LoreInjector {
    /// Reserve used when no entry carries its own budget
    pub default_reserve: usize,
    /// Group template, with `{{lore}}` standing for the joined entries
    pub template: String,
}

impl LoreInjector {
    pub fn new(default_reserve: usize, template: impl Into<String>) -> Self {
        Self {
            default_reserve,
            template: template.into(),
        }
    }

    /// Inject `entries` into `sequence`, charging accepted entries.
    #[allow(clippy::too_many_arguments)]
    pub async fn inject(
        &self,
        entries: &[LoreEntry],
        variables: &Variables,
        counter: &dyn TokenCounter,
        renderer: &dyn TemplateRenderer,
        tracker: &mut BudgetTracker,
        sequence: &mut Vec<Message>,
        system_block_len: usize,
    ) -> Result<InjectedLore, CollaboratorError> {
        let layer = "lore";
        let reserve = entries
            .iter()
            .find_map(|e| e.token_budget)
            .unwrap_or(self.default_reserve);
        let ceiling = tracker
            .limit()
            .saturating_sub(tracker.usage())
            .saturating_sub(reserve);
        if ceiling == 0 {
            warn!(
                reserve,
                usage = tracker.usage(),
                limit = tracker.limit(),
                "Lore reserve leaves no room for entries"
            );
        }

        let candidates: Vec<&LoreEntry> = entries
            .iter()
            .filter(|e| !e.content.is_empty())
            .collect();

        let mut spent = 0;
        let mut accepted = 0;
        let mut drop = None;
        let mut groups: Vec<(AnchorPosition, Vec<&str>, usize)> = Vec::new();

        for (i, entry) in candidates.iter().enumerate() {
            let cost = counter.count(&entry.content).await?;
            let projected = tracker.usage().saturating_add(cost);
            if projected > ceiling {
                let overflow = projected - ceiling;
                let dropped = candidates.len() - i;
                debug!(stage = layer, overflow, dropped, ceiling, "Lore truncated");
                drop = Some(DropInfo {
                    layer: layer.into(),
                    items_dropped: dropped,
                    tokens_dropped: cost,
                    reason: format!("Stopped at first entry over ceiling by {overflow} tokens"),
                });
                break;
            }
            tracker.charge(cost);
            spent += cost;
            accepted += 1;

            match groups.iter_mut().find(|(p, _, _)| *p == entry.insert_position) {
                Some((_, contents, tokens)) => {
                    contents.push(entry.content.as_str());
                    *tokens += cost;
                }
                None => groups.push((entry.insert_position, vec![entry.content.as_str()], cost)),
            }
        }

        let mut placements = Vec::with_capacity(groups.len());
        for (anchor, contents, content_tokens) in groups {
            let mut vars = variables.clone();
            vars.insert("lore".into(), contents.join("\n"));
            let message = Message::system(renderer.render(&self.template, &vars).await?);

            // Entries were charged as they were accepted; the wrapper is not.
            let wrapper = token::message_tokens(counter, &message)
                .await?
                .saturating_sub(content_tokens);
            tracker.charge(wrapper);
            spent += wrapper;

            let index = match anchor {
                AnchorPosition::Default => position::find_tag(sequence, AnchorTag::LongMemoryAck)
                    .unwrap_or(sequence.len()),
                other => position::resolve(sequence, other, system_block_len),
            };
            sequence.insert(index, message);
            placements.push((anchor, index));
        }

        Ok(InjectedLore {
            tokens: spent,
            placements,
            stats: LayerStats {
                name: layer.into(),
                tokens: spent,
                items_included: accepted,
                items_total: candidates.len(),
            },
            drop,
        })
    }
}
