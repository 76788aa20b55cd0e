//! Document folding: merges a document group into one summary message.
//!
//! Documents are taken in caller order until the summary message would push
//! usage past `limit - margin`; the rest of the group is dropped. Survivors
//! are joined as `"{text} metadata: {json}"` lines and interpolated into the
//! group's template under `{{documents}}`. The whole rendered message is
//! charged, template text included.

use loreweave_core::document::Document;
use loreweave_core::message::{AnchorTag, Message};
use loreweave_core::{CollaboratorError, TemplateRenderer, TokenCounter, Variables};
use tracing::debug;

use crate::assembler::{DropInfo, LayerStats};
use crate::budget::BudgetTracker;
use crate::token;

/// Result of folding one group.
#[derive(Debug, Clone)]
pub struct FoldedGroup {
    /// The synthesized system message, if any document survived
    pub summary: Option<Message>,
    pub stats: LayerStats,
    pub drop: Option<DropInfo>,
}

/// Folds document groups under the running budget.
#[derive(Debug, Clone)]
pub struct DocumentFolder {
    pub margin: usize,
    /// Acknowledgment emitted after the long-memory summary
    pub long_memory_ack: Option<String>,
}

impl DocumentFolder {
    pub fn new(margin: usize, long_memory_ack: Option<String>) -> Self {
        Self {
            margin,
            long_memory_ack,
        }
    }

    /// Fold the documents of group `name` using `template`, charging the
    /// emitted summary message.
    #[allow(clippy::too_many_arguments)]
    pub async fn fold(
        &self,
        name: &str,
        documents: &[Document],
        template: &str,
        variables: &Variables,
        counter: &dyn TokenCounter,
        renderer: &dyn TemplateRenderer,
        tracker: &mut BudgetTracker,
    ) -> Result<FoldedGroup, CollaboratorError> {
        let layer = format!("documents:{name}");
        let candidates: Vec<&Document> = documents.iter().filter(|d| !d.text.is_empty()).collect();
        if candidates.is_empty() {
            return Ok(FoldedGroup {
                summary: None,
                stats: LayerStats {
                    name: layer,
                    tokens: 0,
                    items_included: 0,
                    items_total: 0,
                },
                drop: None,
            });
        }

        // The emitted message costs its lines plus the template, the role
        // label and one separator per extra line.
        let overhead = self
            .template_overhead(template, variables, counter, renderer)
            .await?;
        let separator = counter.count("\n").await?;

        let mut projected = overhead;
        let mut lines = Vec::new();
        let mut drop = None;

        for (i, doc) in candidates.iter().enumerate() {
            let line = doc.summary_line();
            let doc_tokens = counter.count(&line).await?;
            let step = if lines.is_empty() {
                doc_tokens
            } else {
                doc_tokens + separator
            };
            if !tracker.fits(projected + step, self.margin) {
                let overflow = tracker.overflow(projected + step, self.margin);
                let dropped = candidates.len() - i;
                debug!(
                    stage = "documents",
                    group = name,
                    overflow,
                    dropped,
                    "Document budget exhausted"
                );
                drop = Some(DropInfo {
                    layer: layer.clone(),
                    items_dropped: dropped,
                    tokens_dropped: doc_tokens,
                    reason: format!("Stopped at first document over budget by {overflow} tokens"),
                });
                break;
            }
            projected += step;
            lines.push(line);
        }

        let mut used = 0;
        let summary = if lines.is_empty() {
            None
        } else {
            let mut vars = variables.clone();
            vars.insert("documents".into(), lines.join("\n"));
            let message = Message::system(renderer.render(template, &vars).await?);
            used = token::message_tokens(counter, &message).await?;
            tracker.charge(used);
            Some(message)
        };

        Ok(FoldedGroup {
            summary,
            stats: LayerStats {
                name: layer,
                tokens: used,
                items_included: lines.len(),
                items_total: candidates.len(),
            },
            drop,
        })
    }

    /// Cost of the summary message with no documents in it.
    async fn template_overhead(
        &self,
        template: &str,
        variables: &Variables,
        counter: &dyn TokenCounter,
        renderer: &dyn TemplateRenderer,
    ) -> Result<usize, CollaboratorError> {
        let mut vars = variables.clone();
        vars.insert("documents".into(), String::new());
        let empty = Message::system(renderer.render(template, &vars).await?);
        token::message_tokens(counter, &empty).await
    }

    /// The tagged acknowledgment that follows a long-memory summary, charged
    /// against the budget. `None` when no acknowledgment is configured.
    pub async fn acknowledge(
        &self,
        counter: &dyn TokenCounter,
        tracker: &mut BudgetTracker,
    ) -> Result<Option<Message>, CollaboratorError> {
        let Some(text) = &self.long_memory_ack else {
            return Ok(None);
        };
        let message = Message::assistant(text.clone()).with_tag(AnchorTag::LongMemoryAck);
        tracker.charge(token::message_tokens(counter, &message).await?);
        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::WordCounter;
    use loreweave_core::BraceRenderer;
    use loreweave_core::document::DocumentGroup;

    const TEMPLATE: &str = "Memories:\n{{documents}}";

    fn folder() -> DocumentFolder {
        DocumentFolder::new(80, None)
    }

    async fn fold(group: &DocumentGroup, tracker: &mut BudgetTracker) -> FoldedGroup {
        folder()
            .fold(
                &group.name,
                &group.documents,
                TEMPLATE,
                &Variables::new(),
                &WordCounter,
                &BraceRenderer,
                tracker,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn folds_into_single_system_message() {
        let group = DocumentGroup::new(
            "long_memory",
            vec![
                Document::new("Sam owns a cat.").with_meta("turn", 3),
                Document::new("Sam lives in Oslo."),
            ],
        );
        let mut tracker = BudgetTracker::new(1000);
        let folded = fold(&group, &mut tracker).await;

        let summary = folded.summary.unwrap();
        assert_eq!(
            summary.content,
            "Memories:\nSam owns a cat. metadata: {\"turn\":3}\nSam lives in Oslo. metadata: {}"
        );
        assert_eq!(summary.role, loreweave_core::Role::System);
        assert_eq!(folded.stats.items_included, 2);
        // "Memories:" 1, two lines of 6, role label 1
        assert_eq!(tracker.usage(), 14);
        assert_eq!(folded.stats.tokens, 14);
    }

    #[tokio::test]
    async fn skips_empty_documents() {
        let group = DocumentGroup::new(
            "knowledge",
            vec![Document::new(""), Document::new("fact"), Document::new("")],
        );
        let mut tracker = BudgetTracker::new(1000);
        let folded = fold(&group, &mut tracker).await;
        assert_eq!(folded.stats.items_total, 1);
        assert_eq!(folded.stats.items_included, 1);
    }

    #[tokio::test]
    async fn stops_at_first_oversized_document() {
        let big = vec!["x"; 40].join(" ");
        let group = DocumentGroup::new(
            "knowledge",
            vec![Document::new("a"), Document::new(big), Document::new("b")],
        );
        // 100 - 80 = 20 available
        let mut tracker = BudgetTracker::new(100);
        let folded = fold(&group, &mut tracker).await;

        assert_eq!(folded.stats.items_included, 1);
        assert!(!folded.summary.unwrap().content.contains("b metadata"));
        let drop = folded.drop.unwrap();
        assert_eq!(drop.items_dropped, 2);
        assert_eq!(drop.layer, "documents:knowledge");
    }

    #[tokio::test]
    async fn template_text_counts_against_the_margin() {
        let template = "one two three four five six seven eight nine ten \
                        eleven twelve thirteen fourteen fifteen sixteen {{documents}}";
        let docs = vec![Document::new("a"), Document::new("b")];
        // 20 available: template 16 + role 1 + "a metadata: {}" 3 fills it.
        let mut tracker = BudgetTracker::new(100);
        let folded = folder()
            .fold(
                "knowledge",
                &docs,
                template,
                &Variables::new(),
                &WordCounter,
                &BraceRenderer,
                &mut tracker,
            )
            .await
            .unwrap();

        let summary = folded.summary.unwrap();
        assert_eq!(folded.stats.items_included, 1);
        assert_eq!(folded.drop.unwrap().items_dropped, 1);
        assert_eq!(tracker.usage(), 20);
        assert_eq!(
            token::message_tokens(&WordCounter, &summary).await.unwrap(),
            tracker.usage()
        );
    }

    #[tokio::test]
    async fn nothing_fits_yields_no_message() {
        let group = DocumentGroup::new("knowledge", vec![Document::new("a b c")]);
        let mut tracker = BudgetTracker::new(100);
        tracker.charge(20);
        let folded = fold(&group, &mut tracker).await;
        assert!(folded.summary.is_none());
        assert_eq!(tracker.usage(), 20);
    }

    #[tokio::test]
    async fn acknowledgment_is_tagged_and_charged() {
        let with_ack = DocumentFolder::new(80, Some("I remember.".into()));
        let mut tracker = BudgetTracker::new(100);
        let ack = with_ack.acknowledge(&WordCounter, &mut tracker).await.unwrap().unwrap();
        assert!(ack.has_tag(AnchorTag::LongMemoryAck));
        assert_eq!(tracker.usage(), 3);

        let none = folder().acknowledge(&WordCounter, &mut tracker).await.unwrap();
        assert!(none.is_none());
        assert_eq!(tracker.usage(), 3);
    }
}
