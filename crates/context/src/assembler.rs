//! Context assembly pipeline: the orchestrator.
//!
//! Builds the ordered message list for one model call from these competing
//! sources, in a fixed single pass:
//!
//! 1. **Instructions**: one system message, always first
//! 2. **Persona**: the rendered character block, never trimmed
//! 3. **Input, author's note, scratchpad**: charged up front
//! 4. **History**: newest turns kept, oldest dropped
//! 5. **Documents**: long memory, knowledge, extra groups, one summary each
//! 6. **Lore**: grouped by anchor, spliced into the block built so far
//! 7. **Input** appended, then the author's note spliced relative to it
//! 8. **Scratchpad** appended last
//!
//! # Budget
//!
//! Running out of tokens is never an error. Each stage stops at the first
//! item that does not fit and records a [`DropInfo`]; inclusion decisions
//! are final, so nothing is ever re-evaluated.
//!
//! # Determinism
//!
//! Identical requests produce identical output. No random or
//! time-dependent logic is used during assembly.

use std::sync::Arc;

use loreweave_config::ContextConfig;
use loreweave_core::message::Message;
use loreweave_core::{
    BraceRenderer, CardRenderer, Error, PersonaRenderer, TemplateRenderer, TokenCounter,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::budget::BudgetTracker;
use crate::documents::{DocumentFolder, FoldedGroup};
use crate::history::HistoryPacker;
use crate::lore::LoreInjector;
use crate::note;
use crate::persona_cache::PersonaCache;
use crate::request::AssemblyRequest;
use crate::token::{self, HeuristicCounter};

// ── Types ─────────────────────────────────────────────────────────────────

/// The assembled context, ready for a model call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledContext {
    /// The final ordered message list.
    pub messages: Vec<Message>,
    /// Opaque strings from the persona renderer, passed through untouched.
    pub auxiliary: Vec<String>,
    /// Assembly metadata (token counts, drops, utilization).
    pub metadata: AssemblyMetadata,
}

/// Detailed metadata about the assembly process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    /// Total tokens charged against the budget.
    pub total_tokens: usize,
    /// Configured token limit.
    pub budget: usize,
    /// Budget utilization percentage (0.0–100.0).
    pub utilization_pct: f32,
    /// Per-stage statistics, in assembly order.
    pub per_layer: Vec<LayerStats>,
    /// Truncation events.
    pub drops: Vec<DropInfo>,
}

impl AssemblyMetadata {
    /// Statistics for the named stage, if it ran.
    pub fn layer(&self, name: &str) -> Option<&LayerStats> {
        self.per_layer.iter().find(|l| l.name == name)
    }
}

/// Statistics for a single assembly stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerStats {
    /// Stage name.
    pub name: String,
    /// Tokens charged by this stage.
    pub tokens: usize,
    /// Items included after budget enforcement.
    pub items_included: usize,
    /// Total items available before enforcement.
    pub items_total: usize,
}

impl LayerStats {
    fn complete(name: &str, tokens: usize, items: usize) -> Self {
        Self {
            name: name.into(),
            tokens,
            items_included: items,
            items_total: items,
        }
    }
}

/// A truncation event: a stage stopped before exhausting its candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropInfo {
    /// Which stage.
    pub layer: String,
    /// Number of items never included.
    pub items_dropped: usize,
    /// Cost of the item that failed to fit.
    pub tokens_dropped: usize,
    /// Reason for dropping.
    pub reason: String,
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The context assembler. Holds only shared, thread-safe state, so one
/// instance can serve concurrent calls.
pub struct ContextAssembler {
    config: ContextConfig,
    counter: Arc<dyn TokenCounter>,
    templates: Arc<dyn TemplateRenderer>,
    persona_renderer: Option<Arc<dyn PersonaRenderer>>,
    persona_cache: Arc<PersonaCache>,
}

impl ContextAssembler {
    /// Create an assembler with the heuristic counter, the brace template
    /// renderer and the card persona renderer.
    pub fn new(config: ContextConfig) -> Self {
        let persona_cache = Arc::new(PersonaCache::new(config.persona_cache_capacity));
        Self {
            config,
            counter: Arc::new(HeuristicCounter),
            templates: Arc::new(BraceRenderer),
            persona_renderer: Some(Arc::new(CardRenderer)),
            persona_cache,
        }
    }

    /// Create an assembler with the default configuration (4096 tokens).
    pub fn with_default_config() -> Self {
        Self::new(ContextConfig::default())
    }

    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.counter = counter;
        self
    }

    pub fn with_template_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.templates = renderer;
        self
    }

    pub fn with_persona_renderer(mut self, renderer: Arc<dyn PersonaRenderer>) -> Self {
        self.persona_renderer = Some(renderer);
        self
    }

    /// Remove the persona renderer. Requests carrying a persona then fail.
    pub fn without_persona_renderer(mut self) -> Self {
        self.persona_renderer = None;
        self
    }

    /// Share a persona cache with other assemblers.
    pub fn with_persona_cache(mut self, cache: Arc<PersonaCache>) -> Self {
        self.persona_cache = cache;
        self
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn persona_cache(&self) -> &Arc<PersonaCache> {
        &self.persona_cache
    }

    /// Assemble the message list for `request`.
    ///
    /// # Errors
    ///
    /// Fails only when a collaborator fails (propagated unchanged) or when
    /// the request carries a persona and no persona renderer is configured.
    pub async fn assemble(
        &self,
        request: &AssemblyRequest,
    ) -> loreweave_core::Result<AssembledContext> {
        let counter = self.counter.as_ref();
        let templates = self.templates.as_ref();
        let mut tracker = BudgetTracker::new(self.config.token_limit);
        let mut stats: Vec<LayerStats> = Vec::new();
        let mut drops: Vec<DropInfo> = Vec::new();
        let mut sequence: Vec<Message> = Vec::new();

        let mut variables = request.variables.clone();
        if let Some(persona) = &request.persona {
            variables
                .entry("char".into())
                .or_insert_with(|| persona.name.clone());
        }

        // ── Instructions ───────────────────────────────────────────────────
        if let Some(instructions) = &request.instructions {
            let text = instructions.resolve();
            if !text.is_empty() {
                let message = Message::system(text);
                let tokens = token::message_tokens(counter, &message).await?;
                tracker.charge(tokens);
                stats.push(LayerStats::complete("instructions", tokens, 1));
                sequence.push(message);
            }
        }

        // ── Persona (always included, never trimmed) ───────────────────────
        let mut auxiliary = Vec::new();
        let mut system_block_len = 0;
        if let Some(persona) = &request.persona {
            let renderer = self
                .persona_renderer
                .as_deref()
                .ok_or(Error::MissingCollaborator("persona renderer"))?;
            let rendered = self
                .persona_cache
                .get_or_render(persona, &request.variables, renderer)
                .await?;
            let costs = token::messages_tokens(counter, &rendered.messages).await?;
            let tokens: usize = costs.iter().sum();
            tracker.charge(tokens);
            stats.push(LayerStats::complete("persona", tokens, rendered.messages.len()));
            system_block_len = rendered.messages.len();
            sequence.extend(rendered.messages.iter().cloned());
            auxiliary = rendered.auxiliary.clone();
        }

        // ── Input, author's note, scratchpad (charged before history) ──────
        let input_tokens = token::message_tokens(counter, &request.input).await?;
        let prepared_note = match &request.authors_note {
            Some(n) => note::prepare(n, &variables, counter, templates).await?,
            None => None,
        };

        tracker.charge(input_tokens);
        stats.push(LayerStats::complete("input", input_tokens, 1));
        if let Some(n) = &prepared_note {
            tracker.charge(n.tokens);
            stats.push(LayerStats::complete("authors_note", n.tokens, 1));
        }

        let scratchpad = request
            .scratchpad
            .clone()
            .map(|s| s.into_messages())
            .unwrap_or_default();
        if !scratchpad.is_empty() {
            let costs = token::messages_tokens(counter, &scratchpad).await?;
            let tokens: usize = costs.iter().sum();
            tracker.charge(tokens);
            stats.push(LayerStats::complete("scratchpad", tokens, scratchpad.len()));
        }

        // ── History ────────────────────────────────────────────────────────
        let packer = HistoryPacker::new(
            self.config.history_margin_with_documents,
            self.config.history_margin,
        );
        let packed = packer
            .pack(
                &request.history,
                request.has_supplementary_docs(),
                counter,
                &mut tracker,
            )
            .await?;
        sequence.extend(packed.messages);
        stats.push(packed.stats);
        drops.extend(packed.drop);

        // ── Documents ──────────────────────────────────────────────────────
        let folder = DocumentFolder::new(
            self.config.document_margin,
            self.config.long_memory_ack.clone(),
        );
        let tpl = &self.config.templates;

        if !request.long_memory.is_empty() {
            let folded = folder
                .fold(
                    "long_memory",
                    &request.long_memory,
                    &tpl.long_memory,
                    &variables,
                    counter,
                    templates,
                    &mut tracker,
                )
                .await?;
            let summarized = folded.summary.is_some();
            Self::record_group(folded, &mut sequence, &mut stats, &mut drops);
            if summarized {
                let before = tracker.usage();
                if let Some(ack) = folder.acknowledge(counter, &mut tracker).await? {
                    stats.push(LayerStats::complete(
                        "long_memory_ack",
                        tracker.usage() - before,
                        1,
                    ));
                    sequence.push(ack);
                }
            }
        }

        if !request.knowledge.is_empty() {
            let folded = folder
                .fold(
                    "knowledge",
                    &request.knowledge,
                    &tpl.knowledge,
                    &variables,
                    counter,
                    templates,
                    &mut tracker,
                )
                .await?;
            Self::record_group(folded, &mut sequence, &mut stats, &mut drops);
        }

        for group in request.extra_documents.iter().filter(|g| !g.is_empty()) {
            let template = group.template.as_deref().unwrap_or(&tpl.extra_documents);
            let folded = folder
                .fold(
                    &group.name,
                    &group.documents,
                    template,
                    &variables,
                    counter,
                    templates,
                    &mut tracker,
                )
                .await?;
            Self::record_group(folded, &mut sequence, &mut stats, &mut drops);
        }

        // ── Lore (may splice before the documents) ─────────────────────────
        if !request.lore.is_empty() {
            let injector = LoreInjector::new(self.config.lore_reserve, tpl.lore.clone());
            let injected = injector
                .inject(
                    &request.lore,
                    &variables,
                    counter,
                    templates,
                    &mut tracker,
                    &mut sequence,
                    system_block_len,
                )
                .await?;
            stats.push(injected.stats);
            drops.extend(injected.drop);
        }

        // ── Input, then the note relative to it ────────────────────────────
        sequence.push(request.input.clone());
        if let Some(n) = prepared_note {
            note::inject(n, &mut sequence, system_block_len);
        }

        // ── Scratchpad ─────────────────────────────────────────────────────
        sequence.extend(scratchpad);

        let metadata = AssemblyMetadata {
            total_tokens: tracker.usage(),
            budget: tracker.limit(),
            utilization_pct: tracker.utilization_pct(),
            per_layer: stats,
            drops,
        };

        debug!(
            messages = sequence.len(),
            total_tokens = metadata.total_tokens,
            budget = metadata.budget,
            drops = metadata.drops.len(),
            "Context assembled"
        );

        Ok(AssembledContext {
            messages: sequence,
            auxiliary,
            metadata,
        })
    }

    fn record_group(
        folded: FoldedGroup,
        sequence: &mut Vec<Message>,
        stats: &mut Vec<LayerStats>,
        drops: &mut Vec<DropInfo>,
    ) {
        sequence.extend(folded.summary);
        stats.push(folded.stats);
        drops.extend(folded.drop);
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::with_default_config()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
