//! Budgeted context assembly for language-model calls.
//!
//! Builds the ordered message list sent to a model from competing sources,
//! all held under one token limit:
//!
//! | Stage | Source | Trim Strategy |
//! |-------|--------|---------------|
//! | Instructions | Caller text or closure | Never trimmed |
//! | Persona | Rendered character card | Never trimmed |
//! | Input, note, scratchpad | Current turn | Never trimmed, charged first |
//! | History | Chat turns | Oldest dropped, stop at first miss |
//! | Documents | Long memory, knowledge, extra groups | Later documents dropped at first miss |
//! | Lore | World-info entries | Later entries dropped, stop at first miss |
//!
//! Lore and the author's note are spliced by symbolic anchor (see
//! [`position`]) rather than appended.

pub mod assembler;
pub mod budget;
pub mod documents;
pub mod history;
pub mod lore;
pub mod note;
pub mod persona_cache;
pub mod position;
pub mod request;
pub mod scratchpad;
pub mod token;

#[cfg(test)]
mod test_helpers;

pub use assembler::{AssembledContext, AssemblyMetadata, ContextAssembler, DropInfo, LayerStats};
pub use budget::BudgetTracker;
pub use persona_cache::PersonaCache;
pub use request::{AssemblyRequest, Instructions};
pub use scratchpad::{Scratchpad, TraceKind, TraceStep};
pub use token::HeuristicCounter;
