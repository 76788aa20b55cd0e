//! # loreweave core
//!
//! Domain types, collaborator traits, and error definitions for the loreweave
//! context assembly engine. This crate has **no assembly logic**. It defines
//! the domain model that the assembler and its collaborators share.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (token counting, template rendering, persona
//! rendering) is a trait here. Implementations are injected. This enables:
//! - Swapping a heuristic counter for a real tokenizer
//! - Easy testing with deterministic stub collaborators
//! - Clean dependency graph (all crates depend inward on core)

pub mod document;
pub mod error;
pub mod message;
pub mod persona;
pub mod render;
pub mod tokenizer;

// Re-export key types at crate root for ergonomics
pub use document::{AnchorPosition, AuthorsNote, Document, DocumentGroup, LoreEntry};
pub use error::{CollaboratorError, Error, Result};
pub use message::{AnchorTag, Message, Role};
pub use persona::{
    CardRenderer, ExampleExchange, Persona, PersonaId, PersonaRenderer, RenderedPersona,
};
pub use render::{BraceRenderer, TemplateRenderer, Variables};
pub use tokenizer::TokenCounter;
