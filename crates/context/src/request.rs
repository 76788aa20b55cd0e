//! The typed single-call input bundle.

use loreweave_core::document::{AuthorsNote, Document, DocumentGroup, LoreEntry};
use loreweave_core::message::Message;
use loreweave_core::{Persona, Variables};
use std::sync::Arc;

use crate::scratchpad::Scratchpad;

/// Pre-rendered instructions, either fixed or produced on demand.
#[derive(Clone)]
pub enum Instructions {
    Static(String),
    Deferred(Arc<dyn Fn() -> String + Send + Sync>),
}

impl Instructions {
    pub fn deferred(f: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self::Deferred(Arc::new(f))
    }

    pub fn resolve(&self) -> String {
        match self {
            Self::Static(text) => text.clone(),
            Self::Deferred(f) => f(),
        }
    }
}

impl std::fmt::Debug for Instructions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<&str> for Instructions {
    fn from(text: &str) -> Self {
        Self::Static(text.to_string())
    }
}

impl From<String> for Instructions {
    fn from(text: String) -> Self {
        Self::Static(text)
    }
}

/// Everything the assembler needs for one call.
#[derive(Debug, Clone)]
pub struct AssemblyRequest {
    /// The current-turn user message
    pub input: Message,
    /// Chat history, oldest first
    pub history: Vec<Message>,
    pub persona: Option<Persona>,
    /// Substitutions for persona, note, lore and summary templates
    pub variables: Variables,
    pub instructions: Option<Instructions>,
    pub long_memory: Vec<Document>,
    pub knowledge: Vec<Document>,
    pub extra_documents: Vec<DocumentGroup>,
    pub lore: Vec<LoreEntry>,
    pub authors_note: Option<AuthorsNote>,
    pub scratchpad: Option<Scratchpad>,
}

impl AssemblyRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self::from_message(Message::user(input))
    }

    pub fn from_message(input: Message) -> Self {
        Self {
            input,
            history: Vec::new(),
            persona: None,
            variables: Variables::new(),
            instructions: None,
            long_memory: Vec::new(),
            knowledge: Vec::new(),
            extra_documents: Vec::new(),
            lore: Vec::new(),
            authors_note: None,
            scratchpad: None,
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = Some(persona);
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<Instructions>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_long_memory(mut self, documents: Vec<Document>) -> Self {
        self.long_memory = documents;
        self
    }

    pub fn with_knowledge(mut self, documents: Vec<Document>) -> Self {
        self.knowledge = documents;
        self
    }

    pub fn with_extra_documents(mut self, group: DocumentGroup) -> Self {
        self.extra_documents.push(group);
        self
    }

    pub fn with_lore(mut self, entries: Vec<LoreEntry>) -> Self {
        self.lore = entries;
        self
    }

    pub fn with_authors_note(mut self, note: AuthorsNote) -> Self {
        self.authors_note = Some(note);
        self
    }

    pub fn with_scratchpad(mut self, scratchpad: impl Into<Scratchpad>) -> Self {
        self.scratchpad = Some(scratchpad.into());
        self
    }

    /// Whether any document group has content. Widens the history margin.
    pub fn has_supplementary_docs(&self) -> bool {
        !self.long_memory.is_empty()
            || !self.knowledge.is_empty()
            || self.extra_documents.iter().any(|g| !g.is_empty())
    }
}
