//! Retrieved content fed to the assembler: documents, lore entries and the
//! author's note.
//!
//! Retrieval itself happens elsewhere. These types only describe what came
//! back and where it wants to go.

use serde::{Deserialize, Serialize};

/// A unit of retrieved memory or knowledge content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The text content
    pub text: String,

    /// Opaque metadata, only serialized into the folded summary
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    /// Create a document with empty metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Add a metadata field.
    pub fn with_meta(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The line this document contributes to a folded summary.
    pub fn summary_line(&self) -> String {
        let meta = serde_json::Value::Object(self.metadata.clone());
        format!("{} metadata: {}", self.text, meta)
    }
}

/// A named group of documents folded into a single summary message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentGroup {
    /// Group name, used in diagnostics
    pub name: String,

    /// Template override; `None` uses the configured default for the group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Documents in caller order
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl DocumentGroup {
    pub fn new(name: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            name: name.into(),
            template: None,
            documents,
        }
    }

    /// Use a custom summary template for this group.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Symbolic insertion anchor for lore entries and the author's note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorPosition {
    /// Near the newest chat entry
    InChat,
    /// Before the character description
    BeforeCharDefs,
    /// After the scenario (or description)
    AfterCharDefs,
    /// Before the example exchanges
    BeforeExampleMessages,
    /// After the example exchanges
    AfterExampleMessages,
    /// Before the long-memory acknowledgment, or at the end
    #[default]
    Default,
}

/// A world-info snippet with a preferred insertion anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoreEntry {
    /// Text injected into the context
    pub content: String,

    /// Trigger keywords (matching happens upstream)
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Where the entry wants to be spliced
    #[serde(default)]
    pub insert_position: AnchorPosition,

    /// Reserve override for the lore ceiling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_budget: Option<usize>,
}

impl LoreEntry {
    pub fn new(content: impl Into<String>, insert_position: AnchorPosition) -> Self {
        Self {
            content: content.into(),
            keywords: Vec::new(),
            insert_position,
            token_budget: None,
        }
    }

    pub fn with_token_budget(mut self, budget: usize) -> Self {
        self.token_budget = Some(budget);
        self
    }
}

/// A directive spliced into the context at a configurable depth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorsNote {
    /// Note template, rendered with the request variables
    pub content: String,

    #[serde(default)]
    pub insert_position: AnchorPosition,

    /// Messages counted back from the input for [`AnchorPosition::InChat`]
    #[serde(default)]
    pub insert_depth: usize,

    /// How often the caller injects the note. Not interpreted here.
    #[serde(default)]
    pub insert_frequency: u32,
}

impl AuthorsNote {
    pub fn new(
        content: impl Into<String>,
        insert_position: AnchorPosition,
        insert_depth: usize,
    ) -> Self {
        Self {
            content: content.into(),
            insert_position,
            insert_depth,
            insert_frequency: 1,
        }
    }
}
