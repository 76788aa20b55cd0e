//! Persona system: character cards and their rendering into tagged messages.
//!
//! A persona renders into an ordered block of messages:
//!
//! 1. **System prompt**: untagged system message
//! 2. **Description**: tagged [`AnchorTag::Description`]
//! 3. **Personality**: tagged [`AnchorTag::Personality`]
//! 4. **Scenario**: tagged [`AnchorTag::Scenario`]
//! 5. **Example exchanges**: first and last tagged `ExampleFirst` / `ExampleLast`
//! 6. **First greeting**: tagged [`AnchorTag::FirstMessage`]
//!
//! Each section is optional. Empty sections are silently skipped.
//! The tags are what the position resolver later anchors lore and notes to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{CollaboratorError, Error, Result};
use crate::message::{AnchorTag, Message};
use crate::render::{BraceRenderer, Variables};

/// Stable identity of a persona, used as the render cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonaId(pub String);

impl From<&str> for PersonaId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for PersonaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user/assistant example exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExampleExchange {
    pub user: String,
    pub assistant: String,
}

/// A character card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Persona {
    pub id: PersonaId,

    /// The character's name, exposed to templates as `{{char}}`
    pub name: String,

    #[serde(default)]
    pub system_prompt: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub personality: String,

    #[serde(default)]
    pub scenario: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ExampleExchange>,

    #[serde(default)]
    pub first_message: String,

    /// Stop strings returned to the caller as auxiliary output
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
}

impl Persona {
    /// Create a persona with only an id and a name.
    pub fn new(id: &str, name: impl Into<String>) -> Self {
        Self {
            id: PersonaId::from(id),
            name: name.into(),
            system_prompt: String::new(),
            description: String::new(),
            personality: String::new(),
            scenario: String::new(),
            examples: Vec::new(),
            first_message: String::new(),
            stop_sequences: Vec::new(),
        }
    }

    /// Load a character card from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::PersonaLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let persona: Self = serde_json::from_str(&content).map_err(|e| Error::PersonaLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!(persona = %persona.id, file = %path.display(), "Loaded persona card");
        Ok(persona)
    }
}

/// The output of rendering a persona.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPersona {
    /// The system-prompt block, in order
    pub messages: Vec<Message>,

    /// Opaque strings passed through to the caller
    pub auxiliary: Vec<String>,
}

/// Renders a persona into its message block.
#[async_trait]
pub trait PersonaRenderer: Send + Sync {
    async fn render(
        &self,
        persona: &Persona,
        variables: &Variables,
    ) -> std::result::Result<RenderedPersona, CollaboratorError>;
}

/// Renders a [`Persona`] card section by section with `{{key}}` substitution.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardRenderer;

impl CardRenderer {
    fn section(text: &str, variables: &Variables) -> Option<String> {
        let rendered = BraceRenderer::substitute(text.trim(), variables);
        if rendered.is_empty() {
            None
        } else {
            Some(rendered)
        }
    }
}

#[async_trait]
impl PersonaRenderer for CardRenderer {
    async fn render(
        &self,
        persona: &Persona,
        variables: &Variables,
    ) -> std::result::Result<RenderedPersona, CollaboratorError> {
        let mut vars = variables.clone();
        vars.entry("char".into()).or_insert_with(|| persona.name.clone());

        let mut messages = Vec::new();

        if let Some(text) = Self::section(&persona.system_prompt, &vars) {
            messages.push(Message::system(text));
        }
        if let Some(text) = Self::section(&persona.description, &vars) {
            messages.push(Message::system(text).with_tag(AnchorTag::Description));
        }
        if let Some(text) = Self::section(&persona.personality, &vars) {
            messages.push(Message::system(text).with_tag(AnchorTag::Personality));
        }
        if let Some(text) = Self::section(&persona.scenario, &vars) {
            messages.push(Message::system(text).with_tag(AnchorTag::Scenario));
        }

        let mut examples = Vec::new();
        for exchange in &persona.examples {
            if let Some(text) = Self::section(&exchange.user, &vars) {
                examples.push(Message::user(text));
            }
            if let Some(text) = Self::section(&exchange.assistant, &vars) {
                examples.push(Message::assistant(text));
            }
        }
        if let Some(first) = examples.first_mut() {
            first.tag = Some(AnchorTag::ExampleFirst);
        }
        // A single example message keeps its ExampleFirst tag.
        if examples.len() > 1 {
            if let Some(last) = examples.last_mut() {
                last.tag = Some(AnchorTag::ExampleLast);
            }
        }
        messages.extend(examples);

        if let Some(text) = Self::section(&persona.first_message, &vars) {
            messages.push(Message::assistant(text).with_tag(AnchorTag::FirstMessage));
        }

        let auxiliary = persona
            .stop_sequences
            .iter()
            .map(|s| BraceRenderer::substitute(s, &vars))
            .collect();

        Ok(RenderedPersona {
            messages,
            auxiliary,
        })
    }
}
