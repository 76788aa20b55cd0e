//! Message domain types.
//!
//! A [`Message`] is the unit the context assembler moves around: persona
//! blocks, history turns, summaries, lore and notes all end up as messages
//! in one ordered sequence handed to the model.

use serde::{Deserialize, Serialize};

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions, persona definitions, injected context
    System,
    /// The end user
    User,
    /// The model
    Assistant,
}

impl Role {
    /// The label the model sees for this role. Counted as part of the
    /// message's token cost.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural marker on a message, used to resolve insertion anchors.
///
/// Tags are set by whoever emits the message (the persona renderer, the
/// document folder). The assembler only reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorTag {
    /// Character description block
    Description,
    /// Character personality block
    Personality,
    /// Scenario block
    Scenario,
    /// First message of the example exchanges
    ExampleFirst,
    /// Last message of the example exchanges
    ExampleLast,
    /// The character's opening greeting
    FirstMessage,
    /// Acknowledgment that follows the long-memory summary
    LongMemoryAck,
}

/// A single message in the assembled context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Optional speaker name (counted toward the token cost)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Structural anchor, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<AnchorTag>,
}

impl Message {
    /// Create a message with the given role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tag: None,
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Attach an anchor tag.
    pub fn with_tag(mut self, tag: AnchorTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Attach a speaker name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether this message carries the given tag.
    pub fn has_tag(&self, tag: AnchorTag) -> bool {
        self.tag == Some(tag)
    }
}
