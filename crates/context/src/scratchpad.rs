//! Agent scratchpad: the in-progress record of the current turn.
//!
//! Appended after the user input, so the model sees its own intermediate
//! reasoning and tool observations last. The scratchpad is never trimmed:
//! its cost is charged up front and history makes room for it.

use loreweave_core::message::Message;
use serde::{Deserialize, Serialize};

/// The kind of reasoning trace step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Thought,
    Action,
    Observation,
}

/// A single step of an agent trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceStep {
    pub kind: TraceKind,
    pub content: String,
}

impl TraceStep {
    pub fn thought(content: impl Into<String>) -> Self {
        Self {
            kind: TraceKind::Thought,
            content: content.into(),
        }
    }

    pub fn action(content: impl Into<String>) -> Self {
        Self {
            kind: TraceKind::Action,
            content: content.into(),
        }
    }

    pub fn observation(content: impl Into<String>) -> Self {
        Self {
            kind: TraceKind::Observation,
            content: content.into(),
        }
    }

    /// Thoughts and actions come from the model; observations are fed back
    /// as user turns.
    fn to_message(&self) -> Message {
        match self.kind {
            TraceKind::Thought => Message::assistant(format!("Thought: {}", self.content)),
            TraceKind::Action => Message::assistant(format!("Action: {}", self.content)),
            TraceKind::Observation => Message::user(format!("Observation: {}", self.content)),
        }
    }
}

/// Scratchpad content supplied with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scratchpad {
    Messages(Vec<Message>),
    Single(Message),
    /// Coerced to an assistant message
    Text(String),
}

impl Scratchpad {
    /// Build a scratchpad from an agent trace.
    pub fn from_trace(steps: &[TraceStep]) -> Self {
        Self::Messages(steps.iter().map(TraceStep::to_message).collect())
    }

    /// The messages this scratchpad contributes, in order.
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            Self::Messages(messages) => messages,
            Self::Single(message) => vec![message],
            Self::Text(text) => vec![Message::assistant(text)],
        }
    }
}

impl From<Vec<Message>> for Scratchpad {
    fn from(messages: Vec<Message>) -> Self {
        Self::Messages(messages)
    }
}

impl From<Message> for Scratchpad {
    fn from(message: Message) -> Self {
        Self::Single(message)
    }
}

impl From<String> for Scratchpad {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Scratchpad {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}
