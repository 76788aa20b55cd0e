//! Shared test collaborators.

use async_trait::async_trait;
use loreweave_core::{
    CollaboratorError, Persona, PersonaRenderer, RenderedPersona, TemplateRenderer, TokenCounter,
    Variables,
};
use std::sync::atomic::{AtomicUsize, Ordering};

/// One token per whitespace-separated word. Role labels therefore cost 1.
pub struct WordCounter;

#[async_trait]
impl TokenCounter for WordCounter {
    async fn count(&self, text: &str) -> Result<usize, CollaboratorError> {
        Ok(text.split_whitespace().count())
    }
}

/// A counter that always fails.
pub struct FailingCounter;

#[async_trait]
impl TokenCounter for FailingCounter {
    async fn count(&self, _text: &str) -> Result<usize, CollaboratorError> {
        Err(CollaboratorError::TokenCount("tokenizer offline".into()))
    }
}

/// A template renderer that always fails.
pub struct FailingRenderer;

#[async_trait]
impl TemplateRenderer for FailingRenderer {
    async fn render(
        &self,
        _template: &str,
        _variables: &Variables,
    ) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Render("template engine offline".into()))
    }
}

/// A persona renderer that always fails.
pub struct FailingPersonaRenderer;

#[async_trait]
impl PersonaRenderer for FailingPersonaRenderer {
    async fn render(
        &self,
        persona: &Persona,
        _variables: &Variables,
    ) -> Result<RenderedPersona, CollaboratorError> {
        Err(CollaboratorError::PersonaRender {
            persona: persona.id.to_string(),
            reason: "card is corrupt".into(),
        })
    }
}

/// Wraps the card renderer and counts how often it is invoked.
#[derive(Default)]
pub struct CountingRenderer {
    calls: AtomicUsize,
}

impl CountingRenderer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersonaRenderer for CountingRenderer {
    async fn render(
        &self,
        persona: &Persona,
        variables: &Variables,
    ) -> Result<RenderedPersona, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        loreweave_core::CardRenderer.render(persona, variables).await
    }
}
