//! Template rendering: variable substitution for notes, lore and summaries.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::CollaboratorError;

/// Key/value substitutions available to templates.
///
/// Ordered so that hashing and iteration are deterministic.
pub type Variables = BTreeMap<String, String>;

/// Renders a template against a variable set.
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    async fn render(
        &self,
        template: &str,
        variables: &Variables,
    ) -> Result<String, CollaboratorError>;
}

/// Replaces `{{key}}` placeholders with their values.
///
/// Unknown keys are left verbatim, and an unterminated `{{` is copied
/// through as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceRenderer;

impl BraceRenderer {
    /// Synchronous substitution, shared with the persona card renderer.
    pub fn substitute(template: &str, variables: &Variables) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let key = after[..end].trim();
                    match variables.get(key) {
                        Some(value) => out.push_str(value),
                        None => out.push_str(&rest[start..start + 2 + end + 2]),
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

#[async_trait]
impl TemplateRenderer for BraceRenderer {
    async fn render(
        &self,
        template: &str,
        variables: &Variables,
    ) -> Result<String, CollaboratorError> {
        Ok(Self::substitute(template, variables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_known_keys() {
        let v = vars(&[("char", "Aria"), ("user", "Sam")]);
        assert_eq!(
            BraceRenderer::substitute("{{char}} greets {{ user }}.", &v),
            "Aria greets Sam."
        );
    }

    #[test]
    fn unknown_keys_left_verbatim() {
        let v = vars(&[]);
        assert_eq!(BraceRenderer::substitute("Hi {{who}}!", &v), "Hi {{who}}!");
    }

    #[test]
    fn unterminated_placeholder_copied() {
        let v = vars(&[("a", "1")]);
        assert_eq!(BraceRenderer::substitute("{{a}} and {{b", &v), "1 and {{b");
    }

    #[tokio::test]
    async fn async_render_matches_sync() {
        let v = vars(&[("lore", "Dragons sleep.")]);
        let out = BraceRenderer.render("[World]\n{{lore}}", &v).await.unwrap();
        assert_eq!(out, "[World]\nDragons sleep.");
    }
}
