//! Error types for the loreweave domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Budget exhaustion is deliberately absent: running out of tokens is a
//! normal outcome of assembly and is reported through diagnostics.

use thiserror::Error;

/// The top-level error type for all loreweave operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Collaborator errors ---
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    // --- Wiring errors ---
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    // --- Persona loading ---
    #[error("Failed to load persona from {path}: {reason}")]
    PersonaLoad { path: String, reason: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised by injected collaborators. Propagated unchanged.
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    #[error("Token counting failed: {0}")]
    TokenCount(String),

    #[error("Template rendering failed: {0}")]
    Render(String),

    #[error("Persona rendering failed for {persona}: {reason}")]
    PersonaRender { persona: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_error_displays_correctly() {
        let err = Error::Collaborator(CollaboratorError::PersonaRender {
            persona: "aria".into(),
            reason: "template missing".into(),
        });
        assert!(err.to_string().contains("aria"));
        assert!(err.to_string().contains("template missing"));
    }

    #[test]
    fn missing_collaborator_names_it() {
        let err = Error::MissingCollaborator("persona renderer");
        assert_eq!(err.to_string(), "Missing collaborator: persona renderer");
    }

    #[test]
    fn collaborator_error_converts() {
        fn fails() -> Result<()> {
            Err(CollaboratorError::TokenCount("offline".into()))?;
            Ok(())
        }
        assert!(matches!(
            fails(),
            Err(Error::Collaborator(CollaboratorError::TokenCount(_)))
        ));
    }
}
