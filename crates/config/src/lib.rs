//! Configuration loading, validation, and management for loreweave.
//!
//! Loads configuration from `~/.loreweave/config.toml` with environment
//! variable overrides. Validates all settings before the assembler sees them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder the document-summary templates must contain.
pub const DOCUMENTS_PLACEHOLDER: &str = "{{documents}}";

/// Placeholder the lore template must contain.
pub const LORE_PLACEHOLDER: &str = "{{lore}}";

/// The assembler configuration.
///
/// Maps directly to `~/.loreweave/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Nominal token limit for one assembled context
    #[serde(default = "default_token_limit")]
    pub token_limit: usize,

    /// History margin when any document group is non-empty
    #[serde(default = "default_history_margin_with_documents")]
    pub history_margin_with_documents: usize,

    /// History margin when there are no documents
    #[serde(default = "default_margin")]
    pub history_margin: usize,

    /// Margin kept free while folding documents
    #[serde(default = "default_margin")]
    pub document_margin: usize,

    /// Reserve subtracted from the remaining budget before lore injection
    #[serde(default = "default_lore_reserve")]
    pub lore_reserve: usize,

    /// Maximum number of rendered personas kept in the cache
    #[serde(default = "default_persona_cache_capacity")]
    pub persona_cache_capacity: usize,

    /// Text of the acknowledgment emitted after the long-memory summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_memory_ack: Option<String>,

    /// Summary templates
    #[serde(default)]
    pub templates: TemplateConfig,
}

fn default_token_limit() -> usize {
    4096
}
fn default_history_margin_with_documents() -> usize {
    480
}
fn default_margin() -> usize {
    80
}
fn default_lore_reserve() -> usize {
    300
}
fn default_persona_cache_capacity() -> usize {
    64
}

/// Templates used to synthesize summary messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default = "default_long_memory_template")]
    pub long_memory: String,

    #[serde(default = "default_knowledge_template")]
    pub knowledge: String,

    /// Used for extra document groups without their own template
    #[serde(default = "default_extra_documents_template")]
    pub extra_documents: String,

    #[serde(default = "default_lore_template")]
    pub lore: String,
}

fn default_long_memory_template() -> String {
    "Summary of earlier conversation:\n{{documents}}".into()
}
fn default_knowledge_template() -> String {
    "Relevant knowledge:\n{{documents}}".into()
}
fn default_extra_documents_template() -> String {
    "Additional context:\n{{documents}}".into()
}
fn default_lore_template() -> String {
    "[World info]\n{{lore}}".into()
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            long_memory: default_long_memory_template(),
            knowledge: default_knowledge_template(),
            extra_documents: default_extra_documents_template(),
            lore: default_lore_template(),
        }
    }
}

impl ContextConfig {
    /// Load configuration from the default path (~/.loreweave/config.toml).
    ///
    /// `LOREWEAVE_TOKEN_LIMIT` overrides the configured token limit.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(limit) = std::env::var("LOREWEAVE_TOKEN_LIMIT") {
            config.token_limit = limit.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "LOREWEAVE_TOKEN_LIMIT must be a positive integer, got {limit:?}"
                ))
            })?;
            config.validate()?;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".loreweave")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_limit == 0 {
            return Err(ConfigError::ValidationError(
                "token_limit must be greater than 0".into(),
            ));
        }

        for (name, margin) in [
            ("history_margin_with_documents", self.history_margin_with_documents),
            ("history_margin", self.history_margin),
            ("document_margin", self.document_margin),
        ] {
            if margin >= self.token_limit {
                return Err(ConfigError::ValidationError(format!(
                    "{name} ({margin}) must be below token_limit ({})",
                    self.token_limit
                )));
            }
        }

        for (name, template) in [
            ("templates.long_memory", &self.templates.long_memory),
            ("templates.knowledge", &self.templates.knowledge),
            ("templates.extra_documents", &self.templates.extra_documents),
        ] {
            if !template.contains(DOCUMENTS_PLACEHOLDER) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must contain {DOCUMENTS_PLACEHOLDER}"
                )));
            }
        }

        if !self.templates.lore.contains(LORE_PLACEHOLDER) {
            return Err(ConfigError::ValidationError(format!(
                "templates.lore must contain {LORE_PLACEHOLDER}"
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            token_limit: default_token_limit(),
            history_margin_with_documents: default_history_margin_with_documents(),
            history_margin: default_margin(),
            document_margin: default_margin(),
            lore_reserve: default_lore_reserve(),
            persona_cache_capacity: default_persona_cache_capacity(),
            long_memory_ack: None,
            templates: TemplateConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ContextConfig::default();
        assert_eq!(config.token_limit, 4096);
        assert_eq!(config.history_margin_with_documents, 480);
        assert_eq!(config.history_margin, 80);
        assert_eq!(config.lore_reserve, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = ContextConfig {
            long_memory_ack: Some("Noted.".into()),
            ..ContextConfig::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ContextConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let toml_str = r#"
token_limit = 8192
lore_reserve = 500

[templates]
lore = "Lore:\n{{lore}}"
"#;
        let config: ContextConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.token_limit, 8192);
        assert_eq!(config.lore_reserve, 500);
        assert_eq!(config.history_margin, 80);
        assert_eq!(config.templates.lore, "Lore:\n{{lore}}");
        assert_eq!(config.templates.knowledge, default_knowledge_template());
    }

    #[test]
    fn zero_limit_rejected() {
        let config = ContextConfig {
            token_limit: 0,
            ..ContextConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn margin_above_limit_rejected() {
        let config = ContextConfig {
            token_limit: 400,
            ..ContextConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("history_margin_with_documents"));
    }

    #[test]
    fn template_without_placeholder_rejected() {
        let mut config = ContextConfig::default();
        config.templates.knowledge = "Knowledge follows.".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("templates.knowledge"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = ContextConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert_eq!(result.unwrap(), ContextConfig::default());
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "token_limit = 2048\nlong_memory_ack = \"I remember.\"\n").unwrap();

        let config = ContextConfig::load_from(&path).unwrap();
        assert_eq!(config.token_limit, 2048);
        assert_eq!(config.long_memory_ack.as_deref(), Some("I remember."));
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "token_limit = \"lots\"").unwrap();

        let err = ContextConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = ContextConfig::default_toml();
        assert!(toml_str.contains("token_limit = 4096"));
        assert!(toml_str.contains("{{lore}}"));
    }
}
