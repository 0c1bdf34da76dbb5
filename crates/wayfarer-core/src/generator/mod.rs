//! Content generation boundary.
//!
//! Producers that need generated text go through [`ContentGenerator`]. The
//! live implementation talks to an OpenAI-compatible chat-completions
//! endpoint; without credentials an [`UnconfiguredGenerator`] refuses every
//! call, which producers report as a failure.

pub mod openai;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use openai::OpenAiGenerator;

/// Errors surfaced by a [`ContentGenerator`].
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("content generator is not configured (set OPENAI_API_KEY)")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A system instruction plus the user request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Turns a prompt into generated text.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &Prompt) -> Result<String, GenerationError>;
}

// Compile-time assertion: ContentGenerator must be usable as `dyn ContentGenerator`.
const _: () = {
    fn _assert_object_safe(_: &dyn ContentGenerator) {}
};

/// Refuses every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredGenerator;

#[async_trait]
impl ContentGenerator for UnconfiguredGenerator {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn complete(&self, _prompt: &Prompt) -> Result<String, GenerationError> {
        Err(GenerationError::NotConfigured)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Chat-completions client settings.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout: Duration,
    /// Delay before the first retry; doubles on each subsequent attempt.
    pub retry_backoff: Duration,
}

impl GeneratorConfig {
    pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
    pub const DEFAULT_MODEL: &str = "gpt-4";
    pub const DEFAULT_MAX_TOKENS: u32 = 2000;
    pub const DEFAULT_TEMPERATURE: f64 = 0.7;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
    pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;

    /// Read `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `WAYFARER_MODEL`.
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            api_key: var("OPENAI_API_KEY"),
            base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_owned()),
            model: var("WAYFARER_MODEL").unwrap_or_else(|| Self::DEFAULT_MODEL.to_owned()),
            ..Self::unconfigured()
        }
    }

    /// Defaults with no API key.
    pub fn unconfigured() -> Self {
        Self {
            api_key: None,
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            model: Self::DEFAULT_MODEL.to_owned(),
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            temperature: Self::DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            retry_backoff: Duration::from_millis(Self::DEFAULT_RETRY_BACKOFF_MS),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Build the generator described by `config`.
pub fn generator_from_config(config: &GeneratorConfig) -> Arc<dyn ContentGenerator> {
    if !config.is_configured() {
        tracing::warn!("no OpenAI API key configured, generated content is unavailable");
        return Arc::new(UnconfiguredGenerator);
    }
    match OpenAiGenerator::from_config(config) {
        Ok(generator) => {
            tracing::info!(model = %config.model, "using OpenAI content generator");
            Arc::new(generator)
        }
        Err(e) => {
            tracing::warn!(error = %e, "OpenAI client could not be built");
            Arc::new(UnconfiguredGenerator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_generator_refuses() {
        let err = UnconfiguredGenerator
            .complete(&Prompt::new("system", "user"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured));
    }

    #[test]
    fn unconfigured_defaults() {
        let config = GeneratorConfig::unconfigured();
        assert!(!config.is_configured());
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.temperature, 0.7);
    }

    #[test]
    fn empty_key_is_not_configured() {
        let config = GeneratorConfig {
            api_key: Some(String::new()),
            ..GeneratorConfig::unconfigured()
        };
        assert!(!config.is_configured());
    }

    #[test]
    fn factory_picks_implementation_by_key() {
        let generator = generator_from_config(&GeneratorConfig::unconfigured());
        assert_eq!(generator.name(), "unconfigured");

        let config = GeneratorConfig {
            api_key: Some("sk-test".to_owned()),
            ..GeneratorConfig::unconfigured()
        };
        assert_eq!(generator_from_config(&config).name(), "openai");
    }
}
