pub mod providers;

use crate::config::LlmConfig;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum LlmError {
    ConnectionError(String),
    ResponseError(String),
    ConfigError(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ConnectionError(msg) => write!(f, "LLM connection error: {}", msg),
            LlmError::ResponseError(msg) => write!(f, "LLM response error: {}", msg),
            LlmError::ConfigError(msg) => write!(f, "LLM configuration error: {}", msg),
        }
    }
}

impl Error for LlmError {}

/// A single blocking chat-completion call: system instruction plus user
/// content in, free text out. One call per request, no streaming.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<String, LlmError>;
}

pub struct LlmManager {
    model: Box<dyn ChatModel + Send + Sync>,
}

impl fmt::Debug for LlmManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmManager").finish_non_exhaustive()
    }
}

impl LlmManager {
    /// Build the configured backend. Returns `Ok(None)` when no model is
    /// configured at all (empty backend, or a remote backend without a
    /// credential) so callers can degrade to the non-AI paths.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>, LlmError> {
        let model: Box<dyn ChatModel + Send + Sync> = match config.backend.as_str() {
            "remote" => {
                if config.api_key.is_none() {
                    return Ok(None);
                }
                Box::new(providers::remote::RemoteChatProvider::new(config)?)
            }
            "ollama" => Box::new(providers::ollama::OllamaProvider::new(config)?),
            "" | "none" => return Ok(None),
            other => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    other
                )))
            }
        };

        Ok(Some(Self { model }))
    }

    /// Wrap an already-built model, e.g. a custom provider.
    pub fn from_model(model: Box<dyn ChatModel + Send + Sync>) -> Self {
        Self { model }
    }

    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<String, LlmError> {
        self.model
            .complete(system, user, temperature, max_tokens)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(backend: &str, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            backend: backend.to_string(),
            model: "test-model".to_string(),
            api_key: api_key.map(str::to_string),
            api_url: None,
        }
    }

    #[test]
    fn remote_backend_without_credential_is_unconfigured() {
        let manager = LlmManager::from_config(&base_config("remote", None)).unwrap();
        assert!(manager.is_none());
    }

    #[test]
    fn remote_backend_with_credential_is_built() {
        let manager = LlmManager::from_config(&base_config("remote", Some("sk-test"))).unwrap();
        assert!(manager.is_some());
    }

    #[test]
    fn empty_backend_is_unconfigured() {
        assert!(LlmManager::from_config(&base_config("", None))
            .unwrap()
            .is_none());
        assert!(LlmManager::from_config(&base_config("none", None))
            .unwrap()
            .is_none());
    }

    #[test]
    fn unknown_backend_is_a_configuration_error() {
        let err = LlmManager::from_config(&base_config("mainframe", None)).unwrap_err();
        assert!(matches!(err, LlmError::ConfigError(_)));
    }
}
