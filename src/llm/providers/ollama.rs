use crate::config::LlmConfig;
use crate::llm::{ChatModel, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Local Ollama backend via the /api/generate endpoint.
pub struct OllamaProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

#[derive(Serialize, Debug)]
struct OllamaRequest {
    model: String,
    prompt: String,
    system: String,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    response: String,
    #[serde(flatten)]
    _extra: std::collections::HashMap<String, serde_json::Value>,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434/api/generate".to_string());

        let client = reqwest::Client::new();

        Ok(Self {
            client,
            api_url,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatModel for OllamaProvider {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        _max_tokens: usize,
    ) -> Result<String, LlmError> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: user.to_string(),
            system: system.to_string(),
            temperature,
            stream: false,
        };

        debug!("Sending request to Ollama at {}", self.api_url);

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = match response.text().await {
                Ok(body) => format!(" - Response body: {}", body),
                Err(_) => String::new(),
            };

            error!("Ollama API responded with status code: {}{}", status, error_body);
            return Err(LlmError::ResponseError(format!(
                "Ollama API responded with status code: {}{}",
                status, error_body
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseError(format!("Failed to read response body: {}", e)))?;

        let ollama_response: OllamaResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                LlmError::ResponseError(format!(
                    "Failed to parse Ollama response: {} - Response was: {}",
                    e, response_text
                ))
            })?;

        Ok(ollama_response.response)
    }
}
