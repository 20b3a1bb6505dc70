//! Outbound model plumbing: a provider-agnostic client trait, HTTP provider
//! implementations, and the gateway that layers bounded transport retries on
//! top. Schema-constrained calls live in `schema`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use barista_core::config::{LlmConfig, LlmProvider};
use barista_core::GatewayError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

/// Hosted text-generation plus embedding endpoint. The model behind it is
/// untrusted: raw completions are only ever interpreted through the schema
/// layer or returned verbatim as conversational text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError>;
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GatewayError>;
}

pub struct ModelGateway {
    client: Arc<dyn ModelClient>,
    max_retries: u32,
    pub(crate) max_repair_attempts: u32,
    backoff_base: Duration,
}

impl ModelGateway {
    pub fn new(client: Arc<dyn ModelClient>, max_retries: u32, max_repair_attempts: u32) -> Self {
        Self { client, max_retries, max_repair_attempts, backoff_base: Duration::from_millis(250) }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, GatewayError> {
        let client: Arc<dyn ModelClient> = match config.provider {
            LlmProvider::OpenAi => Arc::new(OpenAiClient::from_config(config)?),
            LlmProvider::Ollama => Arc::new(OllamaClient::from_config(config)?),
        };
        Ok(Self::new(client, config.max_retries, config.max_repair_attempts))
    }

    #[cfg(test)]
    pub(crate) fn with_backoff(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Plain completion with bounded backoff on transport failures.
    pub async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        self.with_transport_retry(|| self.client.complete(prompt)).await
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, GatewayError> {
        self.with_transport_retry(|| self.client.embed(text)).await
    }

    async fn with_transport_retry<T, F, Fut>(&self, call: F) -> Result<T, GatewayError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 0u32;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(GatewayError::Unavailable { message }) if attempt < self.max_retries => {
                    warn!(
                        event_name = "gateway.transport.retry",
                        attempt,
                        error = %message,
                        "upstream call failed, retrying"
                    );
                    tokio::time::sleep(self.backoff_base * 2u32.saturating_pow(attempt)).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// OpenAI-compatible chat-completions and embeddings API.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    embedding_model: String,
}

impl OpenAiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, GatewayError> {
        let api_key = config.api_key.clone().ok_or_else(|| GatewayError::Unavailable {
            message: "openai provider configured without an api key".to_string(),
        })?;
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            api_key,
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingsRow>,
}

#[derive(Deserialize)]
struct EmbeddingsRow {
    embedding: Vec<f32>,
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ok_status(response)?;
        let parsed: ChatCompletionResponse = response.json().await.map_err(transport_error)?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::Unavailable {
                message: "completion response contained no choices".to_string(),
            })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, GatewayError> {
        let url = format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'));
        let body = json!({ "model": self.embedding_model, "input": text });

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ok_status(response)?;
        let parsed: EmbeddingsResponse = response.json().await.map_err(transport_error)?;

        parsed.data.into_iter().next().map(|row| row.embedding).ok_or_else(|| {
            GatewayError::Unavailable {
                message: "embeddings response contained no vectors".to_string(),
            }
        })
    }
}

/// Local Ollama daemon.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    embedding_model: String,
}

impl OllamaClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, GatewayError> {
        let base_url = config.base_url.clone().ok_or_else(|| GatewayError::Unavailable {
            message: "ollama provider configured without a base url".to_string(),
        })?;
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url,
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct OllamaEmbeddingsResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let body = json!({ "model": self.model, "prompt": prompt, "stream": false });

        let response = self.http.post(&url).json(&body).send().await.map_err(transport_error)?;
        let response = ok_status(response)?;
        let parsed: OllamaGenerateResponse = response.json().await.map_err(transport_error)?;
        Ok(parsed.response)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, GatewayError> {
        let url = format!("{}/api/embeddings", self.base_url.trim_end_matches('/'));
        let body = json!({ "model": self.embedding_model, "prompt": text });

        let response = self.http.post(&url).json(&body).send().await.map_err(transport_error)?;
        let response = ok_status(response)?;
        let parsed: OllamaEmbeddingsResponse = response.json().await.map_err(transport_error)?;
        Ok(parsed.embedding)
    }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|error| GatewayError::Unavailable { message: error.to_string() })
}

fn transport_error(error: reqwest::Error) -> GatewayError {
    GatewayError::Unavailable { message: error.to_string() }
}

fn ok_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    response
        .error_for_status()
        .map_err(|error| GatewayError::Unavailable { message: error.to_string() })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use barista_core::GatewayError;

    use super::ModelGateway;
    use crate::testing::ScriptedModel;

    #[tokio::test]
    async fn transport_failures_are_retried_within_the_bound() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err(GatewayError::Unavailable { message: "connection reset".to_string() }),
            Ok("hello".to_string()),
        ]));
        let gateway =
            ModelGateway::new(model.clone(), 2, 3).with_backoff(Duration::from_millis(1));

        let reply = gateway.complete("hi").await.expect("second attempt should succeed");
        assert_eq!(reply, "hello");
        assert_eq!(model.completion_calls(), 2);
    }

    #[tokio::test]
    async fn retry_exhaustion_surfaces_unavailable() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err(GatewayError::Unavailable { message: "timeout".to_string() }),
            Err(GatewayError::Unavailable { message: "timeout".to_string() }),
        ]));
        let gateway =
            ModelGateway::new(model.clone(), 1, 3).with_backoff(Duration::from_millis(1));

        let result = gateway.complete("hi").await;
        assert!(matches!(result, Err(GatewayError::Unavailable { .. })));
        assert_eq!(model.completion_calls(), 2);
    }
}
