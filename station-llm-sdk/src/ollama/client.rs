use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::time::Duration;

use crate::{
    error::LlmError,
    ollama::types::{
        OllamaChatRequest, OllamaChatResponse, OllamaMessage, OllamaOptions, OllamaRole,
        OllamaTagsResponse,
    },
    providers::{OLLAMA, OLLAMA_DEFAULT_BASE_URL},
    types::{CompletionRequest, CompletionResponse, Role, Usage},
};

const DEFAULT_MODEL: &str = "deepseek-r1:32b";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Ollama local LLM client
pub struct OllamaClient {
    base_url: String,
    model: String,
    http_client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default base URL
    pub fn new() -> Result<Self, LlmError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a client whose HTTP requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Network { source: e })?;

        Ok(Self {
            base_url: OLLAMA_DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            http_client,
        })
    }

    /// Set a custom base URL for the API
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model used when a request does not name one
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Create a chat message using the Ollama /api/chat endpoint
    pub async fn create_chat(
        &self,
        request: OllamaChatRequest,
    ) -> Result<OllamaChatResponse, LlmError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if std::env::var("STATION_LLM_LOG_PAYLOADS").is_ok() {
            if let Ok(json_str) = serde_json::to_string_pretty(&request) {
                tracing::debug!(payload = %json_str, "Ollama request");
            }
        }

        let response = self
            .http_client
            .post(&url)
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Network { source: e })?;

        let status = response.status();

        if status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| LlmError::Network { source: e })?;

            if std::env::var("STATION_LLM_LOG_PAYLOADS").is_ok() {
                tracing::debug!(payload = %body, "Ollama response");
            }

            let ollama_response: OllamaChatResponse = serde_json::from_str(&body)?;
            Ok(ollama_response)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            Err(LlmError::api_error(status.as_u16(), error_text))
        }
    }

    /// List locally available models using the /api/tags endpoint
    pub async fn tags(&self) -> Result<OllamaTagsResponse, LlmError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| LlmError::Network { source: e })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::api_error(status.as_u16(), error_text));
        }

        response
            .json::<OllamaTagsResponse>()
            .await
            .map_err(|e| LlmError::internal(format!("Failed to parse response: {}", e)))
    }
}

fn to_ollama_role(role: Role) -> OllamaRole {
    match role {
        Role::System => OllamaRole::System,
        Role::User => OllamaRole::User,
        Role::Assistant => OllamaRole::Assistant,
    }
}

#[async_trait]
impl crate::client::LlmClient for OllamaClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if request.messages.is_empty() {
            return Err(LlmError::invalid_request("At least one message is required"));
        }

        let messages = request
            .messages
            .into_iter()
            .map(|msg| OllamaMessage::new(to_ollama_role(msg.role), msg.content))
            .collect::<Vec<_>>();

        let options = OllamaOptions {
            temperature: request.temperature,
            top_p: request.top_p,
        };

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model
        };

        let ollama_request = OllamaChatRequest {
            model,
            messages,
            options: if options.is_empty() {
                None
            } else {
                Some(options)
            },
            // A single JSON document instead of NDJSON chunks
            stream: Some(false),
        };

        let ollama_response = self.create_chat(ollama_request).await?;

        let content = ollama_response
            .message
            .map(|message| message.content)
            .unwrap_or_default();

        Ok(CompletionResponse {
            content,
            model: ollama_response.model,
            usage: Usage {
                input_tokens: ollama_response.prompt_eval_count.unwrap_or(0),
                output_tokens: ollama_response.eval_count.unwrap_or(0),
            },
            stop_reason: ollama_response.done_reason,
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let tags = self.tags().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn provider_name(&self) -> &str {
        OLLAMA
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
