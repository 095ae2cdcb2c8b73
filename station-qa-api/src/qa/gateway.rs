use crate::models::ConnectionStatus;
use station_llm_sdk::client::LlmClient;
use station_llm_sdk::error::LlmError;
use station_llm_sdk::types::{CompletionRequest, Message as ChatMessage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const CONNECTION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Sampling parameters forwarded to the model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

/// Why a generation attempt produced no answer
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation service at {base_url} is unreachable")]
    Unreachable { base_url: String },

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation service returned status {0}")]
    BadStatus(u16),

    #[error("generation service returned no answer")]
    EmptyResponse,

    #[error("generation failed: {0}")]
    Unexpected(String),
}

impl GenerationError {
    fn from_llm(err: LlmError, base_url: &str, timeout: Duration) -> Self {
        if err.is_connect() {
            Self::Unreachable {
                base_url: base_url.to_string(),
            }
        } else if err.is_timeout() {
            Self::Timeout(timeout)
        } else if let Some(status) = err.status() {
            Self::BadStatus(status)
        } else {
            Self::Unexpected(err.to_string())
        }
    }

    /// Text shown to the user and stored as the assistant turn
    pub fn user_message(&self) -> String {
        match self {
            Self::Unreachable { base_url } => format!(
                "Unable to connect to the Ollama service at {}. Please make sure Ollama is running (default port 11434).\n\nStart it with: ollama serve",
                base_url
            ),
            Self::Timeout(_) => {
                "The AI model took too long to respond. Please try again later.".to_string()
            }
            Self::BadStatus(status) => format!(
                "Sorry, an error occurred while calling the AI model. Ollama API error (status code: {})",
                status
            ),
            Self::EmptyResponse => {
                "Sorry, I did not produce a valid answer. Please try again.".to_string()
            }
            Self::Unexpected(detail) => format!(
                "Sorry, an unexpected error occurred while generating the answer: {}",
                detail
            ),
        }
    }
}

/// Sends chat requests to the generation service and turns every outcome into
/// answer text. Performs no persistence.
#[derive(Clone)]
pub struct ModelGateway {
    client: Arc<dyn LlmClient>,
}

impl ModelGateway {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Generate an answer. Never fails: failures come back as readable text.
    pub async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        model_name: &str,
        options: &GenerationOptions,
        timeout: Duration,
    ) -> String {
        match self.try_generate(messages, model_name, options, timeout).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, model = model_name, "Generation failed");
                e.user_message()
            }
        }
    }

    /// Generate an answer, reporting failures as typed errors.
    ///
    /// On timeout the request future is dropped; the remote side may keep
    /// working on it.
    pub async fn try_generate(
        &self,
        messages: Vec<ChatMessage>,
        model_name: &str,
        options: &GenerationOptions,
        timeout: Duration,
    ) -> Result<String, GenerationError> {
        let request = CompletionRequest::new(model_name, messages)
            .with_temperature(options.temperature)
            .with_top_p(options.top_p);

        let response = tokio::time::timeout(timeout, self.client.complete(request))
            .await
            .map_err(|_| GenerationError::Timeout(timeout))?
            .map_err(|e| GenerationError::from_llm(e, self.client.base_url(), timeout))?;

        if response.content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(response.content)
    }

    /// Probe the service and report whether `target_model` is installed.
    pub async fn check_connection(&self, target_model: &str) -> ConnectionStatus {
        let result = tokio::time::timeout(CONNECTION_CHECK_TIMEOUT, self.client.list_models()).await;

        match result {
            Ok(Ok(models)) => {
                let model_exists = models.iter().any(|name| name == target_model);
                info!(
                    model_count = models.len(),
                    target_model, model_exists, "Generation service reachable"
                );
                ConnectionStatus {
                    success: true,
                    message: "Connected to Ollama".to_string(),
                    available_models: Some(models),
                    target_model: Some(target_model.to_string()),
                    model_exists: Some(model_exists),
                    hint: None,
                }
            }
            Ok(Err(e)) if e.is_connect() => ConnectionStatus {
                success: false,
                message: "Unable to connect to the Ollama service".to_string(),
                hint: Some("Make sure Ollama is running: ollama serve".to_string()),
                ..ConnectionStatus::default()
            },
            Ok(Err(e)) => match e.status() {
                Some(status) => ConnectionStatus {
                    success: false,
                    message: format!("Ollama API returned error status code: {}", status),
                    ..ConnectionStatus::default()
                },
                None => ConnectionStatus {
                    success: false,
                    message: format!("Connection test failed: {}", e),
                    ..ConnectionStatus::default()
                },
            },
            Err(_) => ConnectionStatus {
                success: false,
                message: format!(
                    "Connection test failed: no response within {}s",
                    CONNECTION_CHECK_TIMEOUT.as_secs()
                ),
                ..ConnectionStatus::default()
            },
        }
    }
}
