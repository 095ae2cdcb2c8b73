use crate::{
    error::LlmError,
    types::{CompletionRequest, CompletionResponse},
};
use async_trait::async_trait;

/// Core trait for LLM clients
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete a request (non-streaming)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// List the models the service can currently serve
    async fn list_models(&self) -> Result<Vec<String>, LlmError>;

    /// Get provider name (e.g., "ollama")
    fn provider_name(&self) -> &str;

    /// Get the default model name
    fn model_name(&self) -> &str;

    /// Base URL the client talks to, used in diagnostics
    fn base_url(&self) -> &str;
}
