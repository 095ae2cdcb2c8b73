use crate::config::LlmConfig;
use station_llm_sdk::client::LlmClient;
use station_llm_sdk::ollama::OllamaClient;
use std::sync::Arc;
use std::time::Duration;

/// Build the generation client from config.
///
/// The HTTP client timeout sits slightly above the per-turn generation timeout
/// so the gateway's own deadline is the one callers observe.
pub fn create_llm_client(config: &LlmConfig) -> anyhow::Result<Arc<dyn LlmClient>> {
    let http_timeout = Duration::from_secs(config.timeout_secs.saturating_add(5));

    let client = OllamaClient::with_timeout(http_timeout)?
        .with_base_url(config.base_url.clone())
        .with_model(config.model.clone());

    Ok(Arc::new(client))
}
