//! Provider name constants

/// Ollama local provider
pub const OLLAMA: &str = "ollama";

/// Default Ollama endpoint
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";
