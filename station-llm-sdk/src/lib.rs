//! # Station LLM SDK
//!
//! A small client library for locally hosted chat models, currently Ollama.
//!
//! ## Example
//!
//! ```rust,no_run
//! use station_llm_sdk::client::LlmClient;
//! use station_llm_sdk::ollama::OllamaClient;
//! use station_llm_sdk::types::{CompletionRequest, Message};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OllamaClient::new()?.with_base_url("http://localhost:11434");
//!     let response = client
//!         .complete(CompletionRequest::new(
//!             "deepseek-r1:32b",
//!             vec![Message::system("You are helpful."), Message::user("Hello!")],
//!         ))
//!         .await?;
//!
//!     println!("Response: {}", response.content);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod ollama;
pub mod providers;
pub mod types;

pub use client::LlmClient;
pub use error::LlmError;
