//! Conversational question answering: history-aware turns over a stateless
//! generation service.

pub mod context;
pub mod gateway;
pub mod handler;

pub use context::ContextBuilder;
pub use gateway::{GenerationError, GenerationOptions, ModelGateway};
pub use handler::QaHandler;
