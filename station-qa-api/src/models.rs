use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use station_llm_sdk::types::Role as MessageRole;

/// A persisted chat message. Never mutated after it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub session_id: String,
    pub user_id: Option<String>,
    pub role: MessageRole,
    pub content: String,
    pub model_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A message waiting to be appended; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub session_id: String,
    pub user_id: Option<String>,
    pub role: MessageRole,
    pub content: String,
    pub model_name: Option<String>,
}

impl NewMessage {
    pub fn user(session_id: &str, content: &str, user_id: Option<&str>) -> Self {
        Self {
            session_id: session_id.to_string(),
            user_id: user_id.map(str::to_string),
            role: MessageRole::User,
            content: content.to_string(),
            model_name: None,
        }
    }

    pub fn assistant(
        session_id: &str,
        content: &str,
        user_id: Option<&str>,
        model_name: &str,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            user_id: user_id.map(str::to_string),
            role: MessageRole::Assistant,
            content: content.to_string(),
            model_name: Some(model_name.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

/// Outcome of one conversational turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaResponse {
    pub success: bool,
    pub answer: String,
    pub question: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Non-fatal degradation, e.g. the question could not be saved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub session_id: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: String,
}

impl From<Message> for HistoryEntry {
    fn from(message: Message) -> Self {
        Self {
            role: message.role,
            content: message.content,
            timestamp: message.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearHistoryResponse {
    pub success: bool,
    pub message: String,
}

/// Result of probing the generation service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_models: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
