use crate::models::{Message, NewMessage};
use async_trait::async_trait;

mod memory;
pub mod migrations;
pub mod pool;
mod sqlite;

pub use memory::InMemoryConversationStore;
pub use pool::{DbPool, SqliteConnectionManager};
pub use sqlite::SqliteConversationStore;

/// Append-only log of chat messages keyed by session.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist a message and return its id.
    async fn append(&self, message: NewMessage) -> Result<i64, StorageError>;

    /// The latest `limit` messages of a session, oldest first.
    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, StorageError>;

    /// Delete every message of a session and return how many were removed.
    /// Clearing an empty session succeeds with 0.
    async fn clear(&self, session_id: &str) -> Result<usize, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage operation failed: {0}")]
    OperationFailed(String),
}
