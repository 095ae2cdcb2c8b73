use super::{ConversationStore, StorageError};
use crate::models::{Message, NewMessage};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inner {
    next_id: i64,
    sessions: HashMap<String, Vec<Message>>,
}

/// Process-local conversation log for unit tests of components above storage.
#[derive(Clone, Default)]
pub struct InMemoryConversationStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages currently held for `session_id`
    pub fn len(&self, session_id: &str) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.sessions.get(session_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, session_id: &str) -> bool {
        self.len(session_id) == 0
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, message: NewMessage) -> Result<i64, StorageError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| StorageError::OperationFailed(format!("Lock error: {}", e)))?;

        inner.next_id += 1;
        let id = inner.next_id;

        let session = inner.sessions.entry(message.session_id.clone()).or_default();
        let now = Utc::now();
        let created_at = session
            .last()
            .map_or(now, |last| last.created_at.max(now));

        session.push(Message {
            id,
            session_id: message.session_id,
            user_id: message.user_id,
            role: message.role,
            content: message.content,
            model_name: message.model_name,
            created_at,
        });

        Ok(id)
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, StorageError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| StorageError::OperationFailed(format!("Lock error: {}", e)))?;

        Ok(inner
            .sessions
            .get(session_id)
            .map(|messages| messages[messages.len().saturating_sub(limit)..].to_vec())
            .unwrap_or_default())
    }

    async fn clear(&self, session_id: &str) -> Result<usize, StorageError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| StorageError::OperationFailed(format!("Lock error: {}", e)))?;

        Ok(inner.sessions.remove(session_id).map_or(0, |m| m.len()))
    }
}
