use super::{ConversationStore, DbPool, StorageError};
use crate::models::{Message, MessageRole, NewMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

/// SQLite-backed conversation log. Each operation checks a connection out of
/// the pool and returns it on drop, whichever way the operation exits.
#[derive(Clone)]
pub struct SqliteConversationStore {
    pool: DbPool,
}

impl SqliteConversationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let role_str: String = row.get(3)?;
    let role = role_str.parse::<MessageRole>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;

    let created_at_ms: i64 = row.get(6)?;
    let created_at = DateTime::<Utc>::from_timestamp_millis(created_at_ms).unwrap_or_default();

    Ok(Message {
        id: row.get(0)?,
        session_id: row.get(1)?,
        user_id: row.get(2)?,
        role,
        content: row.get(4)?,
        model_name: row.get(5)?,
        created_at,
    })
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn append(&self, message: NewMessage) -> Result<i64, StorageError> {
        let conn = self.pool.get()?;
        let now = Utc::now().timestamp_millis();

        // Clamp to the session's latest timestamp so created_at never goes
        // backwards within a session, even if the wall clock does.
        conn.execute(
            r#"
            INSERT INTO qa_conversations
                (session_id, user_id, role, content, model_name, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, MAX(?6, COALESCE(
                (SELECT MAX(created_at) FROM qa_conversations WHERE session_id = ?1), 0)))
            "#,
            params![
                message.session_id,
                message.user_id,
                message.role.as_str(),
                message.content,
                message.model_name,
                now,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.pool.get()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        // Newest-N window selected and re-sorted ascending in one statement
        let mut stmt = conn.prepare(
            r#"
            SELECT id, session_id, user_id, role, content, model_name, created_at
            FROM (
                SELECT id, session_id, user_id, role, content, model_name, created_at
                FROM qa_conversations
                WHERE session_id = ?1
                ORDER BY created_at DESC, id DESC
                LIMIT ?2
            )
            ORDER BY created_at ASC, id ASC
            "#,
        )?;

        let messages = stmt
            .query_map(params![session_id, limit], message_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    async fn clear(&self, session_id: &str) -> Result<usize, StorageError> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM qa_conversations WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::run_migrations;
    use crate::storage::SqliteConnectionManager;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, SqliteConversationStore) {
        let dir = tempfile::tempdir().unwrap();
        let manager = SqliteConnectionManager::file(dir.path().join("qa.db"));
        let pool = r2d2::Pool::builder().max_size(2).build(manager).unwrap();
        run_migrations(&mut pool.get().unwrap()).unwrap();
        (dir, SqliteConversationStore::new(pool))
    }

    #[tokio::test]
    async fn test_append_then_recent_returns_appended_message() {
        let (_dir, store) = setup_store();

        let id = store
            .append(NewMessage::user("s1", "How many stations?", Some("u1")))
            .await
            .unwrap();

        let recent = store.recent("s1", 1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, id);
        assert_eq!(recent[0].role, MessageRole::User);
        assert_eq!(recent[0].content, "How many stations?");
        assert_eq!(recent[0].user_id.as_deref(), Some("u1"));
        assert_eq!(recent[0].model_name, None);
    }

    #[tokio::test]
    async fn test_recent_returns_newest_window_in_ascending_order() {
        let (_dir, store) = setup_store();

        for i in 0..6 {
            let message = if i % 2 == 0 {
                NewMessage::user("s1", &format!("q{i}"), None)
            } else {
                NewMessage::assistant("s1", &format!("a{i}"), None, "deepseek-r1:32b")
            };
            store.append(message).await.unwrap();
        }
        store
            .append(NewMessage::user("other", "unrelated", None))
            .await
            .unwrap();

        let recent = store.recent("s1", 4).await.unwrap();
        let contents: Vec<_> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["q2", "a3", "q4", "a5"]);

        assert!(recent
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at && w[0].id < w[1].id));
        assert_eq!(recent[1].model_name.as_deref(), Some("deepseek-r1:32b"));
    }

    #[tokio::test]
    async fn test_recent_on_unknown_session_is_empty() {
        let (_dir, store) = setup_store();
        assert!(store.recent("missing", 10).await.unwrap().is_empty());
        assert!(store.recent("missing", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent_and_scoped() {
        let (_dir, store) = setup_store();
        store.append(NewMessage::user("s1", "a", None)).await.unwrap();
        store.append(NewMessage::user("s1", "b", None)).await.unwrap();
        store.append(NewMessage::user("s2", "c", None)).await.unwrap();

        assert_eq!(store.clear("s1").await.unwrap(), 2);
        assert_eq!(store.clear("s1").await.unwrap(), 0);
        assert!(store.recent("s1", 10).await.unwrap().is_empty());
        assert_eq!(store.recent("s2", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_created_at_never_moves_backwards() {
        let (_dir, store) = setup_store();
        let future = Utc::now().timestamp_millis() + 60_000;
        {
            let conn = store.pool().get().unwrap();
            conn.execute(
                "INSERT INTO qa_conversations (session_id, role, content, created_at)
                 VALUES ('s1', 'user', 'from the future', ?1)",
                params![future],
            )
            .unwrap();
        }

        store.append(NewMessage::user("s1", "now", None)).await.unwrap();

        let recent = store.recent("s1", 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].content, "now");
        assert!(recent[1].created_at >= recent[0].created_at);
    }

    #[tokio::test]
    async fn test_unreachable_database_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SqliteConnectionManager::file(dir.path().join("no-schema.db"));
        let pool = r2d2::Pool::builder().max_size(1).build(manager).unwrap();
        let store = SqliteConversationStore::new(pool);

        let err = store
            .append(NewMessage::user("s1", "hi", None))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Sqlite(_)));
        assert!(store.recent("s1", 5).await.is_err());
    }
}
