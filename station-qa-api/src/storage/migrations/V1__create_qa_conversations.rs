/// Create the qa_conversations table holding every chat turn, keyed by session
pub fn migration() -> String {
    r#"
CREATE TABLE qa_conversations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    user_id TEXT,
    role TEXT NOT NULL CHECK (role IN ('system', 'user', 'assistant')),
    content TEXT NOT NULL,
    model_name TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX idx_qa_conversations_session_created
    ON qa_conversations(session_id, created_at, id);
"#
    .to_string()
}
