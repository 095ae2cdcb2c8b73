use refinery::embed_migrations;

embed_migrations!("src/storage/migrations");

/// Create or upgrade the conversation schema on `conn`.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), refinery::Error> {
    migrations::runner().run(conn).map(|_| ())
}

/// Check if the conversation table exists in the database
pub fn has_conversation_schema(conn: &rusqlite::Connection) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='qa_conversations'",
    )?;
    stmt.exists([])
}
