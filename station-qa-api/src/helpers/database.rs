use crate::config::DatabaseConfig;
use crate::storage::migrations::run_migrations;
use crate::storage::{DbPool, SqliteConnectionManager};
use tracing::info;

/// Open the connection pool for the configured database file and bring its
/// schema up to date.
pub fn initialize_database(config: &DatabaseConfig) -> anyhow::Result<DbPool> {
    if let Some(parent) = config.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(&config.path);
    let pool = r2d2::Pool::builder()
        .max_size(config.pool_size.max(1))
        .build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    info!(
        path = %config.path.display(),
        pool_size = config.pool_size,
        "Database ready"
    );

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::has_conversation_schema;

    #[test]
    fn test_initialize_database_creates_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("data/qa.db"),
            pool_size: 2,
        };

        let pool = initialize_database(&config).unwrap();

        assert!(config.path.exists());
        assert!(has_conversation_schema(&pool.get().unwrap()).unwrap());
        assert_eq!(pool.max_size(), 2);
    }
}
