use crate::config::{AppConfig, CatalogConfig, DatabaseConfig, ImportConfig, LoggingConfig};
use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

static TEST_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Create an isolated in-memory SQLite database with the catalog schema
pub async fn create_test_database() -> Result<Pool<Sqlite>> {
    let counter = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let db_name = format!("file:catalog_test_{}?mode=memory&cache=shared", counter);

    let pool = SqlitePoolOptions::new()
        .max_connections(1) // SQLite in-memory works best with single connection
        .connect(&db_name)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Configuration for tests: no pause between imported items
pub fn test_config() -> AppConfig {
    AppConfig {
        database: DatabaseConfig { url: "sqlite::memory:".to_string(), max_connections: 1 },
        import: ImportConfig { item_delay_ms: 0 },
        catalog: CatalogConfig::default(),
        logging: LoggingConfig { filter: "file_organizer_rs=debug".to_string() },
    }
}

/// Install tracing once per test binary; later calls are no-ops
pub fn init_test_tracing() {
    let _ = crate::telemetry::init_tracing("file_organizer_rs=debug,sqlx=warn");
}

/// Write a document with `size` bytes of content and return its path
pub fn write_document(dir: &Path, name: &str, size: usize) -> Result<PathBuf> {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, vec![b'x'; size])?;
    Ok(path)
}
