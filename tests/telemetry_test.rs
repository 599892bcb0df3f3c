use anyhow::Result;
use file_organizer_rs::test_utils::test_config;
use file_organizer_rs::AppState;
use tracing::Level;

// Kept alone in its own binary: the global subscriber can be installed once per process
#[tokio::test]
async fn test_bootstrap_installs_configured_log_filter() -> Result<()> {
    std::env::remove_var("RUST_LOG");
    let dir = tempfile::tempdir()?;
    let mut config = test_config();
    config.database.url = format!("sqlite://{}", dir.path().join("catalog.db").display());
    config.logging.filter = "file_organizer_rs=info".to_string();

    let _state = AppState::bootstrap(config.clone()).await?;

    assert!(tracing::dispatcher::has_been_set());
    assert!(tracing::enabled!(target: "file_organizer_rs", Level::INFO));
    assert!(!tracing::enabled!(target: "file_organizer_rs", Level::DEBUG));

    // A second bootstrap keeps the subscriber that is already there
    let _again = AppState::bootstrap(config).await?;

    Ok(())
}
