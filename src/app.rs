use crate::config::AppConfig;
use crate::database::Database;
use crate::repositories::{CatalogStore, FileRepository};
use crate::services::{AccessProvider, CatalogService, ImportService, LocalAccessProvider, ProgressTracker};
use crate::telemetry;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Everything the interface layer talks to, wired together
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub database: Option<Database>,
    pub access_provider: Arc<dyn AccessProvider>,
    pub progress_tracker: Arc<ProgressTracker>,
    pub import_service: ImportService,
    pub catalog_service: CatalogService,
}

impl AppState {
    /// Install logging, open the catalog database and build the services on top of it
    pub async fn bootstrap(config: AppConfig) -> Result<Self> {
        // A host that installed its own subscriber keeps it
        if let Err(e) = telemetry::init_tracing(&config.logging.filter) {
            debug!("Tracing subscriber already installed: {}", e);
        }

        let database = match Database::new(&config.database.url, config.database.max_connections).await {
            Ok(db) => {
                info!("Catalog database opened at {}", config.database.url);
                db
            }
            Err(e) => {
                error!("Failed to open catalog database: {}", e);
                return Err(e);
            }
        };

        let store: Arc<dyn CatalogStore> = Arc::new(FileRepository::new(database.pool().clone()));
        let access: Arc<dyn AccessProvider> = Arc::new(LocalAccessProvider::new());

        let mut state = Self::assemble(config, store, access);
        state.database = Some(database);
        Ok(state)
    }

    /// Build the services over an existing store and access provider
    pub fn assemble(config: AppConfig, store: Arc<dyn CatalogStore>, access_provider: Arc<dyn AccessProvider>) -> Self {
        let progress_tracker = Arc::new(ProgressTracker::new());

        let import_service = ImportService::new(
            store.clone(),
            access_provider.clone(),
            progress_tracker.clone(),
            config.import.clone(),
        );
        let catalog_service = CatalogService::new(store, access_provider.clone(), config.catalog.recent_limit);

        Self {
            config,
            database: None,
            access_provider,
            progress_tracker,
            import_service,
            catalog_service,
        }
    }
}
