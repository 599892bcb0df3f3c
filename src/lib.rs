pub mod app;
pub mod config;
pub mod database;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod services;
pub mod telemetry;

// Always available for integration tests but marked as test-only
#[cfg(any(test, debug_assertions, feature = "test-utils"))]
pub mod test_utils;

pub use app::AppState;
pub use config::AppConfig;
pub use database::Database;
pub use errors::{CatalogError, ResolutionError};
