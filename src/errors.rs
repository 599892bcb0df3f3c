use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn a file reference or access token into a readable path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Access token is stale, target now at {path:?}")]
    TokenStale { path: PathBuf },
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Target missing: {0}")]
    TargetMissing(String),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to write catalog: {0}")]
    PersistenceWriteFailed(String),
    #[error("Failed to read catalog: {0}")]
    PersistenceReadFailed(String),
    #[error("Cannot access file: {0}")]
    CannotAccess(#[from] ResolutionError),
}

impl CatalogError {
    pub fn write(error: impl std::fmt::Display) -> Self {
        CatalogError::PersistenceWriteFailed(error.to_string())
    }

    pub fn read(error: impl std::fmt::Display) -> Self {
        CatalogError::PersistenceReadFailed(error.to_string())
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
