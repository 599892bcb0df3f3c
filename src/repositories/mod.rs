pub mod file_repository;
#[cfg(any(test, debug_assertions, feature = "test-utils"))]
pub mod memory_repository;

pub use file_repository::*;
#[cfg(any(test, debug_assertions, feature = "test-utils"))]
pub use memory_repository::*;

use crate::errors::CatalogResult;
use crate::models::{DocumentCategory, FileRecord, UploadedFile};
use async_trait::async_trait;
use uuid::Uuid;

/// Persistent table of imported files.
///
/// Records are keyed by `path` for upserts and by `id` for deletion. Listing
/// operations return records newest first.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert the file, or update the record that already has its path.
    /// Returns the stored record, whose `id` is the existing one on update.
    async fn upsert(&self, file: &UploadedFile) -> CatalogResult<FileRecord>;

    async fn fetch_all(&self) -> CatalogResult<Vec<FileRecord>>;

    async fn fetch_recent(&self, limit: usize) -> CatalogResult<Vec<FileRecord>>;

    /// Deleting an id that is not in the catalog is a no-op
    async fn delete(&self, id: Uuid) -> CatalogResult<()>;

    /// All-or-nothing removal of several records
    async fn delete_many(&self, ids: &[Uuid]) -> CatalogResult<()>;

    async fn fetch_by_category(&self, category: DocumentCategory) -> CatalogResult<Vec<FileRecord>> {
        let files = self.fetch_all().await?;
        Ok(files.into_iter().filter(|file| file.category() == category).collect())
    }
}
