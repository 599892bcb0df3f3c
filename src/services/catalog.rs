use crate::errors::{CatalogError, CatalogResult};
use crate::models::{DocumentCategory, FileRecord};
use crate::repositories::CatalogStore;
use crate::services::access::{AccessGuard, AccessProvider};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Read and delete operations the interface runs against the catalog
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    access: Arc<dyn AccessProvider>,
    recent_limit: usize,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, access: Arc<dyn AccessProvider>, recent_limit: usize) -> Self {
        Self { store, access, recent_limit }
    }

    pub async fn all_files(&self) -> CatalogResult<Vec<FileRecord>> {
        self.store.fetch_all().await
    }

    /// Newest files, `limit` defaults to the configured recent-files limit
    pub async fn recent_files(&self, limit: Option<usize>) -> CatalogResult<Vec<FileRecord>> {
        self.store.fetch_recent(limit.unwrap_or(self.recent_limit)).await
    }

    pub async fn files_in_category(&self, category: DocumentCategory) -> CatalogResult<Vec<FileRecord>> {
        self.store.fetch_by_category(category).await
    }

    /// Files of a category whose name contains `query`, ignoring case.
    /// A blank query matches the whole category.
    pub async fn search_in_category(&self, category: DocumentCategory, query: &str) -> CatalogResult<Vec<FileRecord>> {
        let files = self.store.fetch_by_category(category).await?;
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(files);
        }

        Ok(files
            .into_iter()
            .filter(|file| file.name.to_lowercase().contains(&query))
            .collect())
    }

    pub async fn category_counts(&self) -> CatalogResult<HashMap<DocumentCategory, usize>> {
        let mut counts: HashMap<DocumentCategory, usize> =
            DocumentCategory::ALL.iter().map(|category| (*category, 0)).collect();

        for file in self.store.fetch_all().await? {
            *counts.entry(file.category()).or_insert(0) += 1;
        }

        Ok(counts)
    }

    pub async fn delete_file(&self, file: &FileRecord) -> CatalogResult<()> {
        self.store.delete(file.id).await?;
        info!("Deleted {} from the catalog", file.name);
        Ok(())
    }

    pub async fn delete_files(&self, files: &[FileRecord]) -> CatalogResult<()> {
        let ids: Vec<Uuid> = files.iter().map(|file| file.id).collect();
        self.store.delete_many(&ids).await?;
        info!("Deleted {} file(s) from the catalog", ids.len());
        Ok(())
    }

    /// Resolve the file behind a catalog entry for viewing.
    ///
    /// A record whose token no longer resolves stays in the catalog; only the
    /// open fails.
    pub async fn open_file(&self, file: &FileRecord) -> CatalogResult<AccessGuard> {
        self.access.resolve(&file.access_token).await.map_err(|e| {
            warn!("Cannot open {}: {}", file.name, e);
            CatalogError::CannotAccess(e)
        })
    }
}
