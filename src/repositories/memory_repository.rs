use crate::errors::{CatalogError, CatalogResult};
use crate::models::{FileRecord, UploadedFile};
use crate::repositories::CatalogStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory catalog used in tests and debug tooling.
///
/// Reads and writes can be made to fail on demand to exercise error paths.
#[derive(Default)]
pub struct InMemoryCatalog {
    records: RwLock<Vec<FileRecord>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn check_write(&self) -> CatalogResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CatalogError::write("in-memory catalog is read-only"));
        }
        Ok(())
    }

    fn check_read(&self) -> CatalogResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CatalogError::read("in-memory catalog is unavailable"));
        }
        Ok(())
    }

    fn sorted(records: &[FileRecord]) -> Vec<FileRecord> {
        let mut files = records.to_vec();
        files.sort_by(|a, b| b.date_uploaded.cmp(&a.date_uploaded));
        files
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn upsert(&self, file: &UploadedFile) -> CatalogResult<FileRecord> {
        self.check_write()?;
        let mut records = self.records.write().await;

        match records.iter_mut().find(|record| record.path == file.path) {
            Some(existing) => {
                existing.apply_upload(file);
                Ok(existing.clone())
            }
            None => {
                let record = FileRecord::from_upload(file);
                records.push(record.clone());
                Ok(record)
            }
        }
    }

    async fn fetch_all(&self) -> CatalogResult<Vec<FileRecord>> {
        self.check_read()?;
        let records = self.records.read().await;
        Ok(Self::sorted(&records))
    }

    async fn fetch_recent(&self, limit: usize) -> CatalogResult<Vec<FileRecord>> {
        let mut files = self.fetch_all().await?;
        files.truncate(limit);
        Ok(files)
    }

    async fn delete(&self, id: Uuid) -> CatalogResult<()> {
        self.check_write()?;
        self.records.write().await.retain(|record| record.id != id);
        Ok(())
    }

    async fn delete_many(&self, ids: &[Uuid]) -> CatalogResult<()> {
        self.check_write()?;
        self.records.write().await.retain(|record| !ids.contains(&record.id));
        Ok(())
    }
}
