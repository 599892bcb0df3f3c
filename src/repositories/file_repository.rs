use crate::errors::{CatalogError, CatalogResult};
use crate::models::{FileRecord, UploadedFile};
use crate::repositories::CatalogStore;
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, error};
use uuid::Uuid;

const FILE_COLUMNS: &str = "id, name, file_extension, size, date_uploaded, path, access_token";

pub struct FileRepository {
    pool: SqlitePool,
}

impl FileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_path(&self, path: &str) -> CatalogResult<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(&format!("SELECT {} FROM files WHERE path = ?1", FILE_COLUMNS))
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(CatalogError::read)?;

        Ok(file)
    }

    pub async fn get_file(&self, id: Uuid) -> CatalogResult<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(&format!("SELECT {} FROM files WHERE id = ?1", FILE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(CatalogError::read)?;

        Ok(file)
    }

    pub async fn count(&self) -> CatalogResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await
            .map_err(CatalogError::read)
    }
}

#[async_trait]
impl CatalogStore for FileRepository {
    async fn upsert(&self, file: &UploadedFile) -> CatalogResult<FileRecord> {
        // The id only applies on insert; a conflicting path keeps its original id
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            INSERT INTO files ({cols})
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(path) DO UPDATE SET
                name = excluded.name,
                file_extension = excluded.file_extension,
                size = excluded.size,
                date_uploaded = excluded.date_uploaded,
                access_token = excluded.access_token
            RETURNING {cols}
            "#,
            cols = FILE_COLUMNS
        ))
        .bind(file.id)
        .bind(&file.name)
        .bind(file.file_extension.to_lowercase())
        .bind(file.size)
        .bind(file.date)
        .bind(&file.path)
        .bind(&file.access_token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to save file {}: {}", file.name, e);
            CatalogError::write(e)
        })?;

        if record.id == file.id {
            debug!("Created catalog record {} for {}", record.id, record.path);
        } else {
            debug!("Updated catalog record {} for {}", record.id, record.path);
        }

        Ok(record)
    }

    async fn fetch_all(&self) -> CatalogResult<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {} FROM files ORDER BY date_uploaded DESC",
            FILE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to fetch files: {}", e);
            CatalogError::read(e)
        })?;

        Ok(files)
    }

    async fn fetch_recent(&self, limit: usize) -> CatalogResult<Vec<FileRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let files = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {} FROM files ORDER BY date_uploaded DESC LIMIT ?1",
            FILE_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to fetch recent files: {}", e);
            CatalogError::read(e)
        })?;

        Ok(files)
    }

    async fn delete(&self, id: Uuid) -> CatalogResult<()> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete file {}: {}", id, e);
                CatalogError::write(e)
            })?;

        debug!("Deleted {} catalog record(s) for id {}", result.rows_affected(), id);
        Ok(())
    }

    async fn delete_many(&self, ids: &[Uuid]) -> CatalogResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(CatalogError::write)?;
        let mut deleted = 0;

        for id in ids {
            let result = sqlx::query("DELETE FROM files WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Failed to delete file {}: {}", id, e);
                    CatalogError::write(e)
                })?;
            deleted += result.rows_affected();
        }

        tx.commit().await.map_err(CatalogError::write)?;

        debug!("Deleted {} of {} requested catalog records", deleted, ids.len());
        Ok(())
    }
}
