use crate::errors::ResolutionError;
use crate::models::{extension_of_path, path_from_text, path_to_text, AccessToken, ExternalReference};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Bookkeeping of the access grants currently held by the process.
///
/// A path can be granted once at a time. Grants are handed out as
/// [`AccessGuard`]s and returned to the registry when the guard is dropped.
#[derive(Debug, Default)]
pub struct GrantRegistry {
    active: Mutex<HashSet<PathBuf>>,
}

impl GrantRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn try_acquire(self: &Arc<Self>, path: PathBuf) -> Result<AccessGuard, ResolutionError> {
        let mut active = self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !active.insert(path.clone()) {
            return Err(ResolutionError::AccessDenied(format!(
                "access to {} is already held",
                path.display()
            )));
        }

        debug!("Acquired access grant for {}", path.display());
        Ok(AccessGuard { selected: path.clone(), path, registry: Arc::clone(self) })
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_active(&self, path: &Path) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(path)
    }

    fn release(&self, path: &Path) {
        let mut active = self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if active.remove(path) {
            debug!("Released access grant for {}", path.display());
        }
    }
}

/// Scoped access to a file; the grant ends when the guard is dropped
#[derive(Debug)]
pub struct AccessGuard {
    path: PathBuf,
    selected: PathBuf,
    registry: Arc<GrantRegistry>,
}

impl AccessGuard {
    /// Resolved location the grant is held on
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location as it was handed in, before links were followed.
    /// The file's display name comes from here.
    pub fn selected_path(&self) -> &Path {
        &self.selected
    }

    pub fn with_selected_path(mut self, selected: PathBuf) -> Self {
        self.selected = selected;
        self
    }
}

impl Drop for AccessGuard {
    fn drop(&mut self) {
        self.registry.release(&self.path);
    }
}

/// Name, size and extension captured when a bookmark is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub size: i64,
    pub extension: String,
}

#[derive(Debug, Clone)]
pub struct Bookmark {
    pub token: AccessToken,
    pub path: String,
    pub metadata: FileMetadata,
}

/// Exchanges external references and stored tokens for scoped file access
#[async_trait]
pub trait AccessProvider: Send + Sync {
    /// Start accessing a reference that was just handed over by the picker
    async fn acquire(&self, reference: &ExternalReference) -> Result<AccessGuard, ResolutionError>;

    /// Create a reopenable token for a file currently held by `guard`.
    /// Metadata is best-effort: unreadable sizes are reported as 0.
    async fn bookmark(&self, guard: &AccessGuard) -> Result<Bookmark, ResolutionError>;

    /// Resolve a stored token to an accessible path under a new grant
    async fn resolve(&self, token: &AccessToken) -> Result<AccessGuard, ResolutionError>;

    /// Produce a fresh token for a stale one whose target can still be reached
    async fn refresh(&self, token: &AccessToken) -> Result<AccessToken, ResolutionError>;

    fn grants(&self) -> &Arc<GrantRegistry>;
}

/// Resolve `token`, run `f` on the accessible path, and release the grant
/// whatever `f` returns.
pub async fn with_access<P, F, Fut, T>(provider: &P, token: &AccessToken, f: F) -> Result<T, ResolutionError>
where
    P: AccessProvider + ?Sized,
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = T>,
{
    let guard = provider.resolve(token).await?;
    let output = f(guard.path().to_path_buf()).await;
    drop(guard);
    Ok(output)
}

/// Paths are kept in their lossless text form so any file name survives JSON
#[derive(Debug, Serialize, Deserialize)]
struct BookmarkData {
    /// Path as it was selected, links not followed
    path: String,
    /// Fully resolved path at bookmark time
    canonical: String,
    created_at: DateTime<Utc>,
}

/// Bookmarks backed by the local filesystem.
///
/// Tokens are base64-encoded JSON recording where the file lived when it was
/// imported. A token becomes stale when that location now resolves somewhere
/// else (e.g. a directory on the way was replaced by a link).
pub struct LocalAccessProvider {
    grants: Arc<GrantRegistry>,
}

impl Default for LocalAccessProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalAccessProvider {
    pub fn new() -> Self {
        Self { grants: GrantRegistry::new() }
    }

    pub fn with_registry(grants: Arc<GrantRegistry>) -> Self {
        Self { grants }
    }

    fn encode(data: &BookmarkData) -> Result<AccessToken, ResolutionError> {
        let json = serde_json::to_vec(data)
            .map_err(|e| ResolutionError::AccessDenied(format!("cannot create bookmark: {}", e)))?;
        Ok(AccessToken::new(STANDARD.encode(json).into_bytes()))
    }

    fn decode(token: &AccessToken) -> Result<BookmarkData, ResolutionError> {
        let json = STANDARD
            .decode(token.as_bytes())
            .map_err(|e| ResolutionError::TargetMissing(format!("invalid bookmark data: {}", e)))?;
        serde_json::from_slice(&json)
            .map_err(|e| ResolutionError::TargetMissing(format!("invalid bookmark data: {}", e)))
    }

    /// Check that `path` is an existing, readable regular file and return its canonical form
    async fn check_readable(path: &Path) -> Result<PathBuf, ResolutionError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| io_error(path, e))?;
        if !metadata.is_file() {
            return Err(ResolutionError::TargetMissing(format!("{} is not a file", path.display())));
        }

        tokio::fs::File::open(path).await.map_err(|e| io_error(path, e))?;
        tokio::fs::canonicalize(path).await.map_err(|e| io_error(path, e))
    }
}

fn io_error(path: &Path, error: std::io::Error) -> ResolutionError {
    match error.kind() {
        ErrorKind::PermissionDenied => ResolutionError::AccessDenied(format!("{}: {}", path.display(), error)),
        _ => ResolutionError::TargetMissing(format!("{}: {}", path.display(), error)),
    }
}

#[async_trait]
impl AccessProvider for LocalAccessProvider {
    async fn acquire(&self, reference: &ExternalReference) -> Result<AccessGuard, ResolutionError> {
        let path = reference.to_path();
        let canonical = Self::check_readable(&path).await?;
        Ok(self.grants.try_acquire(canonical)?.with_selected_path(path))
    }

    async fn bookmark(&self, guard: &AccessGuard) -> Result<Bookmark, ResolutionError> {
        let path = guard.path();
        let selected = guard.selected_path();
        let name = selected
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let size = match tokio::fs::metadata(path).await {
            Ok(metadata) => i64::try_from(metadata.len()).unwrap_or(i64::MAX),
            Err(e) => {
                warn!("Metadata unavailable for {}, recording size 0: {}", path.display(), e);
                0
            }
        };

        let token = Self::encode(&BookmarkData {
            path: path_to_text(selected),
            canonical: path_to_text(path),
            created_at: Utc::now(),
        })?;

        let extension = extension_of_path(selected);
        Ok(Bookmark {
            token,
            path: path_to_text(path),
            metadata: FileMetadata { name, size, extension },
        })
    }

    async fn resolve(&self, token: &AccessToken) -> Result<AccessGuard, ResolutionError> {
        let data = Self::decode(token)?;
        let selected = path_from_text(&data.path);
        let current = Self::check_readable(&selected).await?;

        if current != path_from_text(&data.canonical) {
            debug!(
                "Bookmark for {} is stale, now resolves to {}",
                selected.display(),
                current.display()
            );
            return Err(ResolutionError::TokenStale { path: current });
        }

        Ok(self.grants.try_acquire(current)?.with_selected_path(selected))
    }

    async fn refresh(&self, token: &AccessToken) -> Result<AccessToken, ResolutionError> {
        let data = Self::decode(token)?;
        let current = Self::check_readable(&path_from_text(&data.path)).await?;

        Self::encode(&BookmarkData {
            path: data.path,
            canonical: path_to_text(&current),
            created_at: Utc::now(),
        })
    }

    fn grants(&self) -> &Arc<GrantRegistry> {
        &self.grants
    }
}
