use crate::models::{extension_of_path, DocumentCategory, ExternalReference};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    Selected(Vec<ExternalReference>),
    Cancelled,
}

/// Source of user-selected documents
#[async_trait]
pub trait DocumentPicker: Send + Sync {
    async fn pick_files(&self, allowed: &[DocumentCategory], allow_multiple: bool) -> PickerOutcome;
}

/// Picks every allowed document below a directory, in path order
pub struct DirectoryPicker {
    root: PathBuf,
}

impl DirectoryPicker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn is_allowed(path: &Path, allowed: &[DocumentCategory]) -> bool {
        let extension = extension_of_path(path);
        allowed
            .iter()
            .any(|category| category.extensions().contains(&extension.as_str()))
    }

    fn collect(root: &Path, allowed: &[DocumentCategory]) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| {
                // Skip hidden directories but never the root itself
                entry.depth() == 0
                    || !entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| Self::is_allowed(path, allowed))
            .collect();

        files.sort();
        files
    }
}

#[async_trait]
impl DocumentPicker for DirectoryPicker {
    async fn pick_files(&self, allowed: &[DocumentCategory], allow_multiple: bool) -> PickerOutcome {
        let root = self.root.clone();
        let allowed = allowed.to_vec();

        let mut files = match tokio::task::spawn_blocking(move || Self::collect(&root, &allowed)).await {
            Ok(files) => files,
            Err(e) => {
                warn!("Document scan of {} failed: {}", self.root.display(), e);
                return PickerOutcome::Cancelled;
            }
        };

        if files.is_empty() {
            return PickerOutcome::Cancelled;
        }
        if !allow_multiple {
            files.truncate(1);
        }

        PickerOutcome::Selected(files.iter().map(|path| ExternalReference::from_path(path)).collect())
    }
}
