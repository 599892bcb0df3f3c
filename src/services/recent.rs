use crate::models::UploadedFile;
use std::collections::HashSet;

/// Latest upload per distinct file name, newest first.
///
/// Entries sharing a date keep their order from `files`. The input is left
/// untouched; callers recompute the projection whenever they read it.
pub fn unique_latest_by_name(files: &[UploadedFile]) -> Vec<UploadedFile> {
    let mut by_date: Vec<&UploadedFile> = files.iter().collect();
    // Stable sort, so equal dates stay in first-seen order
    by_date.sort_by(|a, b| b.date.cmp(&a.date));

    let mut seen = HashSet::new();
    by_date
        .into_iter()
        .filter(|file| seen.insert(file.name.clone()))
        .cloned()
        .collect()
}
