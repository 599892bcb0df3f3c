use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl ImportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStatus::Completed | ImportStatus::Cancelled)
    }
}

/// Snapshot of the current import batch as seen by the interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportProgress {
    pub batch_id: Option<Uuid>,
    pub status: ImportStatus,
    pub is_running: bool,
    pub total: usize,
    pub processed_count: usize,
    pub current_item_name: Option<String>,
    pub progress: f64,
    pub errors: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Default for ImportProgress {
    fn default() -> Self {
        Self {
            batch_id: None,
            status: ImportStatus::Idle,
            is_running: false,
            total: 0,
            processed_count: 0,
            current_item_name: None,
            progress: 0.0,
            errors: Vec::new(),
            started_at: None,
            updated_at: Utc::now(),
            completed_at: None,
        }
    }
}

impl ImportProgress {
    fn start(batch_id: Uuid, total: usize) -> Self {
        let now = Utc::now();
        Self {
            batch_id: Some(batch_id),
            status: ImportStatus::Running,
            is_running: true,
            total,
            started_at: Some(now),
            updated_at: now,
            ..Self::default()
        }
    }

    pub fn update_progress(&mut self, processed_count: usize) {
        self.processed_count = processed_count;
        self.updated_at = Utc::now();

        // No division for an empty batch
        if self.total > 0 {
            self.progress = (processed_count as f64 / self.total as f64).min(1.0);
        }
    }

    pub fn finish(&mut self, status: ImportStatus) {
        if status == ImportStatus::Completed {
            self.progress = 1.0;
        }
        self.status = status;
        self.is_running = false;
        self.current_item_name = None;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }
}

/// Observable import state.
///
/// Every change is published as a whole snapshot, so subscribers never see a
/// half-applied update. Updates carrying the id of a batch that has since been
/// replaced are dropped.
pub struct ProgressTracker {
    state: watch::Sender<ImportProgress>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ImportProgress::default());
        Self { state }
    }

    pub fn subscribe(&self) -> watch::Receiver<ImportProgress> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ImportProgress {
        self.state.borrow().clone()
    }

    pub fn start_import(&self, batch_id: Uuid, total: usize) -> ImportProgress {
        let progress = ImportProgress::start(batch_id, total);
        self.state.send_replace(progress.clone());
        progress
    }

    pub fn set_current_item(&self, batch_id: Uuid, name: Option<String>) {
        self.modify(batch_id, |progress| {
            progress.current_item_name = name;
            progress.updated_at = Utc::now();
        });
    }

    pub fn update_progress(&self, batch_id: Uuid, processed_count: usize) {
        self.modify(batch_id, |progress| progress.update_progress(processed_count));
    }

    pub fn record_error(&self, batch_id: Uuid, message: String) {
        self.modify(batch_id, |progress| {
            progress.errors.push(message);
            progress.updated_at = Utc::now();
        });
    }

    pub fn complete_import(&self, batch_id: Uuid) {
        self.modify(batch_id, |progress| progress.finish(ImportStatus::Completed));
    }

    pub fn cancel_import(&self, batch_id: Uuid) {
        self.modify(batch_id, |progress| {
            if !progress.status.is_terminal() {
                progress.finish(ImportStatus::Cancelled);
            }
        });
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().is_running
    }

    fn modify(&self, batch_id: Uuid, update: impl FnOnce(&mut ImportProgress)) {
        self.state.send_if_modified(|progress| {
            if progress.batch_id != Some(batch_id) {
                return false;
            }
            update(progress);
            true
        });
    }
}
