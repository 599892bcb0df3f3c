use crate::config::ImportConfig;
use crate::errors::ResolutionError;
use crate::models::{ExternalReference, FileRecord, UploadedFile};
use crate::repositories::CatalogStore;
use crate::services::access::AccessProvider;
use crate::services::progress::{ImportProgress, ImportStatus, ProgressTracker};
use crate::services::recent::unique_latest_by_name;
use futures::future::{BoxFuture, Shared};
use futures::{FutureExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Progress notifications of a single import batch, in processing order
#[derive(Debug, Clone)]
pub enum ImportEvent {
    Started {
        batch_id: Uuid,
        total: usize,
    },
    ItemImported {
        file: UploadedFile,
        /// Stored record, `None` when the catalog write failed
        record: Option<FileRecord>,
        processed_count: usize,
        progress: f64,
    },
    ItemSkipped {
        name: String,
        reason: ResolutionError,
        processed_count: usize,
        progress: f64,
    },
    Completed {
        processed_count: usize,
    },
    Cancelled {
        processed_count: usize,
    },
}

#[derive(Debug, Clone)]
pub struct SkippedItem {
    pub name: String,
    pub reason: ResolutionError,
}

/// Summary of a finished batch
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub batch_id: Uuid,
    pub status: ImportStatus,
    pub total: usize,
    pub processed_count: usize,
    pub progress: f64,
    pub imported: Vec<UploadedFile>,
    pub skipped: Vec<SkippedItem>,
}

/// Handle on a started batch
pub struct ImportBatch {
    pub batch_id: Uuid,
    pub events: UnboundedReceiverStream<ImportEvent>,
}

impl ImportBatch {
    /// Drain the event stream until the batch terminates
    pub async fn finished(mut self) -> ImportOutcome {
        let mut outcome = ImportOutcome {
            batch_id: self.batch_id,
            status: ImportStatus::Running,
            total: 0,
            processed_count: 0,
            progress: 0.0,
            imported: Vec::new(),
            skipped: Vec::new(),
        };

        while let Some(event) = self.events.next().await {
            match event {
                ImportEvent::Started { total, .. } => outcome.total = total,
                ImportEvent::ItemImported { file, processed_count, progress, .. } => {
                    outcome.processed_count = processed_count;
                    outcome.progress = progress;
                    outcome.imported.push(file);
                }
                ImportEvent::ItemSkipped { name, reason, processed_count, progress } => {
                    outcome.processed_count = processed_count;
                    outcome.progress = progress;
                    outcome.skipped.push(SkippedItem { name, reason });
                }
                ImportEvent::Completed { processed_count } => {
                    outcome.processed_count = processed_count;
                    outcome.progress = 1.0;
                    outcome.status = ImportStatus::Completed;
                }
                ImportEvent::Cancelled { processed_count } => {
                    outcome.processed_count = processed_count;
                    outcome.status = ImportStatus::Cancelled;
                }
            }
        }

        // The task went away without a terminal event
        if outcome.status == ImportStatus::Running {
            outcome.status = ImportStatus::Cancelled;
        }

        outcome
    }
}

type BatchDone = Shared<BoxFuture<'static, ()>>;

struct ActiveBatch {
    batch_id: Uuid,
    cancellation_token: CancellationToken,
    done: BatchDone,
}

fn progress_fraction(processed_count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (processed_count as f64 / total as f64).min(1.0)
}

/// Imports batches of picked files into the catalog, one file at a time
#[derive(Clone)]
pub struct ImportService {
    catalog: Arc<dyn CatalogStore>,
    access: Arc<dyn AccessProvider>,
    progress_tracker: Arc<ProgressTracker>,
    config: ImportConfig,
    uploaded_files: Arc<RwLock<Vec<UploadedFile>>>,
    active_batch: Arc<Mutex<Option<ActiveBatch>>>,
}

impl ImportService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        access: Arc<dyn AccessProvider>,
        progress_tracker: Arc<ProgressTracker>,
        config: ImportConfig,
    ) -> Self {
        Self {
            catalog,
            access,
            progress_tracker,
            config,
            uploaded_files: Arc::new(RwLock::new(Vec::new())),
            active_batch: Arc::new(Mutex::new(None)),
        }
    }

    /// Start importing `references`, replacing any batch still in flight.
    ///
    /// The replaced batch stops after its current item, and this batch does not
    /// touch its first item before the replaced one has fully stopped.
    pub async fn start_import(&self, references: Vec<ExternalReference>) -> ImportBatch {
        let batch_id = Uuid::new_v4();
        let cancellation_token = CancellationToken::new();
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut active = self.active_batch.lock().await;
        let previous = active.take().map(|previous| {
            info!("Cancelling import batch {} in favour of {}", previous.batch_id, batch_id);
            previous.cancellation_token.cancel();
            previous.done
        });

        self.progress_tracker.start_import(batch_id, references.len());

        let service = self.clone();
        let token = cancellation_token.clone();
        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                previous.await;
            }
            service.run_batch(batch_id, references, token, sender).await;
        });

        let done = async move {
            if let Err(e) = handle.await {
                warn!("Import batch {} ended abnormally: {}", batch_id, e);
            }
        }
        .boxed()
        .shared();

        *active = Some(ActiveBatch { batch_id, cancellation_token, done });

        ImportBatch { batch_id, events: UnboundedReceiverStream::new(receiver) }
    }

    /// Ask the running batch to stop after its current item
    pub async fn cancel(&self) {
        if let Some(active) = self.active_batch.lock().await.as_ref() {
            info!("Cancellation requested for import batch {}", active.batch_id);
            active.cancellation_token.cancel();
        }
    }

    /// Wait until the latest batch has stopped
    pub async fn wait_for_idle(&self) {
        let done = self.active_batch.lock().await.as_ref().map(|active| active.done.clone());
        if let Some(done) = done {
            done.await;
        }
    }

    pub fn progress(&self) -> ImportProgress {
        self.progress_tracker.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ImportProgress> {
        self.progress_tracker.subscribe()
    }

    /// Files imported during this session, most recently processed first
    pub async fn uploaded_files(&self) -> Vec<UploadedFile> {
        self.uploaded_files.read().await.clone()
    }

    /// Session uploads with one entry per file name
    pub async fn recent_uploads(&self) -> Vec<UploadedFile> {
        unique_latest_by_name(&self.uploaded_files.read().await)
    }

    async fn run_batch(
        &self,
        batch_id: Uuid,
        references: Vec<ExternalReference>,
        cancellation_token: CancellationToken,
        events: mpsc::UnboundedSender<ImportEvent>,
    ) {
        let total = references.len();
        info!("Starting import batch {} with {} file(s)", batch_id, total);
        let _ = events.send(ImportEvent::Started { batch_id, total });

        let mut processed_count = 0;

        for (index, reference) in references.iter().enumerate() {
            if cancellation_token.is_cancelled() {
                info!(
                    "Import batch {} cancelled after {}/{} file(s)",
                    batch_id, processed_count, total
                );
                self.progress_tracker.cancel_import(batch_id);
                let _ = events.send(ImportEvent::Cancelled { processed_count });
                return;
            }

            let name = reference.file_name();
            self.progress_tracker.set_current_item(batch_id, Some(name.clone()));

            let result = self.import_one(reference).await;
            processed_count = index + 1;
            let progress = progress_fraction(processed_count, total);

            match result {
                Ok(file) => {
                    let record = self.persist(batch_id, &file).await;
                    self.uploaded_files.write().await.insert(0, file.clone());
                    self.progress_tracker.update_progress(batch_id, processed_count);
                    let _ = events.send(ImportEvent::ItemImported { file, record, processed_count, progress });
                }
                Err(reason) => {
                    warn!("Skipping {} in import batch {}: {}", reference, batch_id, reason);
                    self.progress_tracker
                        .record_error(batch_id, format!("{}: {}", name, reason));
                    self.progress_tracker.update_progress(batch_id, processed_count);
                    let _ = events.send(ImportEvent::ItemSkipped { name, reason, processed_count, progress });
                }
            }

            if processed_count < total {
                self.pause(&cancellation_token).await;
            }
        }

        info!("Import batch {} completed ({} file(s))", batch_id, total);
        self.progress_tracker.complete_import(batch_id);
        let _ = events.send(ImportEvent::Completed { processed_count });
    }

    /// Acquire the picked file, bookmark it and release it again
    async fn import_one(&self, reference: &ExternalReference) -> Result<UploadedFile, ResolutionError> {
        let guard = self.access.acquire(reference).await?;
        let bookmark = self.access.bookmark(&guard).await?;
        drop(guard);

        debug!(
            "Bookmarked {} ({} bytes) at {}",
            bookmark.metadata.name, bookmark.metadata.size, bookmark.path
        );

        let mut file = UploadedFile::new(
            bookmark.metadata.name,
            bookmark.metadata.size,
            bookmark.path,
            bookmark.token,
        );
        file.file_extension = bookmark.metadata.extension;
        Ok(file)
    }

    async fn persist(&self, batch_id: Uuid, file: &UploadedFile) -> Option<FileRecord> {
        match self.catalog.upsert(file).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Imported {} but could not save it to the catalog: {}", file.name, e);
                self.progress_tracker.record_error(batch_id, format!("{}: {}", file.name, e));
                None
            }
        }
    }

    async fn pause(&self, cancellation_token: &CancellationToken) {
        let delay = self.config.item_delay();
        if delay.is_zero() {
            tokio::task::yield_now().await;
            return;
        }

        tokio::select! {
            _ = cancellation_token.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
