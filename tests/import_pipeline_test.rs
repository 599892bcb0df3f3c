use anyhow::Result;
use file_organizer_rs::config::ImportConfig;
use file_organizer_rs::models::{DocumentCategory, ExternalReference};
use file_organizer_rs::repositories::{CatalogStore, FileRepository, InMemoryCatalog};
use file_organizer_rs::services::{
    AccessProvider, DirectoryPicker, DocumentPicker, ImportEvent, ImportService, ImportStatus,
    LocalAccessProvider, PickerOutcome, ProgressTracker,
};
use file_organizer_rs::test_utils::{create_test_database, init_test_tracing, write_document};
use file_organizer_rs::ResolutionError;
use futures::StreamExt;
use std::sync::Arc;
use tempfile::TempDir;

struct TestSetup {
    dir: TempDir,
    catalog: Arc<InMemoryCatalog>,
    access: Arc<LocalAccessProvider>,
    import_service: ImportService,
}

impl TestSetup {
    fn new() -> Result<Self> {
        init_test_tracing();
        let dir = tempfile::tempdir()?;
        let catalog = Arc::new(InMemoryCatalog::new());
        let access = Arc::new(LocalAccessProvider::new());
        let import_service = ImportService::new(
            catalog.clone(),
            access.clone(),
            Arc::new(ProgressTracker::new()),
            ImportConfig { item_delay_ms: 0 },
        );

        Ok(Self { dir, catalog, access, import_service })
    }

    fn document(&self, name: &str, size: usize) -> Result<ExternalReference> {
        let path = write_document(self.dir.path(), name, size)?;
        Ok(ExternalReference::from_path(&path))
    }
}

#[tokio::test]
async fn test_all_resolvable_items_are_imported() -> Result<()> {
    let setup = TestSetup::new()?;
    let references = vec![
        setup.document("one.pdf", 10)?,
        setup.document("two.DOCX", 20)?,
        setup.document("three.hwp", 30)?,
    ];

    let outcome = setup.import_service.start_import(references).await.finished().await;

    assert_eq!(outcome.status, ImportStatus::Completed);
    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.processed_count, 3);
    assert_eq!(outcome.progress, 1.0);
    assert_eq!(outcome.imported.len(), 3);
    assert!(outcome.skipped.is_empty());

    // Most recently processed first
    let session: Vec<String> = setup
        .import_service
        .uploaded_files()
        .await
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(session, vec!["three.hwp", "two.DOCX", "one.pdf"]);

    let two = outcome.imported.iter().find(|f| f.name == "two.DOCX").unwrap();
    assert_eq!(two.file_extension, "docx");
    assert_eq!(two.size, 20);

    let progress = setup.import_service.progress();
    assert_eq!(progress.status, ImportStatus::Completed);
    assert!(!progress.is_running);
    assert_eq!(progress.processed_count, 3);
    assert_eq!(progress.progress, 1.0);
    assert!(progress.current_item_name.is_none());

    assert_eq!(setup.catalog.len().await, 3);
    assert_eq!(setup.access.grants().active_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_unresolvable_item_does_not_abort_batch() -> Result<()> {
    let setup = TestSetup::new()?;
    let missing = ExternalReference::from_path(&setup.dir.path().join("gone.xlsx"));
    let references = vec![
        setup.document("first.ppt", 5)?,
        missing,
        setup.document("last.xls", 5)?,
    ];

    let outcome = setup.import_service.start_import(references).await.finished().await;

    assert_eq!(outcome.status, ImportStatus::Completed);
    assert_eq!(outcome.progress, 1.0);
    assert_eq!(outcome.processed_count, 3);
    assert_eq!(outcome.imported.len(), 2);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].name, "gone.xlsx");
    assert!(matches!(outcome.skipped[0].reason, ResolutionError::TargetMissing(_)));

    let names: Vec<String> = setup.catalog.fetch_all().await?.into_iter().map(|f| f.name).collect();
    assert!(names.contains(&"first.ppt".to_string()));
    assert!(names.contains(&"last.xls".to_string()));

    let progress = setup.import_service.progress();
    assert_eq!(progress.progress, 1.0);
    assert_eq!(progress.errors.len(), 1);
    assert_eq!(setup.access.grants().active_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_reimport_updates_existing_record() -> Result<()> {
    let setup = TestSetup::new()?;
    let reference = setup.document("contract.pdf", 100)?;

    setup
        .import_service
        .start_import(vec![reference.clone()])
        .await
        .finished()
        .await;
    let first = setup.catalog.fetch_all().await?;
    assert_eq!(first.len(), 1);

    // Same file grows on disk, then gets picked again
    write_document(setup.dir.path(), "contract.pdf", 250)?;
    setup.import_service.start_import(vec![reference]).await.finished().await;

    let second = setup.catalog.fetch_all().await?;
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, first[0].id);
    assert_eq!(second[0].size, 250);
    assert!(second[0].date_uploaded >= first[0].date_uploaded);

    // Both imports stay in the session list, the projection keeps the latest
    assert_eq!(setup.import_service.uploaded_files().await.len(), 2);
    let recent = setup.import_service.recent_uploads().await;
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].size, 250);

    Ok(())
}

#[tokio::test]
async fn test_empty_batch_completes() -> Result<()> {
    let setup = TestSetup::new()?;

    let outcome = setup.import_service.start_import(Vec::new()).await.finished().await;

    assert_eq!(outcome.status, ImportStatus::Completed);
    assert_eq!(outcome.total, 0);
    assert_eq!(outcome.processed_count, 0);
    assert_eq!(outcome.progress, 1.0);
    assert!(setup.catalog.is_empty().await);

    Ok(())
}

#[tokio::test]
async fn test_catalog_write_failure_is_not_fatal() -> Result<()> {
    let setup = TestSetup::new()?;
    setup.catalog.set_fail_writes(true);
    let references = vec![setup.document("a.pdf", 1)?, setup.document("b.pdf", 1)?];

    let mut batch = setup.import_service.start_import(references).await;
    let mut unsaved = 0;
    let mut completed = false;
    while let Some(event) = batch.events.next().await {
        match event {
            ImportEvent::ItemImported { record, .. } => {
                assert!(record.is_none());
                unsaved += 1;
            }
            ImportEvent::Completed { processed_count } => {
                assert_eq!(processed_count, 2);
                completed = true;
            }
            _ => {}
        }
    }

    assert!(completed);
    assert_eq!(unsaved, 2);
    assert!(setup.catalog.is_empty().await);
    assert_eq!(setup.import_service.uploaded_files().await.len(), 2);
    assert_eq!(setup.import_service.progress().errors.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_progress_events_are_monotonic() -> Result<()> {
    let setup = TestSetup::new()?;
    let references = vec![
        setup.document("1.pdf", 1)?,
        setup.document("2.pdf", 1)?,
        setup.document("3.pdf", 1)?,
        setup.document("4.pdf", 1)?,
    ];

    let mut batch = setup.import_service.start_import(references).await;
    let mut seen = Vec::new();
    while let Some(event) = batch.events.next().await {
        if let ImportEvent::ItemImported { processed_count, progress, .. } = event {
            seen.push((processed_count, progress));
        }
    }

    assert_eq!(seen, vec![(1, 0.25), (2, 0.5), (3, 0.75), (4, 1.0)]);

    Ok(())
}

#[tokio::test]
async fn test_import_persists_into_sqlite_catalog() -> Result<()> {
    init_test_tracing();
    let dir = tempfile::tempdir()?;
    let repository = Arc::new(FileRepository::new(create_test_database().await?));
    let access: Arc<dyn AccessProvider> = Arc::new(LocalAccessProvider::new());
    let import_service = ImportService::new(
        repository.clone(),
        access,
        Arc::new(ProgressTracker::new()),
        ImportConfig { item_delay_ms: 1 },
    );

    let path = write_document(dir.path(), "minutes.hwpx", 64)?;
    let reference = ExternalReference::new(format!("file://{}", path.display()));

    let outcome = import_service.start_import(vec![reference]).await.finished().await;
    assert_eq!(outcome.imported.len(), 1);

    let stored = repository.fetch_all().await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "minutes.hwpx");
    assert_eq!(stored[0].file_extension, "hwpx");
    assert_eq!(stored[0].size, 64);
    assert!(!stored[0].access_token.is_empty());

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_linked_file_keeps_picked_name() -> Result<()> {
    let setup = TestSetup::new()?;
    let target = write_document(setup.dir.path(), "blob-1234.tmp", 12)?;
    let link = setup.dir.path().join("Report.xlsx");
    std::os::unix::fs::symlink(&target, &link)?;
    let reference = ExternalReference::from_path(&link);
    assert_eq!(reference.file_name(), "Report.xlsx");

    let outcome = setup.import_service.start_import(vec![reference]).await.finished().await;

    assert_eq!(outcome.imported.len(), 1);
    let stored = setup.catalog.fetch_all().await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Report.xlsx");
    assert_eq!(stored[0].file_extension, "xlsx");
    assert_eq!(stored[0].category(), DocumentCategory::Excel);
    assert_eq!(stored[0].size, 12);

    // The stored token still opens the file behind the link
    let guard = setup.access.resolve(&stored[0].access_token).await?;
    assert_eq!(guard.path(), std::fs::canonicalize(&target)?);
    assert_eq!(guard.selected_path(), link);

    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_non_utf8_file_name_is_imported() -> Result<()> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let setup = TestSetup::new()?;
    let path = setup.dir.path().join(OsStr::from_bytes(b"bad\xff.pdf"));
    std::fs::write(&path, b"%PDF-")?;

    let references = match DirectoryPicker::new(setup.dir.path())
        .pick_files(&[DocumentCategory::Pdf], true)
        .await
    {
        PickerOutcome::Selected(references) => references,
        PickerOutcome::Cancelled => panic!("file was not offered"),
    };
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].to_path(), path);

    let outcome = setup.import_service.start_import(references).await.finished().await;

    assert!(outcome.skipped.is_empty(), "{:?}", outcome.skipped);
    assert_eq!(outcome.imported.len(), 1);
    assert_eq!(outcome.imported[0].name, "bad\u{FFFD}.pdf");
    assert_eq!(outcome.imported[0].file_extension, "pdf");
    assert_eq!(outcome.imported[0].size, 5);

    let stored = setup.catalog.fetch_all().await?;
    let guard = setup.access.resolve(&stored[0].access_token).await?;
    assert_eq!(guard.path(), path);

    Ok(())
}
