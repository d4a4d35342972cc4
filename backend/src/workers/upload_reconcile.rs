//! Upload reconciliation worker
//!
//! Sweeps the upload directory for objects no file record references.

use crate::error::AppError;
use crate::services::UploadStorage;
use crate::store::EventStore;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{error, info, warn};

/// Objects younger than this may belong to an upload whose record is not yet inserted
pub const UPLOAD_GRACE_PERIOD: Duration = Duration::from_secs(15 * 60);

/// Counts from one reconciliation sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Unreferenced objects deleted from the upload directory
    pub removed: usize,
    /// Unreferenced objects left alone because they are within the grace period
    pub skipped_recent: usize,
    /// File records whose object is missing on disk
    pub missing: usize,
}

/// Compare the upload directory with the stored file records
///
/// Objects no record points at are deleted once older than `grace`.
/// Records pointing at missing objects are only counted and logged.
pub async fn reconcile_uploads(
    store: &dyn EventStore,
    storage: &UploadStorage,
    grace: Duration,
) -> Result<ReconcileReport, AppError> {
    let referenced = store.file_paths().await?;
    let referenced_names: HashSet<OsString> = referenced
        .iter()
        .filter_map(|p| Path::new(p).file_name().map(|n| n.to_os_string()))
        .collect();

    let mut report = ReconcileReport::default();

    for path in &referenced {
        if !storage.exists(Path::new(path)).await {
            warn!("[UploadReconcile] File record points at missing object {}", path);
            report.missing += 1;
        }
    }

    for object in storage.list_objects().await? {
        let Some(name) = object.path.file_name() else {
            continue;
        };
        if referenced_names.contains(name) {
            continue;
        }
        if object.age < grace {
            report.skipped_recent += 1;
            continue;
        }
        match storage.remove(&object.path).await {
            Ok(true) => {
                info!(
                    "[UploadReconcile] Deleted orphaned object {}",
                    object.path.display()
                );
                report.removed += 1;
            }
            Ok(false) => {}
            Err(e) => warn!("[UploadReconcile] {}", e),
        }
    }

    Ok(report)
}

async fn run_sweep(store: &dyn EventStore, storage: &UploadStorage) {
    match reconcile_uploads(store, storage, UPLOAD_GRACE_PERIOD).await {
        Ok(report) => info!(
            removed = report.removed,
            skipped_recent = report.skipped_recent,
            missing = report.missing,
            "[UploadReconcile] Sweep finished"
        ),
        Err(e) => error!("[UploadReconcile] Sweep failed: {}", e),
    }
}

/// Background worker that removes upload objects no file record references
///
/// Sweeps once at startup, then every `interval_secs` (0 disables the
/// periodic sweeps) until a shutdown message arrives.
pub async fn upload_reconcile_worker(
    store: Arc<dyn EventStore>,
    storage: UploadStorage,
    interval_secs: u64,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    info!("[UploadReconcile] Started");
    run_sweep(store.as_ref(), &storage).await;

    if interval_secs == 0 {
        info!("[UploadReconcile] Periodic sweeps disabled");
        return;
    }

    let mut ticker = interval(Duration::from_secs(interval_secs));
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("[UploadReconcile] Shutting down");
                break;
            }
            _ = ticker.tick() => {
                run_sweep(store.as_ref(), &storage).await;
            }
        }
    }

    info!("[UploadReconcile] Stopped");
}
