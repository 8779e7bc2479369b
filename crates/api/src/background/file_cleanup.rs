//! Periodic cleanup of file blobs and rows nobody references.
//!
//! Each pass:
//!
//! 1. Retries blob deletions queued after a failed post-review cleanup.
//! 2. Purges staged uploads that no suggestion claimed within the TTL.
//! 3. Purges pending files left on suggestions that are no longer pending.
//!
//! Blobs of purged rows go through [`remove_orphaned_blobs`], so a failed
//! deletion lands back in the queue.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fieldcrm_core::storage::BlobStorage;
use fieldcrm_db::repositories::{CleanupQueueRepo, FileRepo};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::config::CleanupConfig;
use crate::review::remove_orphaned_blobs;

/// Queue entries retried per pass.
const RETRY_BATCH_SIZE: i64 = 100;

/// What one cleanup pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Queued blobs deleted on retry.
    pub retried_ok: usize,
    /// Queued blobs whose retry failed again.
    pub retried_failed: usize,
    /// Stale staged upload rows removed.
    pub staged_purged: usize,
    /// Pending rows of reviewed suggestions removed.
    pub pending_purged: usize,
    /// Blobs of purged rows that could not be deleted and were queued.
    pub newly_queued: usize,
}

/// Run the cleanup loop until `cancel` is triggered.
pub async fn run(
    pool: PgPool,
    storage: Arc<dyn BlobStorage>,
    config: CleanupConfig,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = config.interval_secs,
        staged_upload_ttl_hours = config.staged_upload_ttl_hours,
        "File cleanup job started"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("File cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                let report = run_once(&pool, storage.as_ref(), &config).await;
                if report == CleanupReport::default() {
                    tracing::debug!("File cleanup: nothing to do");
                } else {
                    tracing::info!(?report, "File cleanup pass finished");
                }
            }
        }
    }
}

/// Run a single cleanup pass. Errors are logged and the remaining steps
/// still run.
pub async fn run_once(
    pool: &PgPool,
    storage: &dyn BlobStorage,
    config: &CleanupConfig,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    match CleanupQueueRepo::list_due(pool, config.max_attempts, RETRY_BATCH_SIZE).await {
        Ok(entries) => {
            for entry in entries {
                match storage.delete(&entry.storage_path).await {
                    Ok(()) => {
                        if let Err(e) = CleanupQueueRepo::remove(pool, entry.id).await {
                            tracing::error!(entry_id = %entry.id, error = %e, "File cleanup: could not dequeue entry");
                        }
                        report.retried_ok += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            storage_path = %entry.storage_path,
                            attempts = entry.attempts + 1,
                            error = %e,
                            "File cleanup: retry failed",
                        );
                        if let Err(db_err) =
                            CleanupQueueRepo::record_failure(pool, entry.id, &e.to_string()).await
                        {
                            tracing::error!(entry_id = %entry.id, error = %db_err, "File cleanup: could not record failure");
                        }
                        report.retried_failed += 1;
                    }
                }
            }
        }
        Err(e) => tracing::error!(error = %e, "File cleanup: could not list queued deletions"),
    }

    match config.staged_cutoff(Utc::now()) {
        Some(cutoff) => match FileRepo::purge_stale_staged(pool, cutoff).await {
            Ok(paths) => {
                report.staged_purged = paths.len();
                report.newly_queued += remove_orphaned_blobs(pool, storage, &paths).await;
            }
            Err(e) => tracing::error!(error = %e, "File cleanup: could not purge staged uploads"),
        },
        None => tracing::error!(
            ttl_hours = config.staged_upload_ttl_hours,
            "File cleanup: staged upload TTL out of range, skipping purge",
        ),
    }

    match FileRepo::purge_orphaned_pending(pool).await {
        Ok(paths) => {
            report.pending_purged = paths.len();
            report.newly_queued += remove_orphaned_blobs(pool, storage, &paths).await;
        }
        Err(e) => tracing::error!(error = %e, "File cleanup: could not purge orphaned pending files"),
    }

    report
}
