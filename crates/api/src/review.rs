//! Review orchestration: the transactional merge, then blob cleanup.
//!
//! [`MergeRepo::review`] commits the status change and every row change in
//! one transaction and hands back the storage paths of file rows it deleted.
//! The blobs behind those paths are removed afterwards. A failed blob
//! deletion never fails the review: it is logged as a [`FileCleanupError`]
//! and queued for the background cleanup job.

use fieldcrm_core::files::FileCleanupError;
use fieldcrm_core::storage::BlobStorage;
use fieldcrm_db::models::suggestion::Suggestion;
use fieldcrm_db::repositories::{CleanupQueueRepo, MergeRepo, ReviewRequest};
use sqlx::PgPool;

use crate::error::AppResult;
use crate::state::AppState;

/// Approve or reject a suggestion and remove the blobs it orphaned.
pub async fn review_suggestion(state: &AppState, request: ReviewRequest) -> AppResult<Suggestion> {
    let outcome = MergeRepo::review(&state.pool, request).await?;
    remove_orphaned_blobs(&state.pool, state.storage.as_ref(), &outcome.orphaned_paths).await;
    Ok(outcome.suggestion)
}

/// Best-effort deletion of blobs whose file rows are gone.
///
/// Returns the number of paths that could not be deleted and were queued
/// for retry.
pub async fn remove_orphaned_blobs(
    pool: &PgPool,
    storage: &dyn BlobStorage,
    paths: &[String],
) -> usize {
    let mut queued = 0;
    for path in paths {
        let Err(e) = storage.delete(path).await else {
            tracing::debug!(storage_path = %path, "Orphaned blob deleted");
            continue;
        };

        let failure = FileCleanupError {
            storage_path: path.clone(),
            reason: e.to_string(),
        };
        tracing::warn!(error = %failure, "Blob cleanup failed, queuing retry");

        match CleanupQueueRepo::enqueue(pool, path, &failure.reason).await {
            Ok(_) => queued += 1,
            Err(db_err) => {
                tracing::error!(
                    storage_path = %path,
                    error = %db_err,
                    "Could not queue blob for cleanup; it stays orphaned",
                );
            }
        }
    }
    queued
}
