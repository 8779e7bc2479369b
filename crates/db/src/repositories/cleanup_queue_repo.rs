//! Repository for the `file_cleanup_queue` table.
//!
//! Blob deletions that fail after a review are queued here and retried by
//! the background cleanup job with exponential backoff.

use fieldcrm_core::types::DbId;
use sqlx::PgPool;

use crate::models::cleanup::CleanupEntry;

const COLUMNS: &str =
    "id, storage_path, attempts, last_error, next_attempt_at, created_at, updated_at";

/// Upper bound for the retry delay (seconds).
const MAX_BACKOFF_SECS: i64 = 3600;

/// Base retry delay (seconds), doubled per failed attempt.
const BASE_BACKOFF_SECS: i64 = 30;

pub struct CleanupQueueRepo;

impl CleanupQueueRepo {
    /// Queue a storage path for deletion. Re-queuing a known path only
    /// refreshes its error.
    pub async fn enqueue(
        pool: &PgPool,
        storage_path: &str,
        error: &str,
    ) -> Result<CleanupEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO file_cleanup_queue (storage_path, last_error)
             VALUES ($1, $2)
             ON CONFLICT (storage_path) DO UPDATE SET last_error = EXCLUDED.last_error
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CleanupEntry>(&query)
            .bind(storage_path)
            .bind(error)
            .fetch_one(pool)
            .await
    }

    /// Entries whose retry time has come and that have attempts left.
    pub async fn list_due(
        pool: &PgPool,
        max_attempts: i32,
        limit: i64,
    ) -> Result<Vec<CleanupEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM file_cleanup_queue
             WHERE next_attempt_at <= NOW() AND attempts < $1
             ORDER BY next_attempt_at
             LIMIT $2"
        );
        sqlx::query_as::<_, CleanupEntry>(&query)
            .bind(max_attempts)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn remove(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM file_cleanup_queue WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record another failed attempt and push the next one back.
    pub async fn record_failure(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE file_cleanup_queue
             SET attempts = attempts + 1,
                 last_error = $2,
                 next_attempt_at = NOW() + make_interval(
                     secs => LEAST($3::BIGINT, $4::BIGINT * power(2, LEAST(attempts, 20))::BIGINT)
                 )
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .bind(MAX_BACKOFF_SECS)
        .bind(BASE_BACKOFF_SECS)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM file_cleanup_queue")
            .fetch_one(pool)
            .await
    }
}
