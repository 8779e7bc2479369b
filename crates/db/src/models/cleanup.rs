use fieldcrm_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `file_cleanup_queue` table: a stored blob whose deletion
/// failed and is waiting for a retry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CleanupEntry {
    pub id: DbId,
    pub storage_path: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
