//! Uploaded file model.

use fieldcrm_core::error::CoreError;
use fieldcrm_core::files::{FileLink, FileType};
use fieldcrm_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `files` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: DbId,
    pub contractor_id: DbId,
    pub service_point_id: Option<DbId>,
    pub filename: String,
    #[serde(skip_serializing)]
    pub storage_path: String,
    pub file_type: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub is_pending: bool,
    pub suggestion_id: Option<DbId>,
    #[serde(skip_serializing)]
    pub upload_token: Option<String>,
    pub uploaded_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl StoredFile {
    pub fn link(&self) -> Result<FileLink, CoreError> {
        FileLink::from_columns(self.is_pending, self.suggestion_id, self.upload_token.clone())
    }
}

/// DTO for recording an uploaded file. The blob is already stored under
/// `storage_path`.
#[derive(Debug, Clone)]
pub struct CreateFile {
    pub id: DbId,
    pub contractor_id: DbId,
    pub service_point_id: Option<DbId>,
    pub filename: String,
    pub storage_path: String,
    pub file_type: FileType,
    pub mime_type: String,
    pub size_bytes: i64,
    /// `Committed` or `Staged`; files only become `Pending` by being claimed.
    pub link: FileLink,
    pub uploaded_by: Option<DbId>,
}
