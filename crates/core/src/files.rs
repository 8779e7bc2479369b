//! File attachment link states and classification.
//!
//! A stored file is in exactly one of three states:
//!
//! - `Committed`: visible on the contractor or service point.
//! - `Staged`: uploaded under a client-generated token, not yet claimed by a
//!   suggestion. Invisible.
//! - `Pending`: attached to a pending suggestion. Invisible until the
//!   suggestion is approved with its files accepted.
//!
//! The database stores the state as `is_pending`, `suggestion_id` and
//! `upload_token` columns guarded by a CHECK constraint; [`FileLink`] is the
//! typed view of those three columns.

use serde::{Deserialize, Serialize};

use crate::changeset::ChangeSet;
use crate::error::CoreError;
use crate::types::DbId;

/// Longest accepted client upload token.
pub const MAX_UPLOAD_TOKEN_LEN: usize = 128;

/// Link state of a file row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileLink {
    Committed,
    Staged { upload_token: String },
    Pending { suggestion_id: DbId },
}

impl FileLink {
    /// Rebuild the link from its database columns.
    pub fn from_columns(
        is_pending: bool,
        suggestion_id: Option<DbId>,
        upload_token: Option<String>,
    ) -> Result<Self, CoreError> {
        match (is_pending, suggestion_id, upload_token) {
            (false, None, None) => Ok(Self::Committed),
            (true, Some(suggestion_id), None) => Ok(Self::Pending { suggestion_id }),
            (true, None, Some(upload_token)) => Ok(Self::Staged { upload_token }),
            (is_pending, suggestion_id, token) => Err(CoreError::Internal(format!(
                "Inconsistent file link: is_pending={is_pending}, suggestion_id={suggestion_id:?}, \
                 upload_token present={}",
                token.is_some()
            ))),
        }
    }

    pub fn is_pending(&self) -> bool {
        !matches!(self, Self::Committed)
    }

    pub fn suggestion_id(&self) -> Option<DbId> {
        match self {
            Self::Pending { suggestion_id } => Some(*suggestion_id),
            _ => None,
        }
    }

    pub fn upload_token(&self) -> Option<&str> {
        match self {
            Self::Staged { upload_token } => Some(upload_token),
            _ => None,
        }
    }
}

/// Validate a client-generated upload token.
///
/// Tokens are opaque to the server but must be short and URL-safe.
pub fn validate_upload_token(token: &str) -> Result<(), CoreError> {
    let valid_chars = token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if token.is_empty() || token.len() > MAX_UPLOAD_TOKEN_LEN || !valid_chars {
        return Err(CoreError::Validation(format!(
            "Upload token must be 1-{MAX_UPLOAD_TOKEN_LEN} characters of [A-Za-z0-9_-]"
        )));
    }
    Ok(())
}

/// Require every file a change-set attaches to be one of `attached`, the
/// `(file id, service point id)` pairs of the suggestion's pending files.
///
/// A file staged for one service point cannot be proposed for another one or
/// for the contractor itself.
pub fn ensure_added_files_attached(
    changes: &ChangeSet,
    attached: &[(DbId, Option<DbId>)],
) -> Result<(), CoreError> {
    for (file_id, service_point_id) in changes.added_files() {
        match attached.iter().find(|(id, _)| *id == file_id) {
            None => {
                return Err(CoreError::Validation(format!(
                    "File {file_id} is not an upload of this suggestion"
                )));
            }
            Some((_, owner)) if *owner != service_point_id => {
                return Err(CoreError::Validation(format!(
                    "File {file_id} was uploaded for a different target"
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// File type
// ---------------------------------------------------------------------------

/// Coarse media category derived from the mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Image,
    Video,
    Other,
}

impl FileType {
    pub fn classify(mime_type: &str) -> Self {
        let top = mime_type
            .split('/')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match top.as_str() {
            "image" => Self::Image,
            "video" => Self::Video,
            _ => Self::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "other" => Ok(Self::Other),
            other => Err(CoreError::Internal(format!("Unknown file type '{other}'"))),
        }
    }
}

/// A stored binary that could not be deleted.
///
/// Never propagated to the caller of a review: it is logged and queued for
/// the background cleanup job.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Failed to delete stored file '{storage_path}': {reason}")]
pub struct FileCleanupError {
    pub storage_path: String,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
