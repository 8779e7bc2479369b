//! Suggestion model.

use fieldcrm_core::changeset::ChangeSet;
use fieldcrm_core::error::CoreError;
use fieldcrm_core::suggestion::{StatusId, SuggestionStatus};
use fieldcrm_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `suggestions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: DbId,
    pub contractor_id: DbId,
    pub author_id: DbId,
    /// Change-set in its wire shape.
    pub changes: serde_json::Value,
    pub comment: Option<String>,
    pub status_id: StatusId,
    pub reviewer_id: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub review_comment: Option<String>,
    pub base_version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Suggestion {
    pub fn status(&self) -> Result<SuggestionStatus, CoreError> {
        SuggestionStatus::from_id(self.status_id)
    }

    pub fn change_set(&self) -> Result<ChangeSet, CoreError> {
        ChangeSet::from_wire(self.changes.clone())
    }
}

/// DTO for creating a suggestion.
#[derive(Debug, Clone)]
pub struct CreateSuggestion {
    pub contractor_id: DbId,
    pub author_id: DbId,
    pub changes: ChangeSet,
    pub comment: Option<String>,
    /// Contractor version the change-set was computed against.
    pub base_version: i64,
    /// Staged uploads with this token (and uploaded by the author) become
    /// pending files of the new suggestion.
    pub upload_token: Option<String>,
}
