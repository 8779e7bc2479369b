//! Suggestion lifecycle: status values, review actions and the stale-baseline
//! policy.
//!
//! A suggestion is created `PENDING` and moves exactly once to `APPROVED` or
//! `REJECTED`. Terminal suggestions are never reviewed again.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Status ID type matching the SMALLINT `suggestion_statuses` lookup table.
pub type StatusId = i16;

/// Maximum length of an author or reviewer comment.
pub const MAX_COMMENT_LEN: usize = 2000;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Suggestion status. Discriminants match the `suggestion_statuses` seed rows.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionStatus {
    Pending = 1,
    Approved = 2,
    Rejected = 3,
}

impl SuggestionStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    pub fn from_id(id: StatusId) -> Result<Self, CoreError> {
        match id {
            1 => Ok(Self::Pending),
            2 => Ok(Self::Approved),
            3 => Ok(Self::Rejected),
            other => Err(CoreError::Internal(format!(
                "Unknown suggestion status id {other}"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parse a status filter as sent by clients (case-insensitive).
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(CoreError::Validation(format!(
                "Unknown suggestion status '{value}'. Must be one of: PENDING, APPROVED, REJECTED"
            ))),
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fail with [`CoreError::AlreadyReviewed`] unless the suggestion is pending.
pub fn ensure_pending(id: DbId, status: SuggestionStatus) -> Result<(), CoreError> {
    if status.is_terminal() {
        return Err(CoreError::AlreadyReviewed { id });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Review action
// ---------------------------------------------------------------------------

/// A reviewer's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            other => Err(CoreError::InvalidAction(format!(
                "'{other}'. Must be one of: approve, reject"
            ))),
        }
    }

    /// The status a suggestion ends in after this action.
    pub fn terminal_status(self) -> SuggestionStatus {
        match self {
            Self::Approve => SuggestionStatus::Approved,
            Self::Reject => SuggestionStatus::Rejected,
        }
    }
}

/// Validate an optional comment.
pub fn validate_comment(comment: Option<&str>) -> Result<(), CoreError> {
    match comment {
        Some(c) if c.chars().count() > MAX_COMMENT_LEN => Err(CoreError::Validation(format!(
            "Comment must be at most {MAX_COMMENT_LEN} characters"
        ))),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Stale baseline policy
// ---------------------------------------------------------------------------

/// What to do when the contractor changed after a suggestion was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StalePolicy {
    /// Apply the accepted values over whatever is committed now.
    #[default]
    LastWriterWins,
    /// Refuse approval with [`CoreError::Conflict`].
    Refuse,
}

impl StalePolicy {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "last_writer_wins" => Ok(Self::LastWriterWins),
            "refuse" => Ok(Self::Refuse),
            other => Err(CoreError::Validation(format!(
                "Unknown stale policy '{other}'. Must be one of: last_writer_wins, refuse"
            ))),
        }
    }

    /// Compare the version the suggestion was diffed against with the
    /// contractor's current version.
    pub fn check_baseline(
        self,
        suggestion_id: DbId,
        base_version: i64,
        current_version: i64,
    ) -> Result<(), CoreError> {
        if self == Self::Refuse && base_version != current_version {
            return Err(CoreError::Conflict(format!(
                "Suggestion {suggestion_id} was made against version {base_version}, \
                 contractor is now at version {current_version}"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use uuid::Uuid;

    #[test]
    fn status_ids_match_seed_rows() {
        for status in [
            SuggestionStatus::Pending,
            SuggestionStatus::Approved,
            SuggestionStatus::Rejected,
        ] {
            assert_eq!(SuggestionStatus::from_id(status.id()).unwrap(), status);
        }
        assert_eq!(SuggestionStatus::Pending.id(), 1);
        assert_matches!(SuggestionStatus::from_id(9), Err(CoreError::Internal(_)));
    }

    #[test]
    fn status_serializes_upper_case() {
        let json = serde_json::to_string(&SuggestionStatus::Approved).unwrap();
        assert_eq!(json, "\"APPROVED\"");
        assert_eq!(SuggestionStatus::parse("rejected").unwrap(), SuggestionStatus::Rejected);
    }

    #[test]
    fn terminal_suggestions_cannot_be_reviewed() {
        let id = Uuid::new_v4();
        assert!(ensure_pending(id, SuggestionStatus::Pending).is_ok());
        assert_matches!(
            ensure_pending(id, SuggestionStatus::Approved),
            Err(CoreError::AlreadyReviewed { id: got }) if got == id
        );
        assert_matches!(
            ensure_pending(id, SuggestionStatus::Rejected),
            Err(CoreError::AlreadyReviewed { .. })
        );
    }

    #[test]
    fn review_action_parsing() {
        assert_eq!(ReviewAction::parse("approve").unwrap(), ReviewAction::Approve);
        assert_eq!(
            ReviewAction::parse("reject").unwrap().terminal_status(),
            SuggestionStatus::Rejected
        );
        assert_matches!(ReviewAction::parse("merge"), Err(CoreError::InvalidAction(_)));
        assert_matches!(ReviewAction::parse("APPROVE"), Err(CoreError::InvalidAction(_)));
    }

    #[test]
    fn comment_length_is_bounded() {
        assert!(validate_comment(None).is_ok());
        assert!(validate_comment(Some(&"x".repeat(MAX_COMMENT_LEN))).is_ok());
        assert_matches!(
            validate_comment(Some(&"x".repeat(MAX_COMMENT_LEN + 1))),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn last_writer_wins_ignores_version_drift() {
        assert!(StalePolicy::default()
            .check_baseline(Uuid::new_v4(), 1, 5)
            .is_ok());
    }

    #[test]
    fn refuse_policy_conflicts_on_drift() {
        let policy = StalePolicy::parse("refuse").unwrap();
        assert!(policy.check_baseline(Uuid::new_v4(), 3, 3).is_ok());
        assert_matches!(
            policy.check_baseline(Uuid::new_v4(), 3, 4),
            Err(CoreError::Conflict(_))
        );
        assert_matches!(StalePolicy::parse("first_wins"), Err(CoreError::Validation(_)));
    }
}
