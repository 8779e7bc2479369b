//! Repository for the `suggestions` table.

use fieldcrm_core::error::CoreError;
use fieldcrm_core::files::ensure_added_files_attached;
use fieldcrm_core::suggestion::SuggestionStatus;
use fieldcrm_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::error::RepoError;
use crate::models::suggestion::{CreateSuggestion, Suggestion};
use crate::repositories::FileRepo;

/// Column list for suggestions queries.
const COLUMNS: &str = "id, contractor_id, author_id, changes, comment, status_id, \
    reviewer_id, reviewed_at, review_comment, base_version, created_at, updated_at";

pub struct SuggestionRepo;

impl SuggestionRepo {
    /// Insert a pending suggestion and claim the author's staged uploads for
    /// it in the same transaction.
    ///
    /// Every file the change-set attaches must be one of the claimed uploads,
    /// staged for the same service point (or for the contractor itself).
    pub async fn create(pool: &PgPool, input: &CreateSuggestion) -> Result<Suggestion, RepoError> {
        if input.changes.is_empty() {
            return Err(CoreError::NoChanges.into());
        }

        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO suggestions
                (contractor_id, author_id, changes, comment, status_id, base_version)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let suggestion = sqlx::query_as::<_, Suggestion>(&query)
            .bind(input.contractor_id)
            .bind(input.author_id)
            .bind(input.changes.to_wire()?)
            .bind(input.comment.as_deref().filter(|c| !c.is_empty()))
            .bind(SuggestionStatus::Pending.id())
            .bind(input.base_version)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(token) = &input.upload_token {
            let claimed = FileRepo::claim_staged(
                &mut tx,
                token,
                input.author_id,
                input.contractor_id,
                suggestion.id,
            )
            .await?;
            tracing::debug!(suggestion_id = %suggestion.id, claimed, "Claimed staged uploads");
        }

        let attached = FileRepo::targets_for_suggestion(&mut tx, suggestion.id).await?;
        ensure_added_files_attached(&input.changes, &attached)?;

        tx.commit().await?;
        Ok(suggestion)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Suggestion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM suggestions WHERE id = $1");
        sqlx::query_as::<_, Suggestion>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List suggestions for a contractor, newest first, optionally filtered by
    /// status.
    pub async fn list_for_contractor(
        pool: &PgPool,
        contractor_id: DbId,
        status: Option<SuggestionStatus>,
    ) -> Result<Vec<Suggestion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM suggestions
             WHERE contractor_id = $1 AND ($2::SMALLINT IS NULL OR status_id = $2)
             ORDER BY created_at DESC, id"
        );
        sqlx::query_as::<_, Suggestion>(&query)
            .bind(contractor_id)
            .bind(status.map(SuggestionStatus::id))
            .fetch_all(pool)
            .await
    }

    /// Number of pending suggestions `user_id` may review: those on
    /// contractors they manage, or all of them with the review-any grant.
    pub async fn count_pending_for_reviewer(
        pool: &PgPool,
        user_id: DbId,
        can_review_any: bool,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM suggestions s
             JOIN contractors c ON c.id = s.contractor_id
             WHERE s.status_id = $1 AND ($3 OR c.manager_id = $2)",
        )
        .bind(SuggestionStatus::Pending.id())
        .bind(user_id)
        .bind(can_review_any)
        .fetch_one(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Transaction steps
    // -----------------------------------------------------------------------

    /// Lock a suggestion row in any status.
    pub(crate) async fn lock(conn: &mut PgConnection, id: DbId) -> Result<Suggestion, RepoError> {
        let query = format!("SELECT {COLUMNS} FROM suggestions WHERE id = $1 FOR UPDATE");
        let suggestion = sqlx::query_as::<_, Suggestion>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Suggestion",
                id,
            })?;
        Ok(suggestion)
    }

    /// Move a pending suggestion to a terminal status.
    ///
    /// The `status_id` guard makes a second transition observable as
    /// [`CoreError::AlreadyReviewed`] even without the row lock.
    pub(crate) async fn set_terminal(
        conn: &mut PgConnection,
        id: DbId,
        status: SuggestionStatus,
        reviewer_id: DbId,
        review_comment: Option<&str>,
    ) -> Result<Suggestion, RepoError> {
        if !status.is_terminal() {
            return Err(CoreError::Internal(format!(
                "Cannot move suggestion {id} to {status}"
            ))
            .into());
        }
        let query = format!(
            "UPDATE suggestions
             SET status_id = $2, reviewer_id = $3, reviewed_at = NOW(), review_comment = $4
             WHERE id = $1 AND status_id = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Suggestion>(&query)
            .bind(id)
            .bind(status.id())
            .bind(reviewer_id)
            .bind(review_comment.filter(|c| !c.is_empty()))
            .bind(SuggestionStatus::Pending.id())
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| CoreError::AlreadyReviewed { id }.into())
    }
}
