//! Transactional review and merge.
//!
//! A review runs in one transaction: lock the suggestion, lock and load the
//! contractor, authorize the reviewer against the contractor's current
//! manager, require the suggestion to still be pending, plan the merge,
//! apply it, drop the files that stayed pending and flip the status. Blob deletion is not done here; the storage paths of
//! every deleted file row are returned so the caller can remove the blobs
//! after commit.

use fieldcrm_core::acceptance::{AcceptanceOverride, AcceptancePolicy};
use fieldcrm_core::diff::compute_changes;
use fieldcrm_core::error::CoreError;
use fieldcrm_core::merge::{plan_merge, MergePlan};
use fieldcrm_core::permissions::is_reviewer_authorized;
use fieldcrm_core::snapshot::ContractorProposal;
use fieldcrm_core::suggestion::{ensure_pending, ReviewAction, StalePolicy};
use fieldcrm_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::error::RepoError;
use crate::models::contractor::ContractorAggregate;
use crate::models::suggestion::Suggestion;
use crate::repositories::{ContractorRepo, FileRepo, ServicePointRepo, SuggestionRepo};

/// Everything a review decision needs.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub suggestion_id: DbId,
    pub reviewer_id: DbId,
    pub reviewer_permissions: Vec<String>,
    pub action: ReviewAction,
    pub comment: Option<String>,
    pub acceptance: Option<AcceptanceOverride>,
    pub stale_policy: StalePolicy,
}

/// Result of a committed review.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub suggestion: Suggestion,
    /// Storage paths of file rows deleted by the review.
    pub orphaned_paths: Vec<String>,
}

/// Result of a committed direct edit.
#[derive(Debug, Clone)]
pub struct DirectEditOutcome {
    pub plan: MergePlan,
    pub orphaned_paths: Vec<String>,
}

pub struct MergeRepo;

impl MergeRepo {
    /// Approve or reject a pending suggestion.
    ///
    /// # Errors
    ///
    /// `NotFound`, `AlreadyReviewed`, `Forbidden`, `Conflict` (stale baseline
    /// under [`StalePolicy::Refuse`]) and `Validation` (malformed stored
    /// change-set, bad acceptance override, fronts invariant) as
    /// [`RepoError::Core`]. Nothing is written when an error is returned.
    pub async fn review(
        pool: &PgPool,
        request: ReviewRequest,
    ) -> Result<ReviewOutcome, RepoError> {
        let mut tx = pool.begin().await?;

        let suggestion = SuggestionRepo::lock(&mut tx, request.suggestion_id).await?;
        let aggregate = ContractorRepo::load_with(&mut tx, suggestion.contractor_id, true)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Contractor",
                id: suggestion.contractor_id,
            })?;

        if !is_reviewer_authorized(
            request.reviewer_id,
            &request.reviewer_permissions,
            aggregate.contractor.manager_id,
        ) {
            return Err(CoreError::Forbidden(format!(
                "User {} may not review suggestions for contractor {}",
                request.reviewer_id, aggregate.contractor.id
            ))
            .into());
        }
        ensure_pending(suggestion.id, suggestion.status()?)?;

        let mut orphaned_paths = Vec::new();

        if request.action == ReviewAction::Approve {
            request.stale_policy.check_baseline(
                suggestion.id,
                suggestion.base_version,
                aggregate.contractor.version,
            )?;
            let changes = suggestion.change_set()?;
            let policy = AcceptancePolicy::from_override(&changes, request.acceptance)?;
            let plan = plan_merge(&changes, &policy, &aggregate.snapshot)?;
            orphaned_paths
                .extend(Self::apply_plan(&mut tx, &aggregate, Some(suggestion.id), &plan).await?);
        }

        // Whatever is still linked was not accepted (or the suggestion was
        // rejected): the rows go now, the blobs after commit.
        orphaned_paths.extend(FileRepo::delete_for_suggestion(&mut tx, suggestion.id).await?);

        let suggestion = SuggestionRepo::set_terminal(
            &mut tx,
            suggestion.id,
            request.action.terminal_status(),
            request.reviewer_id,
            request.comment.as_deref(),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            suggestion_id = %suggestion.id,
            contractor_id = %suggestion.contractor_id,
            reviewer_id = %request.reviewer_id,
            action = ?request.action,
            orphaned_files = orphaned_paths.len(),
            "Suggestion reviewed",
        );

        Ok(ReviewOutcome {
            suggestion,
            orphaned_paths,
        })
    }

    /// Apply a proposal directly, without a suggestion.
    ///
    /// Only committed files can be detached this way; new files reach a
    /// contractor directly by uploading them without an upload token.
    pub async fn apply_direct_edit(
        pool: &PgPool,
        contractor_id: DbId,
        proposal: &ContractorProposal,
    ) -> Result<DirectEditOutcome, RepoError> {
        let mut tx = pool.begin().await?;

        let aggregate = ContractorRepo::load_with(&mut tx, contractor_id, true)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Contractor",
                id: contractor_id,
            })?;
        let changes = compute_changes(&aggregate.snapshot, proposal)?;
        let plan = plan_merge(&changes, &AcceptancePolicy::AcceptAll, &aggregate.snapshot)?;
        let orphaned_paths = Self::apply_plan(&mut tx, &aggregate, None, &plan).await?;

        tx.commit().await?;

        tracing::info!(%contractor_id, keys = changes.len(), "Contractor edited directly");
        Ok(DirectEditOutcome {
            plan,
            orphaned_paths,
        })
    }

    /// Execute a merge plan inside the caller's transaction.
    ///
    /// `suggestion_id` names the suggestion whose pending files are committed
    /// by accepted file entries; `None` for direct edits. Returns the storage
    /// paths of deleted file rows.
    pub(crate) async fn apply_plan(
        conn: &mut PgConnection,
        aggregate: &ContractorAggregate,
        suggestion_id: Option<DbId>,
        plan: &MergePlan,
    ) -> Result<Vec<String>, RepoError> {
        let contractor_id = aggregate.contractor.id;
        let mut paths = Vec::new();
        if plan.is_empty() {
            return Ok(paths);
        }

        // ── Service point deletions ──
        if !plan.service_point_deletes.is_empty() {
            paths.extend(
                FileRepo::paths_for_service_points(conn, &plan.service_point_deletes).await?,
            );
            ServicePointRepo::delete_many(conn, contractor_id, &plan.service_point_deletes)
                .await?;
        }

        // ── Service point updates ──
        for write in &plan.service_point_writes {
            ServicePointRepo::write_fields(conn, write.id, &write.fields).await?;
            if let Some(addon_ids) = &write.addon_ids {
                ServicePointRepo::replace_addons(conn, write.id, addon_ids).await?;
            }
            if let Some(suggestion_id) = suggestion_id {
                FileRepo::commit_for_service_point(
                    conn,
                    suggestion_id,
                    write.id,
                    &write.files.added,
                )
                .await?;
            }
            paths.extend(
                FileRepo::delete_committed(conn, contractor_id, &write.files.removed).await?,
            );
        }

        // ── Contractor ──
        ContractorRepo::write_fields(conn, contractor_id, &plan.contractor_fields).await?;
        if let Some(files) = &plan.contractor_files {
            if let Some(suggestion_id) = suggestion_id {
                FileRepo::commit_contractor_level(conn, suggestion_id).await?;
            }
            paths.extend(FileRepo::delete_committed(conn, contractor_id, &files.removed).await?);
        }

        ContractorRepo::bump_version(conn, contractor_id).await?;
        Ok(paths)
    }
}
