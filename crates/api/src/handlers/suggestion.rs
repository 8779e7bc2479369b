//! Handlers for the suggestion workflow.
//!
//! Authors propose a next state for a contractor; the server diffs it
//! against the committed record and stores the change-set. Reviewers
//! approve (optionally narrowing what is accepted) or reject it.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fieldcrm_core::acceptance::{AcceptanceOverride, AcceptancePolicy};
use fieldcrm_core::changeset::ServicePointSetChange;
use fieldcrm_core::diff::compute_changes;
use fieldcrm_core::error::CoreError;
use fieldcrm_core::files::validate_upload_token;
use fieldcrm_core::merge::plan_merge;
use fieldcrm_core::permissions::{
    is_reviewer_authorized, CAP_SUGGESTIONS_CREATE, CAP_SUGGESTIONS_REVIEW_ANY,
};
use fieldcrm_core::snapshot::{ContractorProposal, ContractorSnapshot};
use fieldcrm_core::suggestion::{
    ensure_pending, validate_comment, ReviewAction, SuggestionStatus,
};
use fieldcrm_core::types::DbId;
use fieldcrm_db::models::file::StoredFile;
use fieldcrm_db::models::suggestion::{CreateSuggestion, Suggestion};
use fieldcrm_db::repositories::{ContractorRepo, FileRepo, ReviewRequest, SuggestionRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::review::review_suggestion;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSuggestionRequest {
    /// The author's intended next state of the contractor.
    pub proposed: ContractorProposal,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
    /// Token the author's staged uploads were sent with.
    pub upload_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSuggestionRequest {
    /// `"approve"` or `"reject"`.
    pub action: String,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
    pub accepted_fields: Option<Vec<String>>,
    pub service_points_override: Option<ServicePointSetChange>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub accepted_fields: Option<Vec<String>>,
    pub service_points_override: Option<ServicePointSetChange>,
}

#[derive(Debug, Deserialize)]
pub struct ListSuggestionsParams {
    pub status: Option<String>,
}

/// A suggestion together with the pending files it carries.
#[derive(Debug, Serialize)]
pub struct SuggestionDetail {
    #[serde(flatten)]
    pub suggestion: Suggestion,
    pub files: Vec<StoredFile>,
}

/// Merged state a review would produce, without writing it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPreview {
    pub merged: ContractorSnapshot,
    pub committed_file_ids: Vec<DbId>,
    pub removed_file_ids: Vec<DbId>,
}

#[derive(Debug, Serialize)]
pub struct PendingCount {
    pub count: i64,
}

async fn find_suggestion(state: &AppState, id: DbId) -> AppResult<Suggestion> {
    SuggestionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Suggestion",
            id,
        }))
}

// ---------------------------------------------------------------------------
// Authoring
// ---------------------------------------------------------------------------

/// POST /api/v1/contractors/{id}/suggestions
pub async fn create_suggestion(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(contractor_id): Path<DbId>,
    Json(input): Json<CreateSuggestionRequest>,
) -> AppResult<impl IntoResponse> {
    auth.require(CAP_SUGGESTIONS_CREATE)?;
    input.validate()?;
    if let Some(token) = &input.upload_token {
        validate_upload_token(token)?;
    }

    let aggregate = ContractorRepo::load(&state.pool, contractor_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Contractor",
            id: contractor_id,
        })?;
    let changes = compute_changes(&aggregate.snapshot, &input.proposed)?;

    let suggestion = SuggestionRepo::create(
        &state.pool,
        &CreateSuggestion {
            contractor_id,
            author_id: auth.user_id,
            changes,
            comment: input.comment,
            base_version: aggregate.contractor.version,
            upload_token: input.upload_token,
        },
    )
    .await?;

    tracing::info!(
        suggestion_id = %suggestion.id,
        %contractor_id,
        author_id = %auth.user_id,
        "Suggestion created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: suggestion })))
}

/// GET /api/v1/contractors/{id}/suggestions?status=PENDING
pub async fn list_suggestions(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(contractor_id): Path<DbId>,
    Query(params): Query<ListSuggestionsParams>,
) -> AppResult<impl IntoResponse> {
    let status = params
        .status
        .as_deref()
        .map(SuggestionStatus::parse)
        .transpose()?;
    let suggestions = SuggestionRepo::list_for_contractor(&state.pool, contractor_id, status).await?;
    Ok(Json(DataResponse { data: suggestions }))
}

/// GET /api/v1/suggestions/{id}
pub async fn get_suggestion(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let suggestion = find_suggestion(&state, id).await?;
    let files = FileRepo::list_for_suggestion(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: SuggestionDetail { suggestion, files },
    }))
}

/// GET /api/v1/suggestions/pending-count
///
/// Badge counter: pending suggestions the caller may review.
pub async fn pending_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let count = SuggestionRepo::count_pending_for_reviewer(
        &state.pool,
        auth.user_id,
        auth.can(CAP_SUGGESTIONS_REVIEW_ANY),
    )
    .await?;
    Ok(Json(DataResponse {
        data: PendingCount { count },
    }))
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

/// POST /api/v1/suggestions/{id}/review
pub async fn review(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ReviewSuggestionRequest>,
) -> AppResult<impl IntoResponse> {
    let action = ReviewAction::parse(&input.action)?;
    input.validate()?;
    validate_comment(input.comment.as_deref())?;

    let acceptance = AcceptanceOverride {
        accepted_fields: input.accepted_fields,
        service_points_override: input.service_points_override,
    };

    let request = ReviewRequest {
        suggestion_id: id,
        reviewer_id: auth.user_id,
        reviewer_permissions: auth.permissions,
        action,
        comment: input.comment,
        acceptance: Some(acceptance),
        stale_policy: state.config.stale_policy,
    };
    let suggestion = review_suggestion(&state, request).await?;

    Ok(Json(DataResponse { data: suggestion }))
}

/// POST /api/v1/suggestions/{id}/preview
///
/// Compute what approving with the given acceptance would produce. Nothing
/// is written.
pub async fn preview(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<PreviewRequest>,
) -> AppResult<impl IntoResponse> {
    let suggestion = find_suggestion(&state, id).await?;

    let aggregate = ContractorRepo::load(&state.pool, suggestion.contractor_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Contractor",
            id: suggestion.contractor_id,
        })?;
    if !is_reviewer_authorized(
        auth.user_id,
        &auth.permissions,
        aggregate.contractor.manager_id,
    ) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the contractor's manager may review this suggestion".into(),
        )));
    }
    ensure_pending(id, suggestion.status()?)?;

    let changes = suggestion.change_set()?;
    let policy = AcceptancePolicy::from_override(
        &changes,
        Some(AcceptanceOverride {
            accepted_fields: input.accepted_fields,
            service_points_override: input.service_points_override,
        }),
    )?;
    let plan = plan_merge(&changes, &policy, &aggregate.snapshot)?;

    let mut merged = aggregate.snapshot;
    plan.apply_to_snapshot(&mut merged)?;

    Ok(Json(DataResponse {
        data: ReviewPreview {
            merged,
            committed_file_ids: plan.committed_file_ids(),
            removed_file_ids: plan.removed_file_ids(),
        },
    }))
}
