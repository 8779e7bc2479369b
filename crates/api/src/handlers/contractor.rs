//! Handlers for the committed contractor aggregate.
//!
//! Reads return the committed snapshot only; pending and staged files never
//! appear. Direct edits and service point creation bypass the suggestion
//! workflow and need their own capabilities.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fieldcrm_core::error::CoreError;
use fieldcrm_core::permissions::{CAP_CONTRACTORS_EDIT, CAP_SERVICE_POINTS_CREATE};
use fieldcrm_core::snapshot::{ContractorProposal, ContractorSnapshot};
use fieldcrm_core::types::DbId;
use fieldcrm_db::models::service_point::CreateServicePoint;
use fieldcrm_db::repositories::{ContractorRepo, MergeRepo, ServicePointRepo};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::review::remove_orphaned_blobs;
use crate::state::AppState;

/// Committed snapshot plus the aggregate version it was read at.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorView {
    pub version: i64,
    #[serde(flatten)]
    pub snapshot: ContractorSnapshot,
}

async fn load_view(pool: &PgPool, id: DbId) -> AppResult<ContractorView> {
    let aggregate = ContractorRepo::load(pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Contractor",
            id,
        })?;
    Ok(ContractorView {
        version: aggregate.contractor.version,
        snapshot: aggregate.snapshot,
    })
}

/// GET /api/v1/contractors/{id}
pub async fn get_contractor(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let view = load_view(&state.pool, id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// PUT /api/v1/contractors/{id}
///
/// Apply a proposed state directly. The body has the same shape as the
/// `proposed` field of a suggestion.
pub async fn update_contractor(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(proposal): Json<ContractorProposal>,
) -> AppResult<impl IntoResponse> {
    auth.require(CAP_CONTRACTORS_EDIT)?;

    let outcome = MergeRepo::apply_direct_edit(&state.pool, id, &proposal).await?;
    remove_orphaned_blobs(&state.pool, state.storage.as_ref(), &outcome.orphaned_paths).await;

    tracing::info!(contractor_id = %id, user_id = %auth.user_id, "Contractor updated");

    let view = load_view(&state.pool, id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// POST /api/v1/contractors/{id}/service-points
///
/// New service points are only created here; suggestions can edit or
/// delete existing points but never add one.
pub async fn create_service_point(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<CreateServicePoint>,
) -> AppResult<impl IntoResponse> {
    auth.require(CAP_SERVICE_POINTS_CREATE)?;

    let point = ServicePointRepo::create(&state.pool, id, &input).await?;

    tracing::info!(
        contractor_id = %id,
        service_point_id = %point.id,
        user_id = %auth.user_id,
        "Service point created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: point })))
}
