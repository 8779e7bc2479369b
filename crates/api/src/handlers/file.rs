//! File upload.
//!
//! An upload either belongs to a suggestion still being written (it carries
//! the author's `uploadToken` and stays staged until the suggestion is
//! submitted) or is a direct edit by someone allowed to change the
//! contractor, in which case it is committed at once.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use fieldcrm_core::error::CoreError;
use fieldcrm_core::files::{validate_upload_token, FileLink, FileType};
use fieldcrm_core::permissions::{CAP_CONTRACTORS_EDIT, CAP_SUGGESTIONS_CREATE};
use fieldcrm_core::storage::storage_key;
use fieldcrm_core::types::DbId;
use fieldcrm_db::models::file::{CreateFile, StoredFile};
use fieldcrm_db::repositories::{ContractorRepo, FileRepo, ServicePointRepo};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

struct UploadedPart {
    filename: String,
    mime_type: String,
    bytes: Vec<u8>,
}

/// POST /api/v1/contractors/{id}/files
///
/// Multipart fields: `file` (required), `servicePointId` and `uploadToken`
/// (both optional).
pub async fn upload_file(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(contractor_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<StoredFile>>)> {
    let mut part: Option<UploadedPart> = None;
    let mut service_point_id: Option<DbId> = None;
    let mut upload_token: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").trim().to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_MIME_TYPE)
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                part = Some(UploadedPart {
                    filename,
                    mime_type,
                    bytes: data.to_vec(),
                });
            }
            "servicePointId" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                let id = text.trim().parse::<DbId>().map_err(|_| {
                    AppError::BadRequest(format!("Invalid servicePointId '{text}'"))
                })?;
                service_point_id = Some(id);
            }
            "uploadToken" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                upload_token = Some(text.trim().to_string());
            }
            _ => {}
        }
    }

    let part = part.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;
    if part.filename.is_empty() {
        return Err(AppError::BadRequest("Uploaded file has no filename".into()));
    }

    let link = match upload_token {
        Some(token) => {
            auth.require(CAP_SUGGESTIONS_CREATE)?;
            validate_upload_token(&token)?;
            FileLink::Staged {
                upload_token: token,
            }
        }
        None => {
            auth.require(CAP_CONTRACTORS_EDIT)?;
            FileLink::Committed
        }
    };

    ContractorRepo::find_by_id(&state.pool, contractor_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Contractor",
            id: contractor_id,
        })?;
    if let Some(sp_id) = service_point_id {
        let point = ServicePointRepo::find_by_id(&state.pool, sp_id).await?;
        if point.map(|p| p.contractor_id) != Some(contractor_id) {
            return Err(CoreError::NotFound {
                entity: "ServicePoint",
                id: sp_id,
            }
            .into());
        }
    }

    let size_bytes = i64::try_from(part.bytes.len())
        .map_err(|_| AppError::BadRequest("Uploaded file is too large".into()))?;
    let id = Uuid::new_v4();
    let key = storage_key(contractor_id, id, &part.filename);

    state.storage.store(&key, &part.bytes).await?;

    let input = CreateFile {
        id,
        contractor_id,
        service_point_id,
        filename: part.filename,
        storage_path: key.clone(),
        file_type: FileType::classify(&part.mime_type),
        mime_type: part.mime_type,
        size_bytes,
        link,
        uploaded_by: Some(auth.user_id),
    };
    let file = match FileRepo::create(&state.pool, &input).await {
        Ok(file) => file,
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(&key).await {
                tracing::warn!(storage_path = %key, error = %cleanup, "Could not remove blob of failed upload");
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        file_id = %file.id,
        %contractor_id,
        user_id = %auth.user_id,
        size_bytes = file.size_bytes,
        pending = file.is_pending,
        "File uploaded",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: file })))
}
