//! Route definitions for contractors and their sub-resources.
//!
//! Mounted at `/contractors`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{contractor, file, suggestion};
use crate::state::AppState;

/// Routes mounted at `/contractors`.
///
/// ```text
/// GET    /{id}                    get_contractor
/// PUT    /{id}                    update_contractor
/// POST   /{id}/service-points     create_service_point
/// GET    /{id}/suggestions        list_suggestions
/// POST   /{id}/suggestions        create_suggestion
/// POST   /{id}/files              upload_file (multipart)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(contractor::get_contractor).put(contractor::update_contractor),
        )
        .route(
            "/{id}/service-points",
            post(contractor::create_service_point),
        )
        .route(
            "/{id}/suggestions",
            get(suggestion::list_suggestions).post(suggestion::create_suggestion),
        )
        .route("/{id}/files", post(file::upload_file))
}
