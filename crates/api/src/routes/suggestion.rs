//! Route definitions for the suggestion review workflow.
//!
//! Mounted at `/suggestions`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::suggestion;
use crate::state::AppState;

/// Routes mounted at `/suggestions`.
///
/// ```text
/// GET    /pending-count           pending_count
/// GET    /{id}                    get_suggestion
/// POST   /{id}/review             review
/// POST   /{id}/preview            preview
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pending-count", get(suggestion::pending_count))
        .route("/{id}", get(suggestion::get_suggestion))
        .route("/{id}/review", post(suggestion::review))
        .route("/{id}/preview", post(suggestion::preview))
}
