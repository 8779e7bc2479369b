pub mod contractor;
pub mod health;
pub mod suggestion;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /contractors/{id}                                get, update (direct edit)
/// /contractors/{id}/service-points                 create
/// /contractors/{id}/suggestions                    list, create
/// /contractors/{id}/files                          upload (multipart)
///
/// /suggestions/pending-count                       reviewer badge counter
/// /suggestions/{id}                                get with pending files
/// /suggestions/{id}/review                         approve / reject (POST)
/// /suggestions/{id}/preview                        merge preview (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Contractor card, direct edits and uploads.
        .nest("/contractors", contractor::router())
        // Suggestion review workflow.
        .nest("/suggestions", suggestion::router())
}
