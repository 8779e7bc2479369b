#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use fieldcrm_core::storage::{BlobStorage, LocalBlobStorage};
use fieldcrm_core::suggestion::StalePolicy;
use fieldcrm_core::types::DbId;
use fieldcrm_db::models::contractor::{Contractor, CreateContractor};
use fieldcrm_db::models::service_point::{CreateServicePoint, ServicePoint};
use fieldcrm_db::models::user::{CreateUser, User};
use fieldcrm_db::repositories::{ContractorRepo, ServicePointRepo, UserRepo};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use fieldcrm_api::auth::jwt::{generate_access_token, JwtConfig};
use fieldcrm_api::config::{CleanupConfig, ServerConfig};
use fieldcrm_api::router::build_app_router;
use fieldcrm_api::state::AppState;

pub const MULTIPART_BOUNDARY: &str = "fieldcrm-test-boundary";

/// Build a test `ServerConfig` with safe defaults and blobs under
/// `storage_root`.
pub fn test_config(storage_root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        max_upload_bytes: 1024 * 1024,
        storage_root: storage_root.to_path_buf(),
        stale_policy: StalePolicy::LastWriterWins,
        cleanup: CleanupConfig::default(),
        jwt: JwtConfig {
            secret: "test-secret-for-integration-tests".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

pub fn test_state(pool: PgPool, config: ServerConfig, storage: Arc<dyn BlobStorage>) -> AppState {
    AppState {
        pool,
        config: Arc::new(config),
        storage,
    }
}

/// Full application router over a local blob store rooted at
/// `storage_root`.
pub fn build_test_app(pool: PgPool, storage_root: &Path) -> Router {
    build_test_app_with(pool, test_config(storage_root))
}

pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> Router {
    let storage = Arc::new(LocalBlobStorage::new(config.storage_root.clone()));
    let state = test_state(pool, config.clone(), storage);
    build_app_router(state, &config)
}

/// Signed access token for `user_id` with the given grants.
pub fn token(user_id: DbId, permissions: &[&str]) -> String {
    let config = test_config(Path::new("unused"));
    let grants: Vec<String> = permissions.iter().map(|p| p.to_string()).collect();
    generate_access_token(user_id, &grants, &config.jwt).unwrap()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

/// One part of a multipart body: `(name, filename, content)`.
pub type Part<'a> = (&'a str, Option<&'a str>, &'a [u8]);

pub async fn post_multipart(app: Router, uri: &str, token: &str, parts: &[Part<'_>]) -> Response<Body> {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: image/jpeg\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn user(pool: &PgPool, name: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            email: format!("{name}@example.com"),
            display_name: name.to_string(),
        },
    )
    .await
    .unwrap()
}

pub async fn contractor(pool: &PgPool, manager_id: Option<DbId>) -> Contractor {
    ContractorRepo::create(
        pool,
        &CreateContractor {
            name: "Acme".to_string(),
            manager_id,
            notes: Some("old".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
}

pub async fn service_point(pool: &PgPool, contractor_id: DbId, name: &str) -> ServicePoint {
    ServicePointRepo::create(
        pool,
        contractor_id,
        &CreateServicePoint {
            name: name.to_string(),
            fronts_count: Some(10),
            fronts_on_service: Some(8),
            notes: Some("old".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
}
