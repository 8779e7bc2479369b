//! Shared fixtures for the repository integration tests.

#![allow(dead_code)]

use fieldcrm_core::acceptance::AcceptanceOverride;
use fieldcrm_core::diff::compute_changes;
use fieldcrm_core::files::{FileLink, FileType};
use fieldcrm_core::snapshot::{ContractorProposal, ContractorSnapshot};
use fieldcrm_core::suggestion::{ReviewAction, StalePolicy};
use fieldcrm_core::types::DbId;
use fieldcrm_db::models::contractor::{Contractor, CreateContractor};
use fieldcrm_db::models::file::{CreateFile, StoredFile};
use fieldcrm_db::models::service_point::{CreateServicePoint, ServicePoint};
use fieldcrm_db::models::suggestion::{CreateSuggestion, Suggestion};
use fieldcrm_db::models::user::{CreateUser, User};
use fieldcrm_db::RepoError;
use fieldcrm_db::repositories::{
    ContractorRepo, FileRepo, ReviewRequest, ServicePointRepo, SuggestionRepo, UserRepo,
};
use sqlx::PgPool;
use uuid::Uuid;

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

/// Contractor "Acme" with `notes = "old"`.
pub async fn contractor(pool: &PgPool, manager_id: Option<DbId>) -> Contractor {
    ContractorRepo::create(
        pool,
        &CreateContractor {
            name: "Acme".to_string(),
            inn: Some("7701234567".to_string()),
            manager_id,
            notes: Some("old".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
}

/// Service point with `frontsCount = 10`, `frontsOnService = 8`,
/// `notes = "old"`.
pub async fn service_point(pool: &PgPool, contractor_id: DbId, name: &str) -> ServicePoint {
    ServicePointRepo::create(
        pool,
        contractor_id,
        &CreateServicePoint {
            name: name.to_string(),
            address: Some("1 Main St".to_string()),
            fronts_count: Some(10),
            fronts_on_service: Some(8),
            notes: Some("old".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
}

pub async fn snapshot(pool: &PgPool, contractor_id: DbId) -> ContractorSnapshot {
    ContractorRepo::load(pool, contractor_id)
        .await
        .unwrap()
        .expect("contractor exists")
        .snapshot
}

pub async fn version(pool: &PgPool, contractor_id: DbId) -> i64 {
    ContractorRepo::find_by_id(pool, contractor_id)
        .await
        .unwrap()
        .expect("contractor exists")
        .version
}

/// Record a file row in the given link state. No blob is written.
pub async fn file(
    pool: &PgPool,
    contractor_id: DbId,
    service_point_id: Option<DbId>,
    link: FileLink,
    uploaded_by: DbId,
) -> StoredFile {
    let id = Uuid::new_v4();
    FileRepo::create(
        pool,
        &CreateFile {
            id,
            contractor_id,
            service_point_id,
            filename: "photo.jpg".to_string(),
            storage_path: format!("contractors/{contractor_id}/{id}-photo.jpg"),
            file_type: FileType::Image,
            mime_type: "image/jpeg".to_string(),
            size_bytes: 1024,
            link,
            uploaded_by: Some(uploaded_by),
        },
    )
    .await
    .unwrap()
}

pub fn staged(token: &str) -> FileLink {
    FileLink::Staged {
        upload_token: token.to_string(),
    }
}

/// Diff the committed state against an edited copy and store the result as
/// a pending suggestion.
pub async fn propose(
    pool: &PgPool,
    author_id: DbId,
    contractor_id: DbId,
    upload_token: Option<&str>,
    edit: impl FnOnce(&mut ContractorProposal),
) -> Suggestion {
    try_propose(pool, author_id, contractor_id, upload_token, edit)
        .await
        .unwrap()
}

pub async fn try_propose(
    pool: &PgPool,
    author_id: DbId,
    contractor_id: DbId,
    upload_token: Option<&str>,
    edit: impl FnOnce(&mut ContractorProposal),
) -> Result<Suggestion, RepoError> {
    let committed = snapshot(pool, contractor_id).await;
    let mut proposal = ContractorProposal::from(committed.clone());
    edit(&mut proposal);
    let changes = compute_changes(&committed, &proposal).unwrap();

    SuggestionRepo::create(
        pool,
        &CreateSuggestion {
            contractor_id,
            author_id,
            changes,
            comment: Some("please update".to_string()),
            base_version: version(pool, contractor_id).await,
            upload_token: upload_token.map(str::to_string),
        },
    )
    .await
}

pub fn review(suggestion_id: DbId, reviewer_id: DbId, action: ReviewAction) -> ReviewRequest {
    ReviewRequest {
        suggestion_id,
        reviewer_id,
        reviewer_permissions: Vec::new(),
        action,
        comment: None,
        acceptance: None,
        stale_policy: StalePolicy::LastWriterWins,
    }
}

pub fn approve_with(
    suggestion_id: DbId,
    reviewer_id: DbId,
    acceptance: AcceptanceOverride,
) -> ReviewRequest {
    ReviewRequest {
        acceptance: Some(acceptance),
        ..review(suggestion_id, reviewer_id, ReviewAction::Approve)
    }
}
