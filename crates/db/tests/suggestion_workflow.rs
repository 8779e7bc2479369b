//! Integration tests for the suggestion lifecycle.
//!
//! Exercises creation, review authorization, full and partial merges,
//! the stale-baseline policy and terminal idempotence against a real
//! database:
//! - Full accept reproduces the proposed state
//! - Accepted subsets leave everything else untouched
//! - Only the current manager (or a review-any grant) may review
//! - A terminal suggestion cannot be reviewed again

mod common;

use assert_matches::assert_matches;
use fieldcrm_core::acceptance::AcceptanceOverride;
use fieldcrm_core::changeset::{ChangeSet, ServicePointSetChange};
use fieldcrm_core::diff::compute_changes;
use fieldcrm_core::error::CoreError;
use fieldcrm_core::fields::ServicePointField;
use fieldcrm_core::permissions::CAP_SUGGESTIONS_REVIEW_ANY;
use fieldcrm_core::snapshot::ContractorProposal;
use fieldcrm_core::suggestion::{ReviewAction, StalePolicy, SuggestionStatus};
use fieldcrm_db::models::addon::CreateAddon;
use fieldcrm_db::models::suggestion::CreateSuggestion;
use fieldcrm_db::repositories::{
    AddonRepo, ContractorRepo, MergeRepo, ServicePointRepo, SuggestionRepo,
};
use fieldcrm_db::RepoError;
use sqlx::PgPool;
use uuid::Uuid;

use common::{approve_with, review};

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_create_stores_pending_suggestion(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, Some(manager.id)).await;

    let suggestion = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.notes = Some("new".to_string());
    })
    .await;

    assert_eq!(suggestion.status().unwrap(), SuggestionStatus::Pending);
    assert_eq!(suggestion.author_id, author.id);
    assert_eq!(suggestion.base_version, contractor.version);
    assert!(suggestion.reviewed_at.is_none());
    assert_eq!(suggestion.changes["notes"]["old"], "old");
    assert_eq!(suggestion.changes["notes"]["new"], "new");

    // Creating a suggestion does not touch the contractor.
    let after = common::snapshot(&pool, contractor.id).await;
    assert_eq!(after.notes.as_deref(), Some("old"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_rejects_empty_change_set(pool: PgPool) {
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, None).await;

    let committed = common::snapshot(&pool, contractor.id).await;
    let unchanged = ContractorProposal::from(committed.clone());
    assert_matches!(
        compute_changes(&committed, &unchanged),
        Err(CoreError::NoChanges)
    );

    let result = SuggestionRepo::create(
        &pool,
        &CreateSuggestion {
            contractor_id: contractor.id,
            author_id: author.id,
            changes: ChangeSet::default(),
            comment: None,
            base_version: contractor.version,
            upload_token: None,
        },
    )
    .await;
    assert_matches!(result, Err(RepoError::Core(CoreError::NoChanges)));

    let listed = SuggestionRepo::list_for_contractor(&pool, contractor.id, None)
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_list_filters_by_status(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, Some(manager.id)).await;

    let first = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.notes = Some("first".to_string());
    })
    .await;
    let second = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.description = Some("second".to_string());
    })
    .await;

    MergeRepo::review(&pool, review(first.id, manager.id, ReviewAction::Reject))
        .await
        .unwrap();

    let all = SuggestionRepo::list_for_contractor(&pool, contractor.id, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let pending =
        SuggestionRepo::list_for_contractor(&pool, contractor.id, Some(SuggestionStatus::Pending))
            .await
            .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);

    let rejected =
        SuggestionRepo::list_for_contractor(&pool, contractor.id, Some(SuggestionStatus::Rejected))
            .await
            .unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].id, first.id);
}

// ---------------------------------------------------------------------------
// Full merge
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_full_accept_reproduces_proposal(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, Some(manager.id)).await;
    let kept = common::service_point(&pool, contractor.id, "P1").await;
    let dropped = common::service_point(&pool, contractor.id, "P2").await;
    let red = AddonRepo::create(
        &pool,
        &CreateAddon {
            name: "Red".to_string(),
            color: Some("#f00".to_string()),
        },
    )
    .await
    .unwrap();
    let blue = AddonRepo::create(
        &pool,
        &CreateAddon {
            name: "Blue".to_string(),
            color: None,
        },
    )
    .await
    .unwrap();

    let committed = common::snapshot(&pool, contractor.id).await;
    let mut proposal = ContractorProposal::from(committed.clone());
    proposal.contractor.name = "Acme Holding".to_string();
    proposal.contractor.is_chain = true;
    proposal.contractor.notes = None;
    proposal.contractor.service_points.retain(|p| p.id != dropped.id);
    {
        let point = proposal.contractor.service_point_mut(kept.id).unwrap();
        point.fronts_count = 12;
        point.fronts_on_service = 12;
        point.address = Some("2 Side St".to_string());
        let mut addons = vec![red.id, blue.id];
        addons.sort();
        point.addon_ids = addons;
    }
    let changes = compute_changes(&committed, &proposal).unwrap();

    let suggestion = SuggestionRepo::create(
        &pool,
        &CreateSuggestion {
            contractor_id: contractor.id,
            author_id: author.id,
            changes,
            comment: None,
            base_version: contractor.version,
            upload_token: None,
        },
    )
    .await
    .unwrap();

    let outcome = MergeRepo::review(&pool, review(suggestion.id, manager.id, ReviewAction::Approve))
        .await
        .unwrap();
    assert_eq!(outcome.suggestion.status().unwrap(), SuggestionStatus::Approved);
    assert_eq!(outcome.suggestion.reviewer_id, Some(manager.id));
    assert!(outcome.suggestion.reviewed_at.is_some());
    assert!(outcome.orphaned_paths.is_empty());

    let merged = common::snapshot(&pool, contractor.id).await;
    assert_eq!(merged, proposal.contractor);
    assert!(ServicePointRepo::find_by_id(&pool, dropped.id)
        .await
        .unwrap()
        .is_none());
    assert!(common::version(&pool, contractor.id).await > contractor.version);
}

// ---------------------------------------------------------------------------
// Partial merge
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_accepted_fields_leave_others_untouched(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, Some(manager.id)).await;

    let suggestion = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.notes = Some("new".to_string());
        p.contractor.name = "Renamed".to_string();
    })
    .await;

    let selection = AcceptanceOverride {
        accepted_fields: Some(vec!["notes".to_string()]),
        service_points_override: None,
    };
    MergeRepo::review(&pool, approve_with(suggestion.id, manager.id, selection))
        .await
        .unwrap();

    let merged = common::snapshot(&pool, contractor.id).await;
    assert_eq!(merged.notes.as_deref(), Some("new"));
    assert_eq!(merged.name, "Acme");
}

/// frontsCount=10, frontsOnService=8, notes="old"; the suggestion moves
/// frontsOnService to 10 and notes to "new"; only frontsOnService is
/// accepted.
#[sqlx::test(migrations = "./migrations")]
async fn test_accept_single_service_point_field(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, Some(manager.id)).await;
    let point = common::service_point(&pool, contractor.id, "P1").await;

    let suggestion = common::propose(&pool, author.id, contractor.id, None, |p| {
        let sp = p.contractor.service_point_mut(point.id).unwrap();
        sp.fronts_on_service = 10;
        sp.notes = Some("new".to_string());
    })
    .await;

    let mut points = suggestion
        .change_set()
        .unwrap()
        .service_points
        .expect("service point entry");
    assert_eq!(points.updates.len(), 1);
    points.updates[0]
        .diff
        .fields
        .retain(|field, _| *field == ServicePointField::FrontsOnService);

    let selection = AcceptanceOverride {
        accepted_fields: None,
        service_points_override: Some(points),
    };
    MergeRepo::review(&pool, approve_with(suggestion.id, manager.id, selection))
        .await
        .unwrap();

    let merged = ServicePointRepo::find_by_id(&pool, point.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(merged.fronts_count, 10);
    assert_eq!(merged.fronts_on_service, 10);
    assert_eq!(merged.notes.as_deref(), Some("old"));
}

/// P1 is proposed for deletion next to an edit of P2; the override keeps
/// P2's edit and drops P1's deletion.
#[sqlx::test(migrations = "./migrations")]
async fn test_override_skips_deletion_keeps_edit(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, Some(manager.id)).await;
    let p1 = common::service_point(&pool, contractor.id, "P1").await;
    let p2 = common::service_point(&pool, contractor.id, "P2").await;

    let suggestion = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.service_points.retain(|sp| sp.id != p1.id);
        p.contractor.service_point_mut(p2.id).unwrap().name = "P2 renamed".to_string();
    })
    .await;

    let proposed = suggestion.change_set().unwrap().service_points.unwrap();
    assert_eq!(proposed.deletes, vec![p1.id]);

    let selection = AcceptanceOverride {
        accepted_fields: None,
        service_points_override: Some(ServicePointSetChange {
            updates: proposed.updates.clone(),
            deletes: Vec::new(),
        }),
    };
    MergeRepo::review(&pool, approve_with(suggestion.id, manager.id, selection))
        .await
        .unwrap();

    let still_there = ServicePointRepo::find_by_id(&pool, p1.id)
        .await
        .unwrap()
        .expect("P1 must survive");
    assert_eq!(still_there.name, "P1");
    let edited = ServicePointRepo::find_by_id(&pool, p2.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(edited.name, "P2 renamed");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_override_outside_suggestion_is_rejected(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, Some(manager.id)).await;
    let p1 = common::service_point(&pool, contractor.id, "P1").await;

    let suggestion = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.notes = Some("new".to_string());
    })
    .await;

    // The suggestion never proposed deleting P1.
    let selection = AcceptanceOverride {
        accepted_fields: None,
        service_points_override: Some(ServicePointSetChange {
            updates: Vec::new(),
            deletes: vec![p1.id],
        }),
    };
    let result = MergeRepo::review(&pool, approve_with(suggestion.id, manager.id, selection)).await;
    assert_matches!(result, Err(RepoError::Core(CoreError::Validation(_))));

    assert!(ServicePointRepo::find_by_id(&pool, p1.id)
        .await
        .unwrap()
        .is_some());
    let stored = SuggestionRepo::find_by_id(&pool, suggestion.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status().unwrap(), SuggestionStatus::Pending);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_fronts_violation_rejects_merge(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, Some(manager.id)).await;
    let point = common::service_point(&pool, contractor.id, "P1").await;

    let suggestion = common::propose(&pool, author.id, contractor.id, None, |p| {
        let sp = p.contractor.service_point_mut(point.id).unwrap();
        sp.fronts_count = 6;
        sp.notes = Some("new".to_string());
    })
    .await;

    let result = MergeRepo::review(
        &pool,
        review(suggestion.id, manager.id, ReviewAction::Approve),
    )
    .await;
    assert_matches!(result, Err(RepoError::Core(CoreError::Validation(msg))) if msg.contains("frontsOnService"));

    let unchanged = ServicePointRepo::find_by_id(&pool, point.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.fronts_count, 10);
    assert_eq!(unchanged.notes.as_deref(), Some("old"));
    let stored = SuggestionRepo::find_by_id(&pool, suggestion.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status().unwrap(), SuggestionStatus::Pending);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_of_vanished_service_point_fails(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, Some(manager.id)).await;
    let point = common::service_point(&pool, contractor.id, "P1").await;

    let suggestion = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.service_point_mut(point.id).unwrap().notes = Some("new".to_string());
    })
    .await;

    // The point is removed directly before the review.
    let committed = common::snapshot(&pool, contractor.id).await;
    let mut proposal = ContractorProposal::from(committed);
    proposal.deleted_service_point_ids.push(point.id);
    MergeRepo::apply_direct_edit(&pool, contractor.id, &proposal)
        .await
        .unwrap();

    let result = MergeRepo::review(
        &pool,
        review(suggestion.id, manager.id, ReviewAction::Approve),
    )
    .await;
    assert_matches!(
        result,
        Err(RepoError::Core(CoreError::NotFound { entity: "ServicePoint", id })) if id == point.id
    );
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_non_manager_cannot_review(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, Some(manager.id)).await;

    let suggestion = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.notes = Some("new".to_string());
    })
    .await;

    // Authorship grants nothing.
    let result = MergeRepo::review(
        &pool,
        review(suggestion.id, author.id, ReviewAction::Approve),
    )
    .await;
    assert_matches!(result, Err(RepoError::Core(CoreError::Forbidden(_))));

    let unchanged = common::snapshot(&pool, contractor.id).await;
    assert_eq!(unchanged.notes.as_deref(), Some("old"));

    let mut request = review(suggestion.id, author.id, ReviewAction::Approve);
    request.reviewer_permissions = vec![CAP_SUGGESTIONS_REVIEW_ANY.to_string()];
    MergeRepo::review(&pool, request).await.unwrap();

    let merged = common::snapshot(&pool, contractor.id).await;
    assert_eq!(merged.notes.as_deref(), Some("new"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_stranger_on_terminal_suggestion_is_forbidden(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let author = common::user(&pool, "author").await;
    let stranger = common::user(&pool, "stranger").await;
    let contractor = common::contractor(&pool, Some(manager.id)).await;

    let suggestion = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.notes = Some("new".to_string());
    })
    .await;
    MergeRepo::review(&pool, review(suggestion.id, manager.id, ReviewAction::Reject))
        .await
        .unwrap();

    let result = MergeRepo::review(
        &pool,
        review(suggestion.id, stranger.id, ReviewAction::Approve),
    )
    .await;
    assert_matches!(result, Err(RepoError::Core(CoreError::Forbidden(_))));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_authorization_follows_current_manager(pool: PgPool) {
    let original = common::user(&pool, "original").await;
    let successor = common::user(&pool, "successor").await;
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, Some(original.id)).await;

    let suggestion = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.notes = Some("new".to_string());
    })
    .await;

    assert!(ContractorRepo::set_manager(&pool, contractor.id, Some(successor.id))
        .await
        .unwrap());

    let result = MergeRepo::review(
        &pool,
        review(suggestion.id, original.id, ReviewAction::Reject),
    )
    .await;
    assert_matches!(result, Err(RepoError::Core(CoreError::Forbidden(_))));

    let outcome = MergeRepo::review(
        &pool,
        review(suggestion.id, successor.id, ReviewAction::Reject),
    )
    .await
    .unwrap();
    assert_eq!(outcome.suggestion.reviewer_id, Some(successor.id));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unassigned_contractor_needs_review_any(pool: PgPool) {
    let author = common::user(&pool, "author").await;
    let admin = common::user(&pool, "admin").await;
    let contractor = common::contractor(&pool, None).await;

    let suggestion = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.notes = Some("new".to_string());
    })
    .await;

    let result =
        MergeRepo::review(&pool, review(suggestion.id, admin.id, ReviewAction::Approve)).await;
    assert_matches!(result, Err(RepoError::Core(CoreError::Forbidden(_))));

    let mut request = review(suggestion.id, admin.id, ReviewAction::Approve);
    request.reviewer_permissions = vec!["*".to_string()];
    MergeRepo::review(&pool, request).await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn test_pending_count_for_reviewer(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let other = common::user(&pool, "other").await;
    let author = common::user(&pool, "author").await;
    let mine = common::contractor(&pool, Some(manager.id)).await;
    let theirs = common::contractor(&pool, Some(other.id)).await;

    for notes in ["a", "b"] {
        common::propose(&pool, author.id, mine.id, None, |p| {
            p.contractor.notes = Some(notes.to_string());
        })
        .await;
    }
    let reviewed = common::propose(&pool, author.id, theirs.id, None, |p| {
        p.contractor.notes = Some("c".to_string());
    })
    .await;
    common::propose(&pool, author.id, theirs.id, None, |p| {
        p.contractor.notes = Some("d".to_string());
    })
    .await;
    MergeRepo::review(&pool, review(reviewed.id, other.id, ReviewAction::Reject))
        .await
        .unwrap();

    let cases = [
        (manager.id, false, 2),
        (other.id, false, 1),
        (author.id, false, 0),
        (author.id, true, 3),
    ];
    for (user_id, can_review_any, expected) in cases {
        let count = SuggestionRepo::count_pending_for_reviewer(&pool, user_id, can_review_any)
            .await
            .unwrap();
        assert_eq!(count, expected, "user {user_id}, review_any={can_review_any}");
    }
}

// ---------------------------------------------------------------------------
// Stale baseline
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_refuse_policy_rejects_stale_suggestion(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, Some(manager.id)).await;

    let first = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.notes = Some("first".to_string());
    })
    .await;
    let second = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.description = Some("second".to_string());
    })
    .await;

    MergeRepo::review(&pool, review(first.id, manager.id, ReviewAction::Approve))
        .await
        .unwrap();

    let mut request = review(second.id, manager.id, ReviewAction::Approve);
    request.stale_policy = StalePolicy::Refuse;
    let result = MergeRepo::review(&pool, request).await;
    assert_matches!(result, Err(RepoError::Core(CoreError::Conflict(_))));

    // Rejecting a stale suggestion is always allowed.
    let mut request = review(second.id, manager.id, ReviewAction::Reject);
    request.stale_policy = StalePolicy::Refuse;
    MergeRepo::review(&pool, request).await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn test_last_writer_wins_applies_stale_suggestion(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, Some(manager.id)).await;

    let first = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.notes = Some("first".to_string());
    })
    .await;
    let second = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.notes = Some("second".to_string());
    })
    .await;

    for id in [first.id, second.id] {
        MergeRepo::review(&pool, review(id, manager.id, ReviewAction::Approve))
            .await
            .unwrap();
    }

    let merged = common::snapshot(&pool, contractor.id).await;
    assert_eq!(merged.notes.as_deref(), Some("second"));
}

// ---------------------------------------------------------------------------
// Terminal states
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_reject_leaves_contractor_untouched(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, Some(manager.id)).await;
    common::service_point(&pool, contractor.id, "P1").await;
    let before = common::snapshot(&pool, contractor.id).await;
    let version = common::version(&pool, contractor.id).await;

    let suggestion = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.notes = Some("new".to_string());
        p.contractor.service_points.clear();
    })
    .await;

    let mut request = review(suggestion.id, manager.id, ReviewAction::Reject);
    request.comment = Some("not now".to_string());
    let outcome = MergeRepo::review(&pool, request).await.unwrap();

    assert_eq!(outcome.suggestion.status().unwrap(), SuggestionStatus::Rejected);
    assert_eq!(outcome.suggestion.review_comment.as_deref(), Some("not now"));
    assert_eq!(common::snapshot(&pool, contractor.id).await, before);
    assert_eq!(common::version(&pool, contractor.id).await, version);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_second_review_fails_without_mutation(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let author = common::user(&pool, "author").await;
    let contractor = common::contractor(&pool, Some(manager.id)).await;

    let suggestion = common::propose(&pool, author.id, contractor.id, None, |p| {
        p.contractor.notes = Some("new".to_string());
    })
    .await;

    MergeRepo::review(&pool, review(suggestion.id, manager.id, ReviewAction::Reject))
        .await
        .unwrap();
    let before = common::snapshot(&pool, contractor.id).await;

    for action in [ReviewAction::Approve, ReviewAction::Reject] {
        let result = MergeRepo::review(&pool, review(suggestion.id, manager.id, action)).await;
        assert_matches!(
            result,
            Err(RepoError::Core(CoreError::AlreadyReviewed { id })) if id == suggestion.id
        );
    }

    assert_eq!(common::snapshot(&pool, contractor.id).await, before);
    let stored = SuggestionRepo::find_by_id(&pool, suggestion.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status().unwrap(), SuggestionStatus::Rejected);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_review_of_missing_suggestion(pool: PgPool) {
    let manager = common::user(&pool, "manager").await;
    let missing = Uuid::new_v4();

    let result = MergeRepo::review(&pool, review(missing, manager.id, ReviewAction::Approve)).await;
    assert_matches!(
        result,
        Err(RepoError::Core(CoreError::NotFound { entity: "Suggestion", id })) if id == missing
    );
}

// ---------------------------------------------------------------------------
// Direct edits
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_direct_edit_applies_without_suggestion(pool: PgPool) {
    let contractor = common::contractor(&pool, None).await;
    let point = common::service_point(&pool, contractor.id, "P1").await;
    let version = common::version(&pool, contractor.id).await;

    let committed = common::snapshot(&pool, contractor.id).await;
    let mut proposal = ContractorProposal::from(committed.clone());
    proposal.contractor.description = Some("edited".to_string());
    proposal.contractor.service_point_mut(point.id).unwrap().fronts_on_service = 3;

    let outcome = MergeRepo::apply_direct_edit(&pool, contractor.id, &proposal)
        .await
        .unwrap();
    assert_eq!(outcome.plan.contractor_fields.len(), 1);
    assert_eq!(outcome.plan.service_point_writes.len(), 1);
    assert!(outcome.orphaned_paths.is_empty());

    let merged = common::snapshot(&pool, contractor.id).await;
    assert_eq!(merged, proposal.contractor);
    assert_eq!(common::version(&pool, contractor.id).await, version + 1);

    let listed = SuggestionRepo::list_for_contractor(&pool, contractor.id, None)
        .await
        .unwrap();
    assert!(listed.is_empty());

    // The same proposal again changes nothing.
    let result = MergeRepo::apply_direct_edit(&pool, contractor.id, &proposal).await;
    assert_matches!(result, Err(RepoError::Core(CoreError::NoChanges)));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_direct_edit_of_missing_contractor(pool: PgPool) {
    let contractor = common::contractor(&pool, None).await;
    let mut proposal = ContractorProposal::from(common::snapshot(&pool, contractor.id).await);
    let missing = Uuid::new_v4();
    proposal.contractor.id = missing;

    let result = MergeRepo::apply_direct_edit(&pool, missing, &proposal).await;
    assert_matches!(
        result,
        Err(RepoError::Core(CoreError::NotFound { entity: "Contractor", .. }))
    );
}
