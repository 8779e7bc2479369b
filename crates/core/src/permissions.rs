//! Capability names and the review authorization gate.
//!
//! Capabilities arrive as opaque strings inside the access token. A grant
//! matches a capability exactly, through the `*` wildcard, or through a
//! `prefix.*` namespace wildcard.

use crate::types::DbId;

/// Edit contractors and their files directly, without a suggestion.
pub const CAP_CONTRACTORS_EDIT: &str = "contractors.edit";

/// Create service points directly.
pub const CAP_SERVICE_POINTS_CREATE: &str = "service_points.create";

/// Propose changes through suggestions.
pub const CAP_SUGGESTIONS_CREATE: &str = "suggestions.create";

/// Review any suggestion regardless of the contractor's assigned manager.
pub const CAP_SUGGESTIONS_REVIEW_ANY: &str = "suggestions.review_any";

/// Grant that matches every capability.
pub const CAP_ALL: &str = "*";

/// Return `true` if `permissions` grants `capability`.
pub fn has_permission(permissions: &[String], capability: &str) -> bool {
    permissions.iter().any(|grant| grant_matches(grant, capability))
}

fn grant_matches(grant: &str, capability: &str) -> bool {
    if grant == CAP_ALL || grant == capability {
        return true;
    }
    match grant.strip_suffix(".*") {
        Some(namespace) => capability
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with('.')),
        None => false,
    }
}

/// Decide whether `user_id` may approve or reject a suggestion against a
/// contractor currently managed by `manager_id`.
///
/// Authorship plays no part: the check runs against the assignment at
/// review time.
pub fn is_reviewer_authorized(
    user_id: DbId,
    permissions: &[String],
    manager_id: Option<DbId>,
) -> bool {
    manager_id == Some(user_id) || has_permission(permissions, CAP_SUGGESTIONS_REVIEW_ANY)
}
