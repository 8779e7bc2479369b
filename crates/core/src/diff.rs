//! Field-level diff between a committed contractor and a proposed next state.
//!
//! Pure functions only: nothing here touches storage. `null` and the empty
//! string compare equal, so clearing a text field to `""` is the same as
//! leaving it unset.

use serde_json::Value;

use crate::changeset::{
    AddonSetChange, ChangeSet, FileSetChange, ScalarFieldChange, ServicePointDiff,
    ServicePointSetChange, ServicePointUpdate,
};
use crate::error::CoreError;
use crate::fields::{ContractorField, ServicePointField};
use crate::snapshot::{ContractorProposal, ContractorSnapshot, ServicePointSnapshot};
use crate::types::DbId;

/// Compare two change-set values with blank normalization.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    (is_blank(a) && is_blank(b)) || a == b
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Ids in `new` but not `old`, and ids in `old` but not `new`.
///
/// Returns `None` when the two sets are equal. Order follows the input lists
/// and duplicates are dropped.
pub fn diff_id_sets(old: &[DbId], new: &[DbId]) -> Option<FileSetChange> {
    let mut change = FileSetChange::default();
    for id in new {
        if !old.contains(id) && !change.added.contains(id) {
            change.added.push(*id);
        }
    }
    for id in old {
        if !new.contains(id) && !change.removed.contains(id) {
            change.removed.push(*id);
        }
    }
    (!change.is_empty()).then_some(change)
}

fn same_set(a: &[DbId], b: &[DbId]) -> bool {
    a.iter().all(|id| b.contains(id)) && b.iter().all(|id| a.contains(id))
}

fn sorted(ids: &[DbId]) -> Vec<DbId> {
    let mut ids = ids.to_vec();
    ids.sort();
    ids.dedup();
    ids
}

/// Diff a single service point present on both sides.
pub fn diff_service_point(
    committed: &ServicePointSnapshot,
    proposed: &ServicePointSnapshot,
) -> ServicePointDiff {
    let mut diff = ServicePointDiff::default();

    for field in ServicePointField::ALL {
        let old = field.read(committed);
        let new = field.read(proposed);
        if !values_equal(&old, &new) {
            diff.fields.insert(field, ScalarFieldChange { old, new });
        }
    }

    if !same_set(&committed.addon_ids, &proposed.addon_ids) {
        diff.addon_ids = Some(AddonSetChange {
            old: sorted(&committed.addon_ids),
            new: sorted(&proposed.addon_ids),
        });
    }

    diff.files = diff_id_sets(&committed.file_ids, &proposed.file_ids);
    diff
}

/// Compute the change-set that turns `committed` into `proposed`.
///
/// Service points that exist only in the proposal are ignored: new points are
/// created through the direct API, not through review.
///
/// # Errors
///
/// - [`CoreError::Validation`] if the proposal targets a different contractor.
/// - [`CoreError::NoChanges`] if nothing differs.
pub fn compute_changes(
    committed: &ContractorSnapshot,
    proposed: &ContractorProposal,
) -> Result<ChangeSet, CoreError> {
    let next = &proposed.contractor;
    if next.id != committed.id {
        return Err(CoreError::Validation(format!(
            "Proposal targets contractor {} but the committed record is {}",
            next.id, committed.id
        )));
    }

    let mut changes = ChangeSet::default();

    for field in ContractorField::ALL {
        let old = field.read(committed);
        let new = field.read(next);
        if !values_equal(&old, &new) {
            changes.fields.insert(field, ScalarFieldChange { old, new });
        }
    }

    changes.files = diff_id_sets(&committed.file_ids, &next.file_ids);

    let mut points = ServicePointSetChange::default();
    for current in &committed.service_points {
        let marked = proposed.deleted_service_point_ids.contains(&current.id);
        match next.service_point(current.id) {
            Some(candidate) if !marked => {
                let diff = diff_service_point(current, candidate);
                if !diff.is_empty() {
                    points.updates.push(ServicePointUpdate {
                        id: current.id,
                        diff,
                    });
                }
            }
            _ => points.deletes.push(current.id),
        }
    }
    if !points.is_empty() {
        changes.service_points = Some(points);
    }

    if changes.is_empty() {
        return Err(CoreError::NoChanges);
    }
    Ok(changes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
