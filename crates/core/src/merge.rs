//! Merge planning: turn a suggestion's change-set and a reviewer's acceptance
//! into the exact set of writes to perform.
//!
//! Planning is pure. The database layer executes a [`MergePlan`] inside one
//! transaction; [`MergePlan::apply_to_snapshot`] executes the same plan
//! against an in-memory snapshot for previews.
//!
//! Rules:
//!
//! - A contractor field is written iff its key is accepted.
//! - Service point edits come from the reviewer's override when one is given,
//!   otherwise from the suggestion when `servicePoints` is accepted. An
//!   override can only narrow the suggestion: it selects updates, individual
//!   field diffs and deletions, and the values written are always the
//!   suggestion's own.
//! - `addonIds` replaces the point's addon links as a whole.
//! - `files` commits the added ids and removes the removed ids.
//! - `frontsOnService` must stay within `0..=frontsCount` once every accepted
//!   value is applied; a violating plan is rejected, never clamped.

use crate::acceptance::AcceptancePolicy;
use crate::changeset::{
    ChangeKey, ChangeSet, FileSetChange, ServicePointDiff, ServicePointSetChange,
    ServicePointUpdate,
};
use crate::error::CoreError;
use crate::fields::{ContractorField, FieldValue, ServicePointField};
use crate::snapshot::ContractorSnapshot;
use crate::types::DbId;

/// Writes to perform on one surviving service point.
#[derive(Debug, Clone, PartialEq)]
pub struct ServicePointWrite {
    pub id: DbId,
    pub fields: Vec<(ServicePointField, FieldValue)>,
    /// Replacement addon set, if the addon links change.
    pub addon_ids: Option<Vec<DbId>>,
    pub files: FileSetChange,
}

impl ServicePointWrite {
    fn new(id: DbId) -> Self {
        Self {
            id,
            fields: Vec::new(),
            addon_ids: None,
            files: FileSetChange::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.addon_ids.is_none() && self.files.is_empty()
    }

    fn integer(&self, field: ServicePointField) -> Option<i32> {
        self.fields.iter().find_map(|(f, v)| match (f, v) {
            (f, FieldValue::Integer(n)) if *f == field => Some(*n),
            _ => None,
        })
    }
}

/// The accepted subset of a change-set, resolved against the current record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergePlan {
    pub contractor_fields: Vec<(ContractorField, FieldValue)>,
    pub service_point_deletes: Vec<DbId>,
    pub service_point_writes: Vec<ServicePointWrite>,
    /// Contractor-level file changes, present only when `files` is accepted.
    pub contractor_files: Option<FileSetChange>,
}

impl MergePlan {
    /// `true` when applying the plan would change nothing.
    pub fn is_empty(&self) -> bool {
        self.contractor_fields.is_empty()
            && self.service_point_deletes.is_empty()
            && self.service_point_writes.is_empty()
            && self
                .contractor_files
                .as_ref()
                .map_or(true, FileSetChange::is_empty)
    }

    /// File ids that become committed when the plan is applied.
    pub fn committed_file_ids(&self) -> Vec<DbId> {
        let mut ids: Vec<DbId> = self
            .service_point_writes
            .iter()
            .flat_map(|w| w.files.added.iter().copied())
            .collect();
        if let Some(files) = &self.contractor_files {
            ids.extend(files.added.iter().copied());
        }
        ids
    }

    /// File ids deleted by the plan (row and stored binary).
    pub fn removed_file_ids(&self) -> Vec<DbId> {
        let mut ids: Vec<DbId> = self
            .service_point_writes
            .iter()
            .flat_map(|w| w.files.removed.iter().copied())
            .collect();
        if let Some(files) = &self.contractor_files {
            ids.extend(files.removed.iter().copied());
        }
        ids
    }

    /// Apply the plan to an in-memory snapshot.
    pub fn apply_to_snapshot(&self, snapshot: &mut ContractorSnapshot) -> Result<(), CoreError> {
        snapshot
            .service_points
            .retain(|p| !self.service_point_deletes.contains(&p.id));

        for write in &self.service_point_writes {
            let point = snapshot
                .service_point_mut(write.id)
                .ok_or(CoreError::NotFound {
                    entity: "ServicePoint",
                    id: write.id,
                })?;
            for (field, value) in &write.fields {
                field.write(point, value.clone())?;
            }
            if let Some(addons) = &write.addon_ids {
                point.addon_ids = addons.clone();
            }
            apply_file_set(&mut point.file_ids, &write.files);
        }

        for (field, value) in &self.contractor_fields {
            field.write(snapshot, value.clone())?;
        }
        if let Some(files) = &self.contractor_files {
            apply_file_set(&mut snapshot.file_ids, files);
        }
        Ok(())
    }
}

fn apply_file_set(ids: &mut Vec<DbId>, change: &FileSetChange) {
    ids.retain(|id| !change.removed.contains(id));
    for id in &change.added {
        if !ids.contains(id) {
            ids.push(*id);
        }
    }
}

/// Resolve which parts of `changes` to apply against `current`.
///
/// # Errors
///
/// - [`CoreError::Validation`] for values of the wrong type, an override that
///   is not a subset of the suggestion, or a broken fronts invariant.
/// - [`CoreError::NotFound`] when a targeted service point no longer exists.
pub fn plan_merge(
    changes: &ChangeSet,
    policy: &AcceptancePolicy,
    current: &ContractorSnapshot,
) -> Result<MergePlan, CoreError> {
    let mut plan = MergePlan::default();

    for (field, change) in &changes.fields {
        if policy.accepts(ChangeKey::Field(*field)) {
            plan.contractor_fields
                .push((*field, field.parse_value(&change.new)?));
        }
    }

    if let Some(files) = &changes.files {
        if policy.accepts(ChangeKey::Files) {
            plan.contractor_files = Some(files.clone());
        }
    }

    let Some(points) = effective_service_points(changes, policy)? else {
        return Ok(plan);
    };

    for id in &points.deletes {
        if current.service_point(*id).is_none() {
            return Err(CoreError::NotFound {
                entity: "ServicePoint",
                id: *id,
            });
        }
        if !plan.service_point_deletes.contains(id) {
            plan.service_point_deletes.push(*id);
        }
    }

    for update in &points.updates {
        if plan.service_point_deletes.contains(&update.id) {
            continue;
        }
        let existing = current
            .service_point(update.id)
            .ok_or(CoreError::NotFound {
                entity: "ServicePoint",
                id: update.id,
            })?;

        let mut write = ServicePointWrite::new(update.id);
        for (field, change) in &update.diff.fields {
            write.fields.push((*field, field.parse_value(&change.new)?));
        }
        if let Some(addons) = &update.diff.addon_ids {
            let mut ids = addons.new.clone();
            ids.sort();
            ids.dedup();
            write.addon_ids = Some(ids);
        }
        if let Some(files) = &update.diff.files {
            write.files = files.clone();
        }

        let fronts_count = write
            .integer(ServicePointField::FrontsCount)
            .unwrap_or(existing.fronts_count);
        let fronts_on_service = write
            .integer(ServicePointField::FrontsOnService)
            .unwrap_or(existing.fronts_on_service);
        check_fronts(fronts_count, fronts_on_service).map_err(|e| match e {
            CoreError::Validation(msg) => {
                CoreError::Validation(format!("Service point {}: {msg}", update.id))
            }
            other => other,
        })?;

        if !write.is_empty() {
            plan.service_point_writes.push(write);
        }
    }

    Ok(plan)
}

/// Validate `0 <= fronts_on_service <= fronts_count`.
pub fn check_fronts(fronts_count: i32, fronts_on_service: i32) -> Result<(), CoreError> {
    if fronts_count < 0 || fronts_on_service < 0 {
        return Err(CoreError::Validation(
            "front counters must not be negative".to_string(),
        ));
    }
    if fronts_on_service > fronts_count {
        return Err(CoreError::Validation(format!(
            "frontsOnService ({fronts_on_service}) exceeds frontsCount ({fronts_count})"
        )));
    }
    Ok(())
}

fn effective_service_points(
    changes: &ChangeSet,
    policy: &AcceptancePolicy,
) -> Result<Option<ServicePointSetChange>, CoreError> {
    let proposed = changes.service_points.as_ref();

    if let Some(selection) = policy.service_points_override() {
        if selection.is_empty() {
            return Ok(None);
        }
        let proposed = proposed.ok_or_else(|| {
            CoreError::Validation("Suggestion proposes no service point changes".into())
        })?;
        return narrow(proposed, selection).map(Some);
    }

    if policy.accepts(ChangeKey::ServicePoints) {
        return Ok(proposed.cloned());
    }
    Ok(None)
}

/// Restrict `proposed` to the entries named in `selection`.
fn narrow(
    proposed: &ServicePointSetChange,
    selection: &ServicePointSetChange,
) -> Result<ServicePointSetChange, CoreError> {
    let mut result = ServicePointSetChange::default();

    for id in &selection.deletes {
        if !proposed.deletes.contains(id) {
            return Err(CoreError::Validation(format!(
                "Service point {id} is not proposed for deletion"
            )));
        }
        result.deletes.push(*id);
    }

    for selected in &selection.updates {
        let original = proposed.update_for(selected.id).ok_or_else(|| {
            CoreError::Validation(format!(
                "Service point {} has no proposed update",
                selected.id
            ))
        })?;

        let mut diff = ServicePointDiff::default();
        for field in selected.diff.fields.keys() {
            let change = original.diff.fields.get(field).ok_or_else(|| {
                CoreError::Validation(format!(
                    "Field '{}' is not proposed for service point {}",
                    field.name(),
                    selected.id
                ))
            })?;
            diff.fields.insert(*field, change.clone());
        }
        if selected.diff.addon_ids.is_some() {
            diff.addon_ids = Some(original.diff.addon_ids.clone().ok_or_else(|| {
                CoreError::Validation(format!(
                    "Addons are not proposed for service point {}",
                    selected.id
                ))
            })?);
        }
        if selected.diff.files.is_some() {
            diff.files = Some(original.diff.files.clone().ok_or_else(|| {
                CoreError::Validation(format!(
                    "Files are not proposed for service point {}",
                    selected.id
                ))
            })?);
        }

        if !diff.is_empty() {
            result.updates.push(ServicePointUpdate {
                id: selected.id,
                diff,
            });
        }
    }

    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
