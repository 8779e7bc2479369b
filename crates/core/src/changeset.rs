//! Typed change-set and its persisted wire shape.
//!
//! On the wire a change-set is a JSON object keyed by field name:
//!
//! ```text
//! {
//!   "<field>":       { "old": any, "new": any },
//!   "files":         { "old": null, "new": { "added": [id], "removed": [id] } },
//!   "servicePoints": { "old": null, "new": { "updates": [{ "id", "diff" }], "deletes": [id] } }
//! }
//! ```
//!
//! A service point `diff` uses the same shape with service point field names,
//! plus `addonIds: { old: [id], new: [id] }` and the `files` composite.
//! Suggestions already stored in this shape must keep deserializing, so the
//! [`Serialize`] / [`Deserialize`] impls below are hand-written around it.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::fields::{ContractorField, ServicePointField};
use crate::types::DbId;

/// Wire key of the contractor file-set entry.
pub const FILES_KEY: &str = "files";

/// Wire key of the service point collection entry.
pub const SERVICE_POINTS_KEY: &str = "servicePoints";

/// Wire key of the addon-set entry inside a service point diff.
pub const ADDON_IDS_KEY: &str = "addonIds";

// ---------------------------------------------------------------------------
// Leaf changes
// ---------------------------------------------------------------------------

/// A scalar field moving from `old` to `new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarFieldChange {
    #[serde(default)]
    pub old: Value,
    #[serde(default)]
    pub new: Value,
}

/// Files attached or detached by a proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSetChange {
    #[serde(default)]
    pub added: Vec<DbId>,
    #[serde(default)]
    pub removed: Vec<DbId>,
}

impl FileSetChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Complete replacement of a service point's addon links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonSetChange {
    #[serde(default)]
    pub old: Vec<DbId>,
    #[serde(default)]
    pub new: Vec<DbId>,
}

/// `{ "old": null, "new": T }` wrapper used by composite entries.
#[derive(Serialize, Deserialize)]
struct Composite<T> {
    #[serde(default)]
    old: Value,
    new: T,
}

impl<T> Composite<T> {
    fn of(new: T) -> Self {
        Self {
            old: Value::Null,
            new,
        }
    }
}

// ---------------------------------------------------------------------------
// Service points
// ---------------------------------------------------------------------------

/// Field-level diff of one existing service point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServicePointDiff {
    pub fields: BTreeMap<ServicePointField, ScalarFieldChange>,
    pub addon_ids: Option<AddonSetChange>,
    pub files: Option<FileSetChange>,
}

impl ServicePointDiff {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.addon_ids.is_none() && self.files.is_none()
    }

    /// Wire keys present in this diff.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = self.fields.keys().map(|f| f.name()).collect();
        if self.addon_ids.is_some() {
            keys.push(ADDON_IDS_KEY);
        }
        if self.files.is_some() {
            keys.push(FILES_KEY);
        }
        keys
    }

    fn len(&self) -> usize {
        self.fields.len() + usize::from(self.addon_ids.is_some()) + usize::from(self.files.is_some())
    }
}

impl Serialize for ServicePointDiff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (field, change) in &self.fields {
            map.serialize_entry(field.name(), change)?;
        }
        if let Some(addons) = &self.addon_ids {
            map.serialize_entry(ADDON_IDS_KEY, addons)?;
        }
        if let Some(files) = &self.files {
            map.serialize_entry(FILES_KEY, &Composite::of(files))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ServicePointDiff {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let mut diff = ServicePointDiff::default();
        for (key, value) in raw {
            match key.as_str() {
                ADDON_IDS_KEY => {
                    diff.addon_ids = Some(serde_json::from_value(value).map_err(D::Error::custom)?);
                }
                FILES_KEY => {
                    let composite: Composite<FileSetChange> =
                        serde_json::from_value(value).map_err(D::Error::custom)?;
                    diff.files = Some(composite.new);
                }
                other => {
                    let field = ServicePointField::from_name(other).ok_or_else(|| {
                        D::Error::custom(format!("unknown service point field '{other}'"))
                    })?;
                    let change = serde_json::from_value(value).map_err(D::Error::custom)?;
                    diff.fields.insert(field, change);
                }
            }
        }
        Ok(diff)
    }
}

/// One entry of `servicePoints.new.updates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePointUpdate {
    pub id: DbId,
    pub diff: ServicePointDiff,
}

/// Proposed edits and deletions of existing service points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicePointSetChange {
    #[serde(default)]
    pub updates: Vec<ServicePointUpdate>,
    #[serde(default)]
    pub deletes: Vec<DbId>,
}

impl ServicePointSetChange {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.deletes.is_empty()
    }

    pub fn update_for(&self, id: DbId) -> Option<&ServicePointUpdate> {
        self.updates.iter().find(|u| u.id == id)
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// A top-level key of a change-set, as named in a reviewer's acceptance list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeKey {
    Field(ContractorField),
    Files,
    ServicePoints,
}

impl ChangeKey {
    pub fn name(self) -> &'static str {
        match self {
            Self::Field(field) => field.name(),
            Self::Files => FILES_KEY,
            Self::ServicePoints => SERVICE_POINTS_KEY,
        }
    }

    pub fn parse(name: &str) -> Result<Self, CoreError> {
        match name {
            FILES_KEY => Ok(Self::Files),
            SERVICE_POINTS_KEY => Ok(Self::ServicePoints),
            other => ContractorField::from_name(other)
                .map(Self::Field)
                .ok_or_else(|| CoreError::Validation(format!("Unknown change key '{other}'"))),
        }
    }
}

/// A borrowed view of one change-set entry by category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldChange<'a> {
    Scalar(&'a ScalarFieldChange),
    Files(&'a FileSetChange),
    ServicePoints(&'a ServicePointSetChange),
}

/// The full set of changes a suggestion proposes for one contractor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub fields: BTreeMap<ContractorField, ScalarFieldChange>,
    pub files: Option<FileSetChange>,
    pub service_points: Option<ServicePointSetChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_none() && self.service_points.is_none()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
            + usize::from(self.files.is_some())
            + usize::from(self.service_points.is_some())
    }

    /// Top-level keys in wire order (scalar fields first).
    pub fn keys(&self) -> Vec<ChangeKey> {
        self.entries().into_iter().map(|(key, _)| key).collect()
    }

    pub fn entries(&self) -> Vec<(ChangeKey, FieldChange<'_>)> {
        let mut entries: Vec<(ChangeKey, FieldChange<'_>)> = self
            .fields
            .iter()
            .map(|(field, change)| (ChangeKey::Field(*field), FieldChange::Scalar(change)))
            .collect();
        if let Some(files) = &self.files {
            entries.push((ChangeKey::Files, FieldChange::Files(files)));
        }
        if let Some(points) = &self.service_points {
            entries.push((ChangeKey::ServicePoints, FieldChange::ServicePoints(points)));
        }
        entries
    }

    /// Every file id the change-set attaches, paired with the service point
    /// it is attached to (`None` for the contractor itself).
    pub fn added_files(&self) -> Vec<(DbId, Option<DbId>)> {
        let mut added: Vec<(DbId, Option<DbId>)> = self
            .files
            .iter()
            .flat_map(|files| files.added.iter().map(|id| (*id, None)))
            .collect();
        if let Some(points) = &self.service_points {
            for update in &points.updates {
                if let Some(files) = &update.diff.files {
                    added.extend(files.added.iter().map(|id| (*id, Some(update.id))));
                }
            }
        }
        added
    }

    /// Parse a stored or transmitted change-set.
    pub fn from_wire(value: Value) -> Result<Self, CoreError> {
        serde_json::from_value(value)
            .map_err(|e| CoreError::Validation(format!("Malformed change-set: {e}")))
    }

    /// Produce the wire representation.
    pub fn to_wire(&self) -> Result<Value, CoreError> {
        serde_json::to_value(self)
            .map_err(|e| CoreError::Internal(format!("Failed to serialize change-set: {e}")))
    }
}

impl Serialize for ChangeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (field, change) in &self.fields {
            map.serialize_entry(field.name(), change)?;
        }
        if let Some(files) = &self.files {
            map.serialize_entry(FILES_KEY, &Composite::of(files))?;
        }
        if let Some(points) = &self.service_points {
            map.serialize_entry(SERVICE_POINTS_KEY, &Composite::of(points))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ChangeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let mut changes = ChangeSet::default();
        for (key, value) in raw {
            match key.as_str() {
                FILES_KEY => {
                    let composite: Composite<FileSetChange> =
                        serde_json::from_value(value).map_err(D::Error::custom)?;
                    changes.files = Some(composite.new);
                }
                SERVICE_POINTS_KEY => {
                    let composite: Composite<ServicePointSetChange> =
                        serde_json::from_value(value).map_err(D::Error::custom)?;
                    changes.service_points = Some(composite.new);
                }
                other => {
                    let field = ContractorField::from_name(other).ok_or_else(|| {
                        D::Error::custom(format!("unknown contractor field '{other}'"))
                    })?;
                    let change = serde_json::from_value(value).map_err(D::Error::custom)?;
                    changes.fields.insert(field, change);
                }
            }
        }
        Ok(changes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
