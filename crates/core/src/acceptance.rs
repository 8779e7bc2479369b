//! Reviewer acceptance: which parts of a change-set get merged.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::changeset::{ChangeKey, ChangeSet, ServicePointSetChange};
use crate::error::CoreError;

/// The reviewer's narrowing of a suggestion, as sent by the client.
///
/// A missing `accepted_fields` list accepts every top-level key. A present
/// `service_points_override` replaces the suggestion's service point entry as
/// the selection of point edits and deletions to apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceOverride {
    #[serde(default)]
    pub accepted_fields: Option<Vec<String>>,
    #[serde(default)]
    pub service_points_override: Option<ServicePointSetChange>,
}

/// What a merge is allowed to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptancePolicy {
    /// Every entry of the change-set.
    AcceptAll,
    /// Only the listed top-level keys, and optionally an explicit selection of
    /// service point updates and deletions.
    AcceptSubset {
        fields: BTreeSet<ChangeKey>,
        service_points: Option<ServicePointSetChange>,
    },
}

impl AcceptancePolicy {
    pub fn subset(
        fields: impl IntoIterator<Item = ChangeKey>,
        service_points: Option<ServicePointSetChange>,
    ) -> Self {
        Self::AcceptSubset {
            fields: fields.into_iter().collect(),
            service_points,
        }
    }

    /// Build a policy from the client's override against `changes`.
    ///
    /// Unknown key names are rejected with [`CoreError::Validation`].
    pub fn from_override(
        changes: &ChangeSet,
        selection: Option<AcceptanceOverride>,
    ) -> Result<Self, CoreError> {
        let Some(selection) = selection else {
            return Ok(Self::AcceptAll);
        };

        match (selection.accepted_fields, selection.service_points_override) {
            (None, None) => Ok(Self::AcceptAll),
            (None, service_points) => Ok(Self::subset(changes.keys(), service_points)),
            (Some(names), service_points) => {
                let fields = names
                    .iter()
                    .map(|name| ChangeKey::parse(name))
                    .collect::<Result<BTreeSet<_>, _>>()?;
                Ok(Self::AcceptSubset {
                    fields,
                    service_points,
                })
            }
        }
    }

    pub fn accepts(&self, key: ChangeKey) -> bool {
        match self {
            Self::AcceptAll => true,
            Self::AcceptSubset { fields, .. } => fields.contains(&key),
        }
    }

    pub fn service_points_override(&self) -> Option<&ServicePointSetChange> {
        match self {
            Self::AcceptAll => None,
            Self::AcceptSubset { service_points, .. } => service_points.as_ref(),
        }
    }
}
