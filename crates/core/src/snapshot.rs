//! Committed and proposed states of a contractor aggregate.
//!
//! A snapshot holds the tracked fields of a contractor, its contractor-level
//! file ids and its service points (each with its own addon and file ids).
//! The diff engine compares two of these; the merge planner applies an
//! accepted change-set to one.

use serde::{Deserialize, Serialize};

use crate::fields::ContractorStatus;
use crate::types::DbId;

/// Tracked state of a contractor and everything it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorSnapshot {
    pub id: DbId,
    pub inn: Option<String>,
    pub name: String,
    pub is_chain: bool,
    pub status: ContractorStatus,
    pub city_id: Option<DbId>,
    pub agreement_id: Option<DbId>,
    pub manager_id: Option<DbId>,
    pub notes: Option<String>,
    pub description: Option<String>,
    pub individual_terms: Option<String>,
    pub is_hidden: bool,
    /// Committed contractor-level files.
    #[serde(default)]
    pub file_ids: Vec<DbId>,
    #[serde(default)]
    pub service_points: Vec<ServicePointSnapshot>,
}

impl ContractorSnapshot {
    pub fn service_point(&self, id: DbId) -> Option<&ServicePointSnapshot> {
        self.service_points.iter().find(|p| p.id == id)
    }

    pub fn service_point_mut(&mut self, id: DbId) -> Option<&mut ServicePointSnapshot> {
        self.service_points.iter_mut().find(|p| p.id == id)
    }
}

/// Tracked state of a single service point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePointSnapshot {
    pub id: DbId,
    pub name: String,
    pub address: Option<String>,
    pub crm_id: Option<String>,
    pub city_id: Option<DbId>,
    pub fronts_count: i32,
    pub fronts_on_service: i32,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub individual_terms: Option<String>,
    #[serde(default)]
    pub addon_ids: Vec<DbId>,
    /// Committed files of this service point.
    #[serde(default)]
    pub file_ids: Vec<DbId>,
}

/// The client's proposed next state.
///
/// Service points present in the committed snapshot but missing here are
/// treated as deletions; `deleted_service_point_ids` marks deletions
/// explicitly while keeping the point in the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorProposal {
    #[serde(flatten)]
    pub contractor: ContractorSnapshot,
    #[serde(default)]
    pub deleted_service_point_ids: Vec<DbId>,
}

impl From<ContractorSnapshot> for ContractorProposal {
    fn from(contractor: ContractorSnapshot) -> Self {
        Self {
            contractor,
            deleted_service_point_ids: Vec::new(),
        }
    }
}
