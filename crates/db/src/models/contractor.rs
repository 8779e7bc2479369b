//! Contractor model and the assembled aggregate used by diff and merge.

use fieldcrm_core::error::CoreError;
use fieldcrm_core::fields::ContractorStatus;
use fieldcrm_core::snapshot::{ContractorSnapshot, ServicePointSnapshot};
use fieldcrm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `contractors` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contractor {
    pub id: DbId,
    pub inn: Option<String>,
    pub name: String,
    pub is_chain: bool,
    pub status: String,
    pub city_id: Option<DbId>,
    pub agreement_id: Option<DbId>,
    pub manager_id: Option<DbId>,
    pub creator_id: Option<DbId>,
    pub notes: Option<String>,
    pub description: Option<String>,
    pub individual_terms: Option<String>,
    pub is_hidden: bool,
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Contractor {
    /// Build the tracked snapshot from this row and its loaded children.
    pub fn to_snapshot(
        &self,
        file_ids: Vec<DbId>,
        service_points: Vec<ServicePointSnapshot>,
    ) -> Result<ContractorSnapshot, CoreError> {
        Ok(ContractorSnapshot {
            id: self.id,
            inn: self.inn.clone(),
            name: self.name.clone(),
            is_chain: self.is_chain,
            status: ContractorStatus::parse(&self.status)
                .map_err(|e| CoreError::Internal(format!("Contractor {}: {e}", self.id)))?,
            city_id: self.city_id,
            agreement_id: self.agreement_id,
            manager_id: self.manager_id,
            notes: self.notes.clone(),
            description: self.description.clone(),
            individual_terms: self.individual_terms.clone(),
            is_hidden: self.is_hidden,
            file_ids,
            service_points,
        })
    }
}

/// DTO for creating a contractor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractor {
    pub inn: Option<String>,
    pub name: String,
    pub is_chain: Option<bool>,
    pub status: Option<ContractorStatus>,
    pub city_id: Option<DbId>,
    pub agreement_id: Option<DbId>,
    pub manager_id: Option<DbId>,
    pub creator_id: Option<DbId>,
    pub notes: Option<String>,
    pub description: Option<String>,
    pub individual_terms: Option<String>,
}

/// A contractor row together with its tracked snapshot.
#[derive(Debug, Clone)]
pub struct ContractorAggregate {
    pub contractor: Contractor,
    pub snapshot: ContractorSnapshot,
}
