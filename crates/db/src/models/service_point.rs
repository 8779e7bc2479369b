use fieldcrm_core::snapshot::ServicePointSnapshot;
use fieldcrm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `service_points` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePoint {
    pub id: DbId,
    pub contractor_id: DbId,
    pub name: String,
    pub address: Option<String>,
    pub crm_id: Option<String>,
    pub city_id: Option<DbId>,
    pub fronts_count: i32,
    pub fronts_on_service: i32,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub individual_terms: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ServicePoint {
    pub fn to_snapshot(&self, addon_ids: Vec<DbId>, file_ids: Vec<DbId>) -> ServicePointSnapshot {
        ServicePointSnapshot {
            id: self.id,
            name: self.name.clone(),
            address: self.address.clone(),
            crm_id: self.crm_id.clone(),
            city_id: self.city_id,
            fronts_count: self.fronts_count,
            fronts_on_service: self.fronts_on_service,
            description: self.description.clone(),
            notes: self.notes.clone(),
            individual_terms: self.individual_terms.clone(),
            addon_ids,
            file_ids,
        }
    }
}

/// DTO for creating a service point directly (outside the suggestion flow).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServicePoint {
    pub name: String,
    pub address: Option<String>,
    pub crm_id: Option<String>,
    pub city_id: Option<DbId>,
    pub fronts_count: Option<i32>,
    pub fronts_on_service: Option<i32>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub individual_terms: Option<String>,
    #[serde(default)]
    pub addon_ids: Vec<DbId>,
}
