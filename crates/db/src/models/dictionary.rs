//! Reference dictionaries: cities and agreements.

use fieldcrm_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `cities` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct City {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `agreements` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Agreement {
    pub id: DbId,
    pub number: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a city.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCity {
    pub name: String,
}

/// DTO for creating an agreement.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAgreement {
    pub number: String,
}
