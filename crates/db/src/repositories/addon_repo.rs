//! Repository for the `addons` dictionary.

use fieldcrm_core::types::DbId;
use sqlx::PgPool;

use crate::models::addon::{Addon, CreateAddon};

const COLUMNS: &str = "id, name, color, created_at, updated_at";

pub struct AddonRepo;

impl AddonRepo {
    pub async fn create(pool: &PgPool, input: &CreateAddon) -> Result<Addon, sqlx::Error> {
        let query =
            format!("INSERT INTO addons (name, color) VALUES ($1, $2) RETURNING {COLUMNS}");
        sqlx::query_as::<_, Addon>(&query)
            .bind(&input.name)
            .bind(&input.color)
            .fetch_one(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Addon>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM addons ORDER BY name");
        sqlx::query_as::<_, Addon>(&query).fetch_all(pool).await
    }

    /// Addon ids linked to a service point, sorted.
    pub async fn ids_for_service_point(
        pool: &PgPool,
        service_point_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT addon_id FROM service_point_addons \
             WHERE service_point_id = $1 \
             ORDER BY addon_id",
        )
        .bind(service_point_id)
        .fetch_all(pool)
        .await
    }
}
