//! Repository for the `service_points` and `service_point_addons` tables.

use fieldcrm_core::error::CoreError;
use fieldcrm_core::fields::{FieldValue, ServicePointField};
use fieldcrm_core::merge::check_fronts;
use fieldcrm_core::types::DbId;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::error::RepoError;
use crate::models::service_point::{CreateServicePoint, ServicePoint};
use crate::repositories::push_assignment;
use crate::repositories::ContractorRepo;

/// Column list for service_points queries.
pub(crate) const COLUMNS: &str = "id, contractor_id, name, address, crm_id, city_id, \
    fronts_count, fronts_on_service, description, notes, individual_terms, \
    created_at, updated_at";

pub struct ServicePointRepo;

impl ServicePointRepo {
    /// Create a service point with its addon links and bump the contractor's
    /// version, all in one transaction.
    pub async fn create(
        pool: &PgPool,
        contractor_id: DbId,
        input: &CreateServicePoint,
    ) -> Result<ServicePoint, RepoError> {
        let fronts_count = input.fronts_count.unwrap_or(0);
        let fronts_on_service = input.fronts_on_service.unwrap_or(0);
        check_fronts(fronts_count, fronts_on_service)?;
        if input.name.trim().is_empty() {
            return Err(CoreError::Validation("Service point name must not be empty".into()).into());
        }

        let mut tx = pool.begin().await?;

        let locked: Option<DbId> =
            sqlx::query_scalar("SELECT id FROM contractors WHERE id = $1 FOR UPDATE")
                .bind(contractor_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(CoreError::NotFound {
                entity: "Contractor",
                id: contractor_id,
            }
            .into());
        }

        let query = format!(
            "INSERT INTO service_points
                (contractor_id, name, address, crm_id, city_id, fronts_count,
                 fronts_on_service, description, notes, individual_terms)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        let point = sqlx::query_as::<_, ServicePoint>(&query)
            .bind(contractor_id)
            .bind(&input.name)
            .bind(non_blank(&input.address))
            .bind(non_blank(&input.crm_id))
            .bind(input.city_id)
            .bind(fronts_count)
            .bind(fronts_on_service)
            .bind(non_blank(&input.description))
            .bind(non_blank(&input.notes))
            .bind(non_blank(&input.individual_terms))
            .fetch_one(&mut *tx)
            .await?;

        if !input.addon_ids.is_empty() {
            Self::replace_addons(&mut tx, point.id, &input.addon_ids).await?;
        }
        ContractorRepo::bump_version(&mut tx, contractor_id).await?;

        tx.commit().await?;
        Ok(point)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ServicePoint>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM service_points WHERE id = $1");
        sqlx::query_as::<_, ServicePoint>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_contractor(
        pool: &PgPool,
        contractor_id: DbId,
    ) -> Result<Vec<ServicePoint>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM service_points
             WHERE contractor_id = $1
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, ServicePoint>(&query)
            .bind(contractor_id)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Transaction steps
    // -----------------------------------------------------------------------

    /// Write accepted field values of one service point. No-op for an empty
    /// list.
    pub(crate) async fn write_fields(
        conn: &mut PgConnection,
        id: DbId,
        fields: &[(ServicePointField, FieldValue)],
    ) -> Result<(), sqlx::Error> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE service_points SET ");
        for (i, (field, value)) in fields.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_assignment(&mut qb, field.column(), value);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.build().execute(&mut *conn).await?;
        Ok(())
    }

    /// Replace all addon links of a service point.
    pub(crate) async fn replace_addons(
        conn: &mut PgConnection,
        service_point_id: DbId,
        addon_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM service_point_addons WHERE service_point_id = $1")
            .bind(service_point_id)
            .execute(&mut *conn)
            .await?;

        for &addon_id in addon_ids {
            sqlx::query(
                "INSERT INTO service_point_addons (service_point_id, addon_id) \
                 VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(service_point_id)
            .bind(addon_id)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Delete service points of a contractor. Addon links and file rows go
    /// with them (ON DELETE CASCADE); callers collect file paths first.
    pub(crate) async fn delete_many(
        conn: &mut PgConnection,
        contractor_id: DbId,
        ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM service_points WHERE contractor_id = $1 AND id = ANY($2)")
                .bind(contractor_id)
                .bind(ids)
                .execute(&mut *conn)
                .await?;
        Ok(result.rows_affected())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
