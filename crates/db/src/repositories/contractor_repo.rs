//! Repository for the `contractors` table and the contractor aggregate.

use fieldcrm_core::fields::{ContractorField, FieldValue};
use fieldcrm_core::types::DbId;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::error::RepoError;
use crate::models::contractor::{Contractor, ContractorAggregate, CreateContractor};
use crate::models::service_point::ServicePoint;
use crate::repositories::push_assignment;
use crate::repositories::service_point_repo::COLUMNS as SERVICE_POINT_COLUMNS;

/// Column list for contractors queries.
const COLUMNS: &str = "id, inn, name, is_chain, status, city_id, agreement_id, manager_id, \
    creator_id, notes, description, individual_terms, is_hidden, version, \
    created_at, updated_at";

/// Provides contractor persistence and aggregate loading.
pub struct ContractorRepo;

impl ContractorRepo {
    /// Insert a new contractor, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateContractor) -> Result<Contractor, sqlx::Error> {
        let query = format!(
            "INSERT INTO contractors
                (inn, name, is_chain, status, city_id, agreement_id, manager_id,
                 creator_id, notes, description, individual_terms)
             VALUES ($1, $2, COALESCE($3, false), COALESCE($4, 'potential'), $5, $6, $7,
                     $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Contractor>(&query)
            .bind(&input.inn)
            .bind(&input.name)
            .bind(input.is_chain)
            .bind(input.status.map(|s| s.as_str()))
            .bind(input.city_id)
            .bind(input.agreement_id)
            .bind(input.manager_id)
            .bind(input.creator_id)
            .bind(&input.notes)
            .bind(&input.description)
            .bind(&input.individual_terms)
            .fetch_one(pool)
            .await
    }

    /// Find a contractor row by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Contractor>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM contractors WHERE id = $1");
        sqlx::query_as::<_, Contractor>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Load the committed aggregate: contractor fields, committed
    /// contractor-level files and service points with their addons and
    /// committed files. Pending and staged files are never included.
    ///
    /// All reads share one REPEATABLE READ snapshot, so `version` always
    /// matches the returned state.
    pub async fn load(pool: &PgPool, id: DbId) -> Result<Option<ContractorAggregate>, RepoError> {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        let aggregate = Self::load_with(&mut tx, id, false).await?;
        tx.commit().await?;
        Ok(aggregate)
    }

    /// Reassign the contractor's manager.
    pub async fn set_manager(
        pool: &PgPool,
        id: DbId,
        manager_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE contractors SET manager_id = $2, version = version + 1 WHERE id = $1",
        )
        .bind(id)
        .bind(manager_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Transaction steps
    // -----------------------------------------------------------------------

    /// Load the aggregate, optionally locking the contractor row until the
    /// surrounding transaction ends.
    pub(crate) async fn load_with(
        conn: &mut PgConnection,
        id: DbId,
        for_update: bool,
    ) -> Result<Option<ContractorAggregate>, RepoError> {
        let lock = if for_update { " FOR UPDATE" } else { "" };
        let query = format!("SELECT {COLUMNS} FROM contractors WHERE id = $1{lock}");
        let Some(contractor) = sqlx::query_as::<_, Contractor>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };

        let query = format!(
            "SELECT {SERVICE_POINT_COLUMNS} FROM service_points
             WHERE contractor_id = $1
             ORDER BY created_at, id"
        );
        let points = sqlx::query_as::<_, ServicePoint>(&query)
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

        let addon_links: Vec<(DbId, DbId)> = sqlx::query_as(
            "SELECT spa.service_point_id, spa.addon_id
             FROM service_point_addons spa
             JOIN service_points sp ON sp.id = spa.service_point_id
             WHERE sp.contractor_id = $1
             ORDER BY spa.addon_id",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let files: Vec<(DbId, Option<DbId>)> = sqlx::query_as(
            "SELECT id, service_point_id FROM files
             WHERE contractor_id = $1 AND NOT is_pending
             ORDER BY created_at, id",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let service_points = points
            .iter()
            .map(|point| {
                let addon_ids = addon_links
                    .iter()
                    .filter(|(sp, _)| *sp == point.id)
                    .map(|(_, addon)| *addon)
                    .collect();
                let file_ids = files
                    .iter()
                    .filter(|(_, sp)| *sp == Some(point.id))
                    .map(|(file, _)| *file)
                    .collect();
                point.to_snapshot(addon_ids, file_ids)
            })
            .collect();
        let contractor_files = files
            .iter()
            .filter(|(_, sp)| sp.is_none())
            .map(|(file, _)| *file)
            .collect();

        let snapshot = contractor.to_snapshot(contractor_files, service_points)?;
        Ok(Some(ContractorAggregate {
            contractor,
            snapshot,
        }))
    }

    /// Write accepted contractor field values. No-op for an empty list.
    pub(crate) async fn write_fields(
        conn: &mut PgConnection,
        id: DbId,
        fields: &[(ContractorField, FieldValue)],
    ) -> Result<(), sqlx::Error> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE contractors SET ");
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

    /// Increment the aggregate version, returning the new value.
    pub(crate) async fn bump_version(conn: &mut PgConnection, id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE contractors SET version = version + 1 WHERE id = $1 RETURNING version",
        )
        .bind(id)
        .fetch_one(&mut *conn)
        .await
    }
}
