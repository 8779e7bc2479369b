//! Repository for the `files` table.
//!
//! Rows move between three link states (see `fieldcrm_core::files`). Every
//! function that deletes rows returns the storage paths of the deleted files
//! so the caller can remove the blobs once the transaction has committed.

use fieldcrm_core::files::FileLink;
use fieldcrm_core::suggestion::SuggestionStatus;
use fieldcrm_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgPool};

use crate::models::file::{CreateFile, StoredFile};
use crate::repositories::ContractorRepo;

/// Column list for files queries.
const COLUMNS: &str = "id, contractor_id, service_point_id, filename, storage_path, file_type, \
    mime_type, size_bytes, is_pending, suggestion_id, upload_token, uploaded_by, \
    created_at, updated_at";

pub struct FileRepo;

impl FileRepo {
    /// Record an uploaded file. A file committed straight away changes the
    /// contractor aggregate, so its version is bumped in the same
    /// transaction.
    pub async fn create(pool: &PgPool, input: &CreateFile) -> Result<StoredFile, sqlx::Error> {
        let (is_pending, suggestion_id, upload_token) = match &input.link {
            FileLink::Committed => (false, None, None),
            FileLink::Staged { upload_token } => (true, None, Some(upload_token.as_str())),
            FileLink::Pending { suggestion_id } => (true, Some(*suggestion_id), None),
        };
        let query = format!(
            "INSERT INTO files
                (id, contractor_id, service_point_id, filename, storage_path, file_type,
                 mime_type, size_bytes, is_pending, suggestion_id, upload_token, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        let mut tx = pool.begin().await?;
        let file = sqlx::query_as::<_, StoredFile>(&query)
            .bind(input.id)
            .bind(input.contractor_id)
            .bind(input.service_point_id)
            .bind(&input.filename)
            .bind(&input.storage_path)
            .bind(input.file_type.as_str())
            .bind(&input.mime_type)
            .bind(input.size_bytes)
            .bind(is_pending)
            .bind(suggestion_id)
            .bind(upload_token)
            .bind(input.uploaded_by)
            .fetch_one(&mut *tx)
            .await?;

        if input.link == FileLink::Committed {
            ContractorRepo::bump_version(&mut tx, input.contractor_id).await?;
        }

        tx.commit().await?;
        Ok(file)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<StoredFile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM files WHERE id = $1");
        sqlx::query_as::<_, StoredFile>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Pending files attached to a suggestion.
    pub async fn list_for_suggestion(
        pool: &PgPool,
        suggestion_id: DbId,
    ) -> Result<Vec<StoredFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM files
             WHERE suggestion_id = $1
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, StoredFile>(&query)
            .bind(suggestion_id)
            .fetch_all(pool)
            .await
    }

    /// Committed files of a contractor and its service points.
    pub async fn list_committed_for_contractor(
        pool: &PgPool,
        contractor_id: DbId,
    ) -> Result<Vec<StoredFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM files
             WHERE contractor_id = $1 AND NOT is_pending
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, StoredFile>(&query)
            .bind(contractor_id)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Transaction steps
    // -----------------------------------------------------------------------

    /// Attach staged uploads to a new suggestion.
    ///
    /// Only uploads made by the suggestion's author for the same contractor
    /// are claimed. Returns the number of claimed files.
    pub(crate) async fn claim_staged(
        conn: &mut PgConnection,
        upload_token: &str,
        author_id: DbId,
        contractor_id: DbId,
        suggestion_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE files SET suggestion_id = $4, upload_token = NULL
             WHERE upload_token = $1 AND uploaded_by = $2 AND contractor_id = $3",
        )
        .bind(upload_token)
        .bind(author_id)
        .bind(contractor_id)
        .bind(suggestion_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// `(id, service_point_id)` of every file linked to a suggestion.
    pub(crate) async fn targets_for_suggestion(
        conn: &mut PgConnection,
        suggestion_id: DbId,
    ) -> Result<Vec<(DbId, Option<DbId>)>, sqlx::Error> {
        sqlx::query_as::<_, (DbId, Option<DbId>)>(
            "SELECT id, service_point_id FROM files WHERE suggestion_id = $1",
        )
        .bind(suggestion_id)
        .fetch_all(&mut *conn)
        .await
    }

    /// Commit the listed files of a suggestion that belong to one service
    /// point.
    pub(crate) async fn commit_for_service_point(
        conn: &mut PgConnection,
        suggestion_id: DbId,
        service_point_id: DbId,
        ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE files SET is_pending = false, suggestion_id = NULL
             WHERE suggestion_id = $1 AND service_point_id = $2 AND id = ANY($3)",
        )
        .bind(suggestion_id)
        .bind(service_point_id)
        .bind(ids)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Commit every contractor-level file of a suggestion.
    pub(crate) async fn commit_contractor_level(
        conn: &mut PgConnection,
        suggestion_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE files SET is_pending = false, suggestion_id = NULL
             WHERE suggestion_id = $1 AND service_point_id IS NULL",
        )
        .bind(suggestion_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete committed files of a contractor by id.
    pub(crate) async fn delete_committed(
        conn: &mut PgConnection,
        contractor_id: DbId,
        ids: &[DbId],
    ) -> Result<Vec<String>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_scalar::<_, String>(
            "DELETE FROM files
             WHERE contractor_id = $1 AND id = ANY($2) AND NOT is_pending
             RETURNING storage_path",
        )
        .bind(contractor_id)
        .bind(ids)
        .fetch_all(&mut *conn)
        .await
    }

    /// Storage paths of every file (in any link state) owned by the given
    /// service points.
    pub(crate) async fn paths_for_service_points(
        conn: &mut PgConnection,
        service_point_ids: &[DbId],
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT storage_path FROM files WHERE service_point_id = ANY($1)",
        )
        .bind(service_point_ids)
        .fetch_all(&mut *conn)
        .await
    }

    /// Delete every file still linked to a suggestion.
    pub(crate) async fn delete_for_suggestion(
        conn: &mut PgConnection,
        suggestion_id: DbId,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "DELETE FROM files WHERE suggestion_id = $1 RETURNING storage_path",
        )
        .bind(suggestion_id)
        .fetch_all(&mut *conn)
        .await
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Delete staged uploads created before `cutoff` that no suggestion
    /// claimed.
    pub async fn purge_stale_staged(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "DELETE FROM files
             WHERE upload_token IS NOT NULL AND created_at < $1
             RETURNING storage_path",
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await
    }

    /// Delete pending files left behind on reviewed suggestions.
    pub async fn purge_orphaned_pending(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "DELETE FROM files f
             USING suggestions s
             WHERE f.suggestion_id = s.id AND s.status_id <> $1
             RETURNING f.storage_path",
        )
        .bind(SuggestionStatus::Pending.id())
        .fetch_all(pool)
        .await
    }
}
