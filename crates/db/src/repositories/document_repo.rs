//! Repository for the `documents` table.
//!
//! Uploads are versioned per (student, requirement): a new upload takes the
//! next version number and becomes the only `is_latest` row for the pair.

use clearance_core::access::ListScope;
use clearance_core::documents::{next_version, DocumentStatus};
use clearance_core::pagination::Cursor;
use clearance_core::types::DbId;
use sqlx::PgPool;

use crate::models::document::{
    CreateDocument, Document, DocumentFilter, DocumentStats, ReviewDocument,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, student_id, department_id, requirement_id, file_name, storage_key, \
                       content_type, size_bytes, status, version, is_latest, reviewed_by, \
                       reviewed_at, review_notes, rejection_reason, uploaded_at, created_at, \
                       updated_at";

/// Provides CRUD and review operations for documents.
pub struct DocumentRepo;

impl DocumentRepo {
    /// Insert a new version for (student, requirement) and make it the latest.
    ///
    /// Runs in one transaction: the current latest row is locked and
    /// unmarked before the insert, so exactly one latest row remains.
    pub async fn create_version(
        pool: &PgPool,
        input: &CreateDocument,
    ) -> Result<Document, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "SELECT id FROM documents
             WHERE student_id = $1 AND requirement_id = $2 AND is_latest
             FOR UPDATE",
        )
        .bind(input.student_id)
        .bind(input.requirement_id)
        .fetch_optional(&mut *tx)
        .await?;

        let current_max: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(version) FROM documents WHERE student_id = $1 AND requirement_id = $2",
        )
        .bind(input.student_id)
        .bind(input.requirement_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE documents SET is_latest = FALSE
             WHERE student_id = $1 AND requirement_id = $2 AND is_latest",
        )
        .bind(input.student_id)
        .bind(input.requirement_id)
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO documents
                (student_id, department_id, requirement_id, file_name, storage_key,
                 content_type, size_bytes, status, version, is_latest)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, TRUE)
             RETURNING {COLUMNS}"
        );
        let document = sqlx::query_as::<_, Document>(&query)
            .bind(input.student_id)
            .bind(input.department_id)
            .bind(input.requirement_id)
            .bind(&input.file_name)
            .bind(&input.storage_key)
            .bind(&input.content_type)
            .bind(input.size_bytes)
            .bind(next_version(current_max))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(document)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Document>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM documents WHERE id = $1");
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List documents newest first, keyset-paginated, within `scope`.
    ///
    /// Fetches `limit + 1` rows so the caller can detect a following page.
    pub async fn list(
        pool: &PgPool,
        scope: ListScope,
        filter: &DocumentFilter,
        cursor: Option<Cursor>,
        limit: i64,
    ) -> Result<Vec<Document>, sqlx::Error> {
        let (scope_department, scope_student) = scope_binds(scope);
        if scope == ListScope::Nothing {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {COLUMNS} FROM documents
             WHERE ($1::BIGINT IS NULL OR department_id = $1)
               AND ($2::BIGINT IS NULL OR student_id = $2)
               AND ($3::BIGINT IS NULL OR student_id = $3)
               AND ($4::BIGINT IS NULL OR department_id = $4)
               AND ($5::BIGINT IS NULL OR requirement_id = $5)
               AND ($6::TEXT IS NULL OR status = $6)
               AND (NOT $7 OR is_latest)
               AND ($8::TIMESTAMPTZ IS NULL OR (created_at, id) < ($8, $9))
             ORDER BY created_at DESC, id DESC
             LIMIT $10"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(scope_department)
            .bind(scope_student)
            .bind(filter.student_id)
            .bind(filter.department_id)
            .bind(filter.requirement_id)
            .bind(filter.status.map(DocumentStatus::as_str))
            .bind(filter.latest_only)
            .bind(cursor.map(|c| c.created_at))
            .bind(cursor.map(|c| c.id))
            .bind(limit + 1)
            .fetch_all(pool)
            .await
    }

    /// Latest version of every requirement a student has uploaded for.
    pub async fn latest_for_student(
        pool: &PgPool,
        student_id: DbId,
    ) -> Result<Vec<Document>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM documents
             WHERE student_id = $1 AND is_latest
             ORDER BY requirement_id"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }

    /// Apply a review decision if the document is still in `expected` status.
    ///
    /// Returns `None` when the row is missing or another reviewer changed the
    /// status first.
    pub async fn review(
        pool: &PgPool,
        id: DbId,
        expected: DocumentStatus,
        input: &ReviewDocument,
    ) -> Result<Option<Document>, sqlx::Error> {
        let query = format!(
            "UPDATE documents SET
                status = $3,
                reviewed_by = $4,
                reviewed_at = NOW(),
                review_notes = COALESCE($5, review_notes),
                rejection_reason = $6
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .bind(expected.as_str())
            .bind(input.status.as_str())
            .bind(input.reviewed_by)
            .bind(&input.review_notes)
            .bind(&input.rejection_reason)
            .fetch_optional(pool)
            .await
    }

    /// Delete a document version. When it was the latest, the highest
    /// remaining version of the pair becomes latest.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<Document>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!("DELETE FROM documents WHERE id = $1 RETURNING {COLUMNS}");
        let deleted = sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(doc) = &deleted {
            if doc.is_latest {
                sqlx::query(
                    "UPDATE documents SET is_latest = TRUE
                     WHERE id = (
                        SELECT id FROM documents
                         WHERE student_id = $1 AND requirement_id = $2
                         ORDER BY version DESC
                         LIMIT 1)",
                )
                .bind(doc.student_id)
                .bind(doc.requirement_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(deleted)
    }

    /// Counts of latest documents by status within `scope`.
    pub async fn stats(pool: &PgPool, scope: ListScope) -> Result<DocumentStats, sqlx::Error> {
        if scope == ListScope::Nothing {
            return Ok(DocumentStats::default());
        }
        let (scope_department, scope_student) = scope_binds(scope);
        sqlx::query_as::<_, DocumentStats>(
            "SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'under-review') AS under_review,
                COUNT(*) FILTER (WHERE status = 'approved') AS approved,
                COUNT(*) FILTER (WHERE status = 'rejected') AS rejected
             FROM documents
             WHERE is_latest
               AND ($1::BIGINT IS NULL OR department_id = $1)
               AND ($2::BIGINT IS NULL OR student_id = $2)",
        )
        .bind(scope_department)
        .bind(scope_student)
        .fetch_one(pool)
        .await
    }
}

/// Translate a list scope into `(department_id, student_id)` filter binds.
fn scope_binds(scope: ListScope) -> (Option<DbId>, Option<DbId>) {
    match scope {
        ListScope::All | ListScope::Nothing => (None, None),
        ListScope::Department(dept) => (Some(dept), None),
        ListScope::Student(student) => (None, Some(student)),
    }
}
