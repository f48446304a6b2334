//! Repository for the append-only `clearance_records` table and the
//! clearance progress aggregation queries.

use clearance_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::clearance_record::{ClearanceRecord, CreateClearanceRecord, ProgressCounts};

const COLUMNS: &str = "id, action, actor_id, student_id, department_id, document_id, \
                       requirement_id, metadata, created_at";

/// Insert and query operations for clearance records. Rows are never
/// updated or deleted.
pub struct ClearanceRecordRepo;

impl ClearanceRecordRepo {
    /// Append a record.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &CreateClearanceRecord,
    ) -> Result<ClearanceRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO clearance_records
                (action, actor_id, student_id, department_id, document_id, requirement_id, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClearanceRecord>(&query)
            .bind(input.action.as_str())
            .bind(input.actor_id)
            .bind(input.student_id)
            .bind(input.department_id)
            .bind(input.document_id)
            .bind(input.requirement_id)
            .bind(&input.metadata)
            .fetch_one(executor)
            .await
    }

    /// A student's history, oldest first.
    pub async fn list_for_student(
        pool: &PgPool,
        student_id: DbId,
    ) -> Result<Vec<ClearanceRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM clearance_records
             WHERE student_id = $1
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, ClearanceRecord>(&query)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }

    /// Requirement totals and approvals for each listed student.
    ///
    /// `total_requirements` counts active requirements linked to the
    /// student's department; `approved_requirements` counts the distinct
    /// ones among them whose latest document, filed under that department,
    /// is approved.
    pub async fn progress_counts(
        pool: &PgPool,
        student_ids: &[DbId],
    ) -> Result<Vec<ProgressCounts>, sqlx::Error> {
        sqlx::query_as::<_, ProgressCounts>(
            "SELECT
                u.id AS student_id,
                (SELECT COUNT(*)
                   FROM requirement_departments rd
                   JOIN requirements r ON r.id = rd.requirement_id
                  WHERE rd.department_id = u.department_id AND r.is_active
                ) AS total_requirements,
                (SELECT COUNT(DISTINCT d.requirement_id)
                   FROM documents d
                   JOIN requirements r ON r.id = d.requirement_id AND r.is_active
                   JOIN requirement_departments rd
                     ON rd.requirement_id = d.requirement_id
                    AND rd.department_id = u.department_id
                  WHERE d.student_id = u.id
                    AND d.department_id = u.department_id
                    AND d.is_latest
                    AND d.status = 'approved'
                ) AS approved_requirements
             FROM users u
             WHERE u.id = ANY($1)",
        )
        .bind(student_ids)
        .fetch_all(pool)
        .await
    }

    /// `(total, approved)` requirement counts of one department for one student.
    pub async fn department_counts(
        pool: &PgPool,
        student_id: DbId,
        department_id: DbId,
    ) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as::<_, (i64, i64)>(
            "SELECT
                (SELECT COUNT(*)
                   FROM requirement_departments rd
                   JOIN requirements r ON r.id = rd.requirement_id
                  WHERE rd.department_id = $2 AND r.is_active),
                (SELECT COUNT(DISTINCT d.requirement_id)
                   FROM documents d
                   JOIN requirements r ON r.id = d.requirement_id AND r.is_active
                   JOIN requirement_departments rd
                     ON rd.requirement_id = d.requirement_id AND rd.department_id = $2
                  WHERE d.student_id = $1
                    AND d.department_id = $2
                    AND d.is_latest
                    AND d.status = 'approved')",
        )
        .bind(student_id)
        .bind(department_id)
        .fetch_one(pool)
        .await
    }

    /// Progress counts for every student, optionally in one department.
    pub async fn progress_for_all_students(
        pool: &PgPool,
        department_id: Option<DbId>,
    ) -> Result<Vec<ProgressCounts>, sqlx::Error> {
        let ids: Vec<DbId> = sqlx::query_scalar(
            "SELECT id FROM users
             WHERE role = 'student' AND ($1::BIGINT IS NULL OR department_id = $1)",
        )
        .bind(department_id)
        .fetch_all(pool)
        .await?;
        Self::progress_counts(pool, &ids).await
    }
}
