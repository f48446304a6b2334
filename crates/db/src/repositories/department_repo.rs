//! Repository for the `departments` table.

use clearance_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::department::{
    CreateDepartment, Department, DepartmentStats, UpdateDepartment,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, code, description, clearance_order, is_active, \
                       allow_officer_creation, max_officers, created_at, updated_at";

/// Provides CRUD operations for departments.
pub struct DepartmentRepo;

impl DepartmentRepo {
    /// Insert a new department. A duplicate code fails on `uq_departments_code`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateDepartment,
    ) -> Result<Department, sqlx::Error> {
        let query = format!(
            "INSERT INTO departments
                (name, code, description, clearance_order, allow_officer_creation, max_officers)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Department>(&query)
            .bind(&input.name)
            .bind(&input.code)
            .bind(&input.description)
            .bind(input.clearance_order)
            .bind(input.allow_officer_creation)
            .bind(input.max_officers)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Department>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM departments WHERE id = $1");
        sqlx::query_as::<_, Department>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Load a department and lock its row until the transaction ends.
    ///
    /// Serialises officer creation so the officer cap holds under
    /// concurrent requests.
    pub async fn find_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Department>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM departments WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Department>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List departments in clearance order.
    pub async fn list(pool: &PgPool, include_inactive: bool) -> Result<Vec<Department>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM departments
             WHERE ($1 OR is_active)
             ORDER BY clearance_order ASC, name ASC"
        );
        sqlx::query_as::<_, Department>(&query)
            .bind(include_inactive)
            .fetch_all(pool)
            .await
    }

    /// Update a department. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateDepartment,
    ) -> Result<Option<Department>, sqlx::Error> {
        let query = format!(
            "UPDATE departments SET
                name = COALESCE($2, name),
                code = COALESCE($3, code),
                description = COALESCE($4, description),
                clearance_order = COALESCE($5, clearance_order),
                is_active = COALESCE($6, is_active),
                allow_officer_creation = COALESCE($7, allow_officer_creation),
                max_officers = CASE
                    WHEN $8::INT IS NOT NULL THEN $8
                    WHEN $9 THEN NULL
                    ELSE max_officers
                END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Department>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.code)
            .bind(&input.description)
            .bind(input.clearance_order)
            .bind(input.is_active)
            .bind(input.allow_officer_creation)
            .bind(input.max_officers)
            .bind(input.clear_max_officers)
            .fetch_optional(pool)
            .await
    }

    /// Whether users, documents or clearance records still reference the department.
    pub async fn is_referenced(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE department_id = $1)
                 OR EXISTS (SELECT 1 FROM documents WHERE department_id = $1)
                 OR EXISTS (SELECT 1 FROM clearance_records WHERE department_id = $1)",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Hard-delete a department. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Counters for one department's dashboard.
    pub async fn stats(pool: &PgPool, id: DbId) -> Result<DepartmentStats, sqlx::Error> {
        sqlx::query_as::<_, DepartmentStats>(
            "SELECT
                (SELECT COUNT(*) FROM users
                  WHERE department_id = $1 AND role = 'student') AS students,
                (SELECT COUNT(*) FROM users
                  WHERE department_id = $1 AND role = 'officer') AS officers,
                (SELECT COUNT(*) FROM requirement_departments rd
                   JOIN requirements r ON r.id = rd.requirement_id
                  WHERE rd.department_id = $1 AND r.is_active) AS active_requirements,
                (SELECT COUNT(*) FROM documents
                  WHERE department_id = $1 AND is_latest AND status = 'pending') AS pending_documents,
                (SELECT COUNT(*) FROM documents
                  WHERE department_id = $1 AND is_latest AND status = 'under-review') AS under_review_documents,
                (SELECT COUNT(*) FROM documents
                  WHERE department_id = $1 AND is_latest AND status = 'approved') AS approved_documents,
                (SELECT COUNT(*) FROM documents
                  WHERE department_id = $1 AND is_latest AND status = 'rejected') AS rejected_documents,
                (SELECT COUNT(*) FROM users
                  WHERE department_id = $1 AND role = 'student'
                    AND clearance_status = 'completed') AS cleared_students",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }
}
