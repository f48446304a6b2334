//! Repository for the `requirements` and `requirement_departments` tables.

use clearance_core::types::DbId;
use sqlx::PgPool;

use crate::models::requirement::{CreateRequirement, Requirement, UpdateRequirement};

/// SELECT list joining in the linked department ids. Pair with
/// [`GROUP_BY`].
const SELECT: &str = "SELECT r.id, r.name, r.description, r.allowed_file_types, \
        r.max_file_size_mb, r.display_order, r.is_required, r.is_active, \
        COALESCE(array_agg(rd.department_id ORDER BY rd.department_id) \
                 FILTER (WHERE rd.department_id IS NOT NULL), '{}') AS department_ids, \
        r.created_at, r.updated_at \
    FROM requirements r \
    LEFT JOIN requirement_departments rd ON rd.requirement_id = r.id";

const GROUP_BY: &str = "GROUP BY r.id";

/// Provides CRUD operations for requirements.
pub struct RequirementRepo;

impl RequirementRepo {
    /// Insert a requirement and its department links in one transaction.
    pub async fn create(
        pool: &PgPool,
        input: &CreateRequirement,
    ) -> Result<Requirement, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let id: DbId = sqlx::query_scalar(
            "INSERT INTO requirements
                (name, description, allowed_file_types, max_file_size_mb, display_order, is_required)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.allowed_file_types)
        .bind(input.max_file_size_mb)
        .bind(input.display_order)
        .bind(input.is_required)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO requirement_departments (requirement_id, department_id)
             SELECT $1, UNNEST($2::BIGINT[])",
        )
        .bind(id)
        .bind(&input.department_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Requirement>, sqlx::Error> {
        let query = format!("{SELECT} WHERE r.id = $1 {GROUP_BY}");
        sqlx::query_as::<_, Requirement>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List requirements in display order, optionally for one department.
    pub async fn list(
        pool: &PgPool,
        department_id: Option<DbId>,
        include_inactive: bool,
    ) -> Result<Vec<Requirement>, sqlx::Error> {
        let query = format!(
            "{SELECT}
             WHERE ($2 OR r.is_active)
               AND ($1::BIGINT IS NULL OR EXISTS (
                    SELECT 1 FROM requirement_departments x
                     WHERE x.requirement_id = r.id AND x.department_id = $1))
             {GROUP_BY}
             ORDER BY r.display_order ASC, r.name ASC"
        );
        sqlx::query_as::<_, Requirement>(&query)
            .bind(department_id)
            .bind(include_inactive)
            .fetch_all(pool)
            .await
    }

    /// Update a requirement; replaces the department links when given.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateRequirement,
    ) -> Result<Option<Requirement>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE requirements SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                allowed_file_types = COALESCE($4, allowed_file_types),
                max_file_size_mb = COALESCE($5, max_file_size_mb),
                display_order = COALESCE($6, display_order),
                is_required = COALESCE($7, is_required),
                is_active = COALESCE($8, is_active)
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.allowed_file_types)
        .bind(input.max_file_size_mb)
        .bind(input.display_order)
        .bind(input.is_required)
        .bind(input.is_active)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        if let Some(department_ids) = &input.department_ids {
            sqlx::query("DELETE FROM requirement_departments WHERE requirement_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT INTO requirement_departments (requirement_id, department_id)
                 SELECT $1, UNNEST($2::BIGINT[])",
            )
            .bind(id)
            .bind(department_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Self::find_by_id(pool, id).await
    }

    /// Whether documents have been uploaded against the requirement.
    pub async fn has_documents(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM documents WHERE requirement_id = $1)
                 OR EXISTS (SELECT 1 FROM clearance_records WHERE requirement_id = $1)",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Hard-delete a requirement (links cascade). Returns `true` if removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM requirements WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
