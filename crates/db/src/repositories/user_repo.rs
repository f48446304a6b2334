//! Repository for the `users` table.

use clearance_core::clearance::ClearanceStatus;
use clearance_core::pagination::Cursor;
use clearance_core::roles::Role;
use clearance_core::types::DbId;
use clearance_core::users::AccountStatus;
use sqlx::{PgExecutor, PgPool};

use crate::models::user::{CreateUser, UpdateUser, User, UserFilter, UserStats};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, first_name, last_name, role, department_id, matric_number, \
                       phone, password_hash, has_set_password, status, clearance_status, \
                       last_login_at, created_by, created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &CreateUser,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users
                (email, first_name, last_name, role, department_id, matric_number, phone, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.role.as_str())
            .bind(input.department_id)
            .bind(&input.matric_number)
            .bind(&input.phone)
            .bind(input.created_by)
            .fetch_one(executor)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by (normalised) email.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Whether any admin account exists.
    pub async fn admin_exists(pool: &PgPool) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin')")
            .fetch_one(pool)
            .await
    }

    /// List users newest first, keyset-paginated.
    ///
    /// Fetches `limit + 1` rows so the caller can detect a following page.
    pub async fn list(
        pool: &PgPool,
        filter: &UserFilter,
        cursor: Option<Cursor>,
        limit: i64,
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE ($1::TEXT IS NULL OR role = $1)
               AND ($2::BIGINT IS NULL OR department_id = $2)
               AND ($3::TEXT IS NULL OR status = $3)
               AND ($4::TEXT IS NULL
                    OR first_name ILIKE $4 OR last_name ILIKE $4
                    OR email ILIKE $4 OR matric_number ILIKE $4)
               AND ($5::TIMESTAMPTZ IS NULL OR (created_at, id) < ($5, $6))
             ORDER BY created_at DESC, id DESC
             LIMIT $7"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(filter.role.map(Role::as_str))
            .bind(filter.department_id)
            .bind(filter.status.map(AccountStatus::as_str))
            .bind(filter.search.as_deref().map(like_pattern))
            .bind(cursor.map(|c| c.created_at))
            .bind(cursor.map(|c| c.id))
            .bind(limit + 1)
            .fetch_all(pool)
            .await
    }

    /// Update a user. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = CASE WHEN $4 THEN $5 ELSE phone END,
                role = COALESCE($6, role),
                department_id = CASE WHEN $7 THEN $8 ELSE department_id END,
                matric_number = CASE WHEN $9 THEN $10 ELSE matric_number END,
                status = COALESCE($11, status)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.phone.is_some())
            .bind(input.phone.as_ref().and_then(|p| p.as_deref()))
            .bind(input.role.map(Role::as_str))
            .bind(input.department_id.is_some())
            .bind(input.department_id.flatten())
            .bind(input.matric_number.is_some())
            .bind(input.matric_number.as_ref().and_then(|m| m.as_deref()))
            .bind(input.status.map(AccountStatus::as_str))
            .fetch_optional(pool)
            .await
    }

    /// Suspend a user. Returns `true` if the row changed.
    pub async fn suspend(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET status = 'suspended' WHERE id = $1 AND status = 'active'")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store a new password hash and mark the password as set.
    pub async fn set_password<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, has_set_password = TRUE WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a successful login.
    pub async fn record_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Set a student's clearance status, returning the updated row.
    pub async fn set_clearance_status<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        status: ClearanceStatus,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET clearance_status = $2
             WHERE id = $1 AND role = 'student'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(executor)
            .await
    }

    /// Count officers of a department.
    ///
    /// Call inside the transaction holding the department row lock when the
    /// result gates officer creation.
    pub async fn count_officers<'e, E: PgExecutor<'e>>(
        executor: E,
        department_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE role = 'officer' AND department_id = $1",
        )
        .bind(department_id)
        .fetch_one(executor)
        .await
    }

    /// Account counters across the whole user base.
    pub async fn stats(pool: &PgPool) -> Result<UserStats, sqlx::Error> {
        sqlx::query_as::<_, UserStats>(
            "SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE role = 'student') AS students,
                COUNT(*) FILTER (WHERE role = 'officer') AS officers,
                COUNT(*) FILTER (WHERE role = 'student-affairs') AS student_affairs,
                COUNT(*) FILTER (WHERE role = 'admin') AS admins,
                COUNT(*) FILTER (WHERE status = 'active') AS active,
                COUNT(*) FILTER (WHERE status = 'suspended') AS suspended,
                COUNT(*) FILTER (WHERE NOT has_set_password AND role <> 'admin') AS pending_password_setup
             FROM users",
        )
        .fetch_one(pool)
        .await
    }

    /// Students per clearance status, optionally within one department.
    pub async fn clearance_status_counts(
        pool: &PgPool,
        department_id: Option<DbId>,
    ) -> Result<Vec<(String, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (String, i64)>(
            "SELECT clearance_status, COUNT(*) FROM users
             WHERE role = 'student' AND ($1::BIGINT IS NULL OR department_id = $1)
             GROUP BY clearance_status",
        )
        .bind(department_id)
        .fetch_all(pool)
        .await
    }
}

/// Wrap a search term for `ILIKE`, escaping wildcard characters.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
