//! User entity model and DTOs.

use clearance_core::access::{Actor, UserScope};
use clearance_core::clearance::ClearanceStatus;
use clearance_core::pagination::Cursor;
use clearance_core::roles::Role;
use clearance_core::types::{DbId, Timestamp};
use clearance_core::users::AccountStatus;
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub department_id: Option<DbId>,
    pub matric_number: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub has_set_password: bool,
    #[sqlx(try_from = "String")]
    pub status: AccountStatus,
    /// Only meaningful for students.
    #[sqlx(try_from = "String")]
    pub clearance_status: ClearanceStatus,
    pub last_login_at: Option<Timestamp>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// The user as an access-control actor.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
            department_id: self.department_id,
        }
    }

    /// Ownership facts used by access predicates.
    pub fn scope(&self) -> UserScope {
        UserScope {
            id: self.id,
            role: self.role,
            department_id: self.department_id,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn cursor(&self) -> Cursor {
        Cursor {
            created_at: self.created_at,
            id: self.id,
        }
    }
}

/// DTO for creating a new user. The account starts without a password.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub department_id: Option<DbId>,
    pub matric_number: Option<String>,
    pub phone: Option<String>,
    pub created_by: Option<DbId>,
}

/// DTO for updating an existing user. `None` leaves a column unchanged; for
/// the nullable columns `Some(None)` writes NULL.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<Option<String>>,
    pub role: Option<Role>,
    pub department_id: Option<Option<DbId>>,
    pub matric_number: Option<Option<String>>,
    pub status: Option<AccountStatus>,
}

/// Filters for listing users. `None` fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub department_id: Option<DbId>,
    pub status: Option<AccountStatus>,
    /// Case-insensitive match on name, email or matriculation number.
    pub search: Option<String>,
}

/// Account counts for the admin dashboard.
#[derive(Debug, Clone, Default, FromRow, serde::Serialize)]
pub struct UserStats {
    pub total: i64,
    pub students: i64,
    pub officers: i64,
    pub student_affairs: i64,
    pub admins: i64,
    pub active: i64,
    pub suspended: i64,
    pub pending_password_setup: i64,
}
