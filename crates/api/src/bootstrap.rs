//! First-run admin account.

use clearance_core::roles::Role;
use clearance_core::users::normalize_email;
use clearance_db::models::user::{CreateUser, User};
use clearance_db::repositories::UserRepo;
use clearance_db::DbPool;

use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{AppError, AppResult};

/// Create an admin with a usable password unless one already exists.
///
/// The row and its password hash are written in one transaction, so a
/// failed hash write never leaves a password-less admin behind.
pub async fn ensure_admin(pool: &DbPool, email: &str, password: &str) -> AppResult<Option<User>> {
    if UserRepo::admin_exists(pool).await? {
        return Ok(None);
    }

    validate_password_strength(password).map_err(AppError::validation)?;
    let password_hash = hash_password(password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let input = CreateUser {
        email: normalize_email(email),
        first_name: "System".into(),
        last_name: "Administrator".into(),
        role: Role::Admin,
        department_id: None,
        matric_number: None,
        phone: None,
        created_by: None,
    };

    let mut tx = pool.begin().await?;
    let admin = UserRepo::create(&mut *tx, &input).await?;
    UserRepo::set_password(&mut *tx, admin.id, &password_hash).await?;
    tx.commit().await?;

    UserRepo::find_by_id(pool, admin.id).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use clearance_core::error::CoreError;

    #[sqlx::test(migrations = "../db/migrations")]
    async fn creates_admin_once(pool: DbPool) {
        let admin = ensure_admin(&pool, " Root@Uni.test", "bootstrap-password-1")
            .await
            .unwrap()
            .expect("first call creates the admin");
        assert_eq!(admin.email, "root@uni.test");
        assert_eq!(admin.role, Role::Admin);
        assert!(admin.has_set_password);
        assert!(admin.password_hash.is_some());

        let again = ensure_admin(&pool, "other@uni.test", "bootstrap-password-2")
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn weak_password_creates_nothing(pool: DbPool) {
        assert_matches!(
            ensure_admin(&pool, "root@uni.test", "short").await,
            Err(AppError::Core(CoreError::Validation(_)))
        );
        assert!(!UserRepo::admin_exists(&pool).await.unwrap());
    }
}
