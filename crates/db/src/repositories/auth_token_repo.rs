//! Repository for single-use auth tokens (welcome and password-reset links).

use chrono::Utc;
use clearance_core::tokens::TokenPurpose;
use clearance_core::types::DbId;
use sqlx::PgPool;

use crate::models::auth_token::AuthToken;

const COLUMNS: &str = "id, user_id, purpose, token_hash, expires_at, used_at, created_at";

pub struct AuthTokenRepo;

impl AuthTokenRepo {
    /// Store a new token hash for `user_id`, retiring any unused token of the
    /// same purpose so only the newest link works.
    pub async fn issue(
        pool: &PgPool,
        user_id: DbId,
        purpose: TokenPurpose,
        token_hash: &str,
    ) -> Result<AuthToken, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE auth_tokens SET used_at = NOW()
             WHERE user_id = $1 AND purpose = $2 AND used_at IS NULL",
        )
        .bind(user_id)
        .bind(purpose.as_str())
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO auth_tokens (user_id, purpose, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let token = sqlx::query_as::<_, AuthToken>(&query)
            .bind(user_id)
            .bind(purpose.as_str())
            .bind(token_hash)
            .bind(Utc::now() + purpose.ttl())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(token)
    }

    /// Find an unused, unexpired token by hash and purpose.
    pub async fn find_valid(
        pool: &PgPool,
        token_hash: &str,
        purpose: TokenPurpose,
    ) -> Result<Option<AuthToken>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM auth_tokens
             WHERE token_hash = $1 AND purpose = $2
               AND used_at IS NULL AND expires_at > NOW()"
        );
        sqlx::query_as::<_, AuthToken>(&query)
            .bind(token_hash)
            .bind(purpose.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Mark a token used. Returns `false` if it was already consumed.
    pub async fn consume<'e, E: sqlx::PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE auth_tokens SET used_at = NOW() WHERE id = $1 AND used_at IS NULL",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
