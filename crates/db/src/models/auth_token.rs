//! One-time auth token model.

use clearance_core::tokens::TokenPurpose;
use clearance_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `auth_tokens` table. Only the hash is stored.
#[derive(Debug, Clone, FromRow)]
pub struct AuthToken {
    pub id: DbId,
    pub user_id: DbId,
    #[sqlx(try_from = "String")]
    pub purpose: TokenPurpose,
    pub token_hash: String,
    pub expires_at: Timestamp,
    pub used_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
