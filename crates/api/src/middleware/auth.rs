//! Session extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use clearance_core::access::Actor;
use clearance_core::roles::Role;
use clearance_core::types::DbId;
use clearance_db::models::user::User;
use clearance_db::repositories::UserRepo;

use crate::auth::cookie::session_from_headers;
use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user taken from the session token.
///
/// The token is read from the `clearance_session` cookie first, then from an
/// `Authorization: Bearer` header. The token only names the user: role,
/// department and account status come from the current `users` row, so a
/// suspension or reassignment applies to sessions already issued.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, role = %user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub role: Role,
    pub department_id: Option<DbId>,
    pub user: User,
}

impl AuthUser {
    /// The caller as seen by the access predicates.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.user_id,
            role: self.role,
            department_id: self.department_id,
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match session_from_headers(&parts.headers) {
            Some(token) => token,
            None => {
                let header = parts
                    .headers
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| AppError::unauthorized("Not signed in"))?;
                header
                    .strip_prefix("Bearer ")
                    .ok_or_else(|| {
                        AppError::unauthorized(
                            "Invalid Authorization format. Expected: Bearer <token>",
                        )
                    })?
                    .to_string()
            }
        };

        let claims = validate_token(&token, &state.config.jwt)
            .map_err(|_| AppError::unauthorized("Invalid or expired session"))?;

        let user = UserRepo::find_by_id(&state.pool, claims.sub)
            .await?
            .filter(User::is_active)
            .ok_or_else(|| AppError::unauthorized("Session is no longer valid"))?;

        Ok(AuthUser {
            user_id: user.id,
            role: user.role,
            department_id: user.department_id,
            user,
        })
    }
}
