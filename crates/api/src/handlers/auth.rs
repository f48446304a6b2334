//! Handlers for the `/auth` resource.
//!
//! Login issues a JWT session in an HTTP-only cookie (and echoes the token
//! for non-browser clients). Magic links and password resets are single-use
//! tokens whose SHA-256 hash is stored in `auth_tokens`.

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use clearance_core::tokens::{generate_token, hash_token, TokenPurpose};
use clearance_core::users::normalize_email;
use clearance_db::models::user::User;
use clearance_db::repositories::{AuthTokenRepo, UserRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::cookie::{clear_session_cookie, session_cookie};
use crate::auth::jwt::generate_session_token;
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::handlers::users::{recipient, UserResponse};
use crate::middleware::auth::AuthUser;
use crate::response::{DataResponse, SuccessResponse};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_LINK: &str = "This link is invalid or has expired";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/magic-link` and `POST /auth/password-reset`.
#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email)]
    pub email: String,
}

/// Request body for redeeming a magic link or reset token.
#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct HasSetPasswordParams {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct HasSetPasswordResponse {
    pub has_set_password: bool,
}

/// Successful sign-in.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserResponse,
    /// The session token, also set as the `clearance_session` cookie.
    pub token: String,
    /// Session lifetime in seconds.
    pub expires_in: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Accounts that have not set a password are refused with 403, except admins.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let user = UserRepo::find_by_email(&state.pool, &normalize_email(&input.email))
        .await?
        .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

    if !user.is_active() {
        return Err(AppError::forbidden("Account is suspended"));
    }

    if !user.has_set_password && !user.role.may_login_without_password_setup() {
        return Err(AppError::forbidden(
            "Password not set. Use the link in your welcome email to set one",
        ));
    }

    let hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;
    let valid = verify_password(&input.password, hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !valid {
        tracing::debug!(user_id = user.id, "Login failed: wrong password");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    UserRepo::record_login(&state.pool, user.id).await?;
    tracing::info!(user_id = user.id, role = %user.role, "User signed in");

    start_session(&state, user)
}

/// POST /api/v1/auth/logout
///
/// Clears the session cookie. Safe to call without a session.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, clear_session_cookie(state.config.cookie_secure))]),
        Json(SuccessResponse::ok()),
    )
}

/// POST /api/v1/auth/magic-link
///
/// Re-sends the welcome link to an active account that has not set a
/// password. Always answers success so callers cannot enumerate accounts.
pub async fn send_magic_link(
    State(state): State<AppState>,
    Json(input): Json<EmailRequest>,
) -> AppResult<Json<DataResponse<SuccessResponse>>> {
    input.validate()?;

    if let Some(user) = UserRepo::find_by_email(&state.pool, &normalize_email(&input.email)).await? {
        if user.is_active() && !user.has_set_password {
            let token = generate_token();
            AuthTokenRepo::issue(&state.pool, user.id, TokenPurpose::Welcome, &token.hash).await?;
            state.notifier.welcome(recipient(&user), &token.plaintext).await;
            tracing::info!(user_id = user.id, "Magic link issued");
        }
    }

    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/v1/auth/magic-link/verify
///
/// Redeems a welcome token: sets the first password and signs the user in.
pub async fn verify_magic_link(
    State(state): State<AppState>,
    Json(input): Json<SetPasswordRequest>,
) -> AppResult<impl IntoResponse> {
    let user = redeem_token(&state, TokenPurpose::Welcome, &input).await?;
    tracing::info!(user_id = user.id, "Password set from magic link");
    UserRepo::record_login(&state.pool, user.id).await?;
    start_session(&state, user)
}

/// POST /api/v1/auth/password-reset
///
/// Emails a one-hour reset link to an active account. Always answers success.
pub async fn send_password_reset(
    State(state): State<AppState>,
    Json(input): Json<EmailRequest>,
) -> AppResult<Json<DataResponse<SuccessResponse>>> {
    input.validate()?;

    if let Some(user) = UserRepo::find_by_email(&state.pool, &normalize_email(&input.email)).await? {
        if user.is_active() {
            let token = generate_token();
            AuthTokenRepo::issue(&state.pool, user.id, TokenPurpose::PasswordReset, &token.hash)
                .await?;
            state
                .notifier
                .password_reset(recipient(&user), &token.plaintext)
                .await;
            tracing::info!(user_id = user.id, "Password reset issued");
        }
    }

    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/v1/auth/password-reset/confirm
pub async fn reset_password(
    State(state): State<AppState>,
    Json(input): Json<SetPasswordRequest>,
) -> AppResult<Json<DataResponse<SuccessResponse>>> {
    let user = redeem_token(&state, TokenPurpose::PasswordReset, &input).await?;
    tracing::info!(user_id = user.id, "Password reset completed");
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/v1/auth/has-set-password?email=
///
/// Unknown addresses answer `false`.
pub async fn has_set_password(
    State(state): State<AppState>,
    Query(params): Query<HasSetPasswordParams>,
) -> AppResult<Json<DataResponse<HasSetPasswordResponse>>> {
    let has_set_password = UserRepo::find_by_email(&state.pool, &normalize_email(&params.email))
        .await?
        .is_some_and(|user| user.has_set_password);
    Ok(Json(DataResponse {
        data: HasSetPasswordResponse { has_set_password },
    }))
}

/// GET /api/v1/auth/session
///
/// The signed-in user, re-read from the database.
pub async fn session(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let actor = auth.actor();
    Ok(Json(DataResponse {
        data: UserResponse::for_actor(auth.user, &actor),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Sign `user` in: mint a session token and set the cookie.
fn start_session(
    state: &AppState,
    user: User,
) -> AppResult<(HeaderMap, Json<DataResponse<SessionResponse>>)> {
    let actor = user.actor();
    let token = generate_session_token(&actor, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    let expires_in = state.config.jwt.session_expiry_secs();

    let mut headers = HeaderMap::new();
    let cookie = session_cookie(&token, expires_in, state.config.cookie_secure);
    headers.insert(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| AppError::InternalError("Invalid session cookie".into()))?,
    );

    Ok((
        headers,
        Json(DataResponse {
            data: SessionResponse {
                user: UserResponse::for_actor(user, &actor),
                token,
                expires_in,
            },
        }),
    ))
}

/// Validate a token of `purpose`, store the new password and consume the
/// token in one transaction.
async fn redeem_token(
    state: &AppState,
    purpose: TokenPurpose,
    input: &SetPasswordRequest,
) -> AppResult<User> {
    validate_password_strength(&input.password).map_err(AppError::validation)?;

    let stored = AuthTokenRepo::find_valid(&state.pool, &hash_token(input.token.trim()), purpose)
        .await?
        .ok_or_else(|| AppError::BadRequest(INVALID_LINK.into()))?;

    let user = UserRepo::find_by_id(&state.pool, stored.user_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(INVALID_LINK.into()))?;
    if !user.is_active() {
        return Err(AppError::forbidden("Account is suspended"));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let mut tx = state.pool.begin().await?;
    if !AuthTokenRepo::consume(&mut *tx, stored.id).await? {
        return Err(AppError::BadRequest(INVALID_LINK.into()));
    }
    UserRepo::set_password(&mut *tx, user.id, &password_hash).await?;
    tx.commit().await?;

    Ok(User {
        has_set_password: true,
        ..user
    })
}
