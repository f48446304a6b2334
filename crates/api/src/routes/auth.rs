//! Route definitions for the `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /login                   -> login
/// POST /logout                  -> logout
/// POST /magic-link              -> send_magic_link
/// POST /magic-link/verify       -> verify_magic_link
/// POST /password-reset          -> send_password_reset
/// POST /password-reset/confirm  -> reset_password
/// GET  /has-set-password        -> has_set_password
/// GET  /session                 -> session (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/magic-link", post(auth::send_magic_link))
        .route("/magic-link/verify", post(auth::verify_magic_link))
        .route("/password-reset", post(auth::send_password_reset))
        .route("/password-reset/confirm", post(auth::reset_password))
        .route("/has-set-password", get(auth::has_set_password))
        .route("/session", get(auth::session))
}
