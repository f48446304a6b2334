//! Route definitions for the `/users` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET    /                -> list_users
/// GET    /stats           -> get_stats (admin)
/// GET    /me/access       -> can_access_features
/// POST   /students        -> create_student
/// POST   /students/bulk   -> bulk_create_students
/// POST   /officers        -> create_officer
/// GET    /{id}            -> get_user
/// PUT    /{id}            -> update_user
/// DELETE /{id}            -> delete_user
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users))
        .route("/stats", get(users::get_stats))
        .route("/me/access", get(users::can_access_features))
        .route("/students", post(users::create_student))
        .route("/students/bulk", post(users::bulk_create_students))
        .route("/officers", post(users::create_officer))
        .route(
            "/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
}
