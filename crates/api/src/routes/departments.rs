//! Route definitions for the `/departments` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::departments;
use crate::state::AppState;

/// Routes mounted at `/departments`.
///
/// ```text
/// GET    /                         -> list_departments
/// POST   /                         -> create_department (admin)
/// GET    /can-create-officer       -> can_create_officer
/// GET    /{id}                     -> get_department
/// PUT    /{id}                     -> update_department (admin)
/// DELETE /{id}                     -> delete_department (admin)
/// GET    /{id}/stats               -> get_stats
/// GET    /{id}/officer-creation    -> get_officer_creation
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(departments::list_departments).post(departments::create_department),
        )
        .route("/can-create-officer", get(departments::can_create_officer))
        .route(
            "/{id}",
            get(departments::get_department)
                .put(departments::update_department)
                .delete(departments::delete_department),
        )
        .route("/{id}/stats", get(departments::get_stats))
        .route("/{id}/officer-creation", get(departments::get_officer_creation))
}
