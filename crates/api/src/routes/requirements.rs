//! Route definitions for the `/requirements` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::requirements;
use crate::state::AppState;

/// Routes mounted at `/requirements`.
///
/// ```text
/// GET    /       -> list_requirements
/// POST   /       -> create_requirement (admin)
/// GET    /{id}   -> get_requirement
/// PUT    /{id}   -> update_requirement (admin)
/// DELETE /{id}   -> delete_requirement (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(requirements::list_requirements).post(requirements::create_requirement),
        )
        .route(
            "/{id}",
            get(requirements::get_requirement)
                .put(requirements::update_requirement)
                .delete(requirements::delete_requirement),
        )
}
