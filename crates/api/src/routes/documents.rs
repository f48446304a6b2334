//! Route definitions for the `/documents` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::documents;
use crate::state::AppState;

/// Routes mounted at `/documents`.
///
/// ```text
/// GET    /                   -> list_documents
/// POST   /                   -> upload_document (multipart)
/// GET    /stats              -> get_stats
/// GET    /student/{id}       -> list_by_student
/// GET    /department/{id}    -> list_by_department
/// GET    /{id}               -> get_document
/// DELETE /{id}               -> delete_document
/// POST   /{id}/review        -> review_document (staff)
/// GET    /{id}/file          -> download_document
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(documents::list_documents).post(documents::upload_document),
        )
        .route("/stats", get(documents::get_stats))
        .route("/student/{id}", get(documents::list_by_student))
        .route("/department/{id}", get(documents::list_by_department))
        .route(
            "/{id}",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/{id}/review", post(documents::review_document))
        .route("/{id}/file", get(documents::download_document))
}
