//! Route definitions for the `/clearance` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::clearance;
use crate::state::AppState;

/// Routes mounted at `/clearance`.
///
/// ```text
/// GET  /progress                  -> get_all_clearance_progress (staff)
/// GET  /stats                     -> get_clearance_stats (staff)
/// POST /records                   -> log_clearance_action (staff)
/// GET  /students/{id}             -> get_student_clearance
/// PUT  /students/{id}/status      -> update_clearance_status (staff)
/// POST /students/{id}/complete    -> mark_clearance_completed (staff)
/// GET  /students/{id}/timeline    -> get_clearance_timeline
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/progress", get(clearance::get_all_clearance_progress))
        .route("/stats", get(clearance::get_clearance_stats))
        .route("/records", post(clearance::log_clearance_action))
        .route("/students/{id}", get(clearance::get_student_clearance))
        .route("/students/{id}/status", put(clearance::update_clearance_status))
        .route("/students/{id}/complete", post(clearance::mark_clearance_completed))
        .route("/students/{id}/timeline", get(clearance::get_clearance_timeline))
}
