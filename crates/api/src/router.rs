//! The clearance service's HTTP surface.
//!
//! [`build_app_router`] is shared by `main.rs` and the integration tests so
//! both run the same routes behind the same middleware.

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::routes::{auth, clearance, departments, documents, health, requirements, users};
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// `/health` at the root plus the versioned API, wrapped in the middleware
/// stack (outermost first): CORS, request id, tracing, request-id
/// propagation, timeout, panic recovery.
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(PropagateRequestIdLayer::new(request_id))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(CatchPanicLayer::new());

    Router::new()
        .merge(health::router())
        .nest("/api/v1", api_v1(config))
        .layer(middleware)
        .layer(build_cors_layer(config))
        .with_state(state)
}

/// The `/api/v1` tree.
///
/// ```text
/// /auth/login                                  sign in, sets session cookie
/// /auth/logout                                 clear session cookie
/// /auth/magic-link                             send set-password link
/// /auth/magic-link/verify                      set password from link, sign in
/// /auth/password-reset                         send reset link
/// /auth/password-reset/confirm                 set new password
/// /auth/has-set-password                       ?email= (public)
/// /auth/session                                current user
///
/// /users                                       list (staff)
/// /users/stats                                 account counts (admin)
/// /users/me/access                             feature flags for the caller
/// /users/students                              create student
/// /users/students/bulk                         bulk create students
/// /users/officers                              create officer / student-affairs
/// /users/{id}                                  get, update, delete (suspend)
///
/// /departments                                 list, create (admin)
/// /departments/can-create-officer              ?department_id=
/// /departments/{id}                            get, update, delete (admin)
/// /departments/{id}/stats                      department dashboard
/// /departments/{id}/officer-creation           officer provisioning policy
///
/// /requirements                                list, create (admin)
/// /requirements/{id}                           get, update, delete (admin)
///
/// /documents                                   list, upload (multipart)
/// /documents/stats                             counts of latest documents
/// /documents/student/{id}                      a student's documents
/// /documents/department/{id}                   a department's documents
/// /documents/{id}                              get, delete
/// /documents/{id}/review                       review decision
/// /documents/{id}/file                         download stored file
///
/// /clearance/progress                          per-student progress (staff)
/// /clearance/stats                             status counts (staff)
/// /clearance/records                           append manual record
/// /clearance/students/{id}                     progress + requirement breakdown
/// /clearance/students/{id}/status              change status (PUT)
/// /clearance/students/{id}/complete            final clearance (POST)
/// /clearance/students/{id}/timeline            audit history
/// ```
///
/// Only `/documents` accepts bodies sized for uploads; every other group
/// keeps axum's default JSON limit.
fn api_v1(config: &ServerConfig) -> Router<AppState> {
    let documents =
        documents::router().layer(DefaultBodyLimit::max(config.body_limit_bytes()));

    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/departments", departments::router())
        .nest("/requirements", requirements::router())
        .nest("/documents", documents)
        .nest("/clearance", clearance::router())
}

/// CORS for the portal front end. Credentials are allowed so the session
/// cookie crosses origins; an invalid configured origin panics at startup.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
