use std::sync::Arc;

use clearance_notifications::Notifier;

use crate::config::ServerConfig;
use crate::storage::FileStorage;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the pool is reference-counted and everything else is
/// behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: clearance_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Email notifications; sends never fail the request.
    pub notifier: Arc<Notifier>,
    /// Uploaded document bytes.
    pub storage: Arc<dyn FileStorage>,
}
