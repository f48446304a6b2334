use std::path::PathBuf;

use crate::auth::jwt::JwtConfig;

/// Server-wide upload ceiling in megabytes when `MAX_UPLOAD_MB` is unset.
const DEFAULT_MAX_UPLOAD_MB: i32 = 25;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Public URL of the web app, used to build links in emails.
    pub app_url: String,
    /// Root directory for uploaded documents.
    pub upload_dir: PathBuf,
    /// Largest upload any requirement may allow, in megabytes.
    pub max_upload_mb: i32,
    /// Whether the session cookie carries the `Secure` attribute.
    pub cookie_secure: bool,
    /// JWT session configuration (secret, expiry).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `APP_URL`              | `http://localhost:5173`    |
    /// | `UPLOAD_DIR`           | `storage/uploads`          |
    /// | `MAX_UPLOAD_MB`        | `25`                       |
    /// | `COOKIE_SECURE`        | `false`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let app_url = std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:5173".into());

        let upload_dir = PathBuf::from(
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "storage/uploads".into()),
        );

        let max_upload_mb: i32 = std::env::var("MAX_UPLOAD_MB")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_MB.to_string())
            .parse()
            .expect("MAX_UPLOAD_MB must be a valid i32");
        assert!(max_upload_mb >= 1, "MAX_UPLOAD_MB must be at least 1");

        let cookie_secure = std::env::var("COOKIE_SECURE")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
            .unwrap_or(false);

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            app_url,
            upload_dir,
            max_upload_mb,
            cookie_secure,
            jwt,
        }
    }

    /// Request body limit: the upload ceiling plus room for multipart framing.
    pub fn body_limit_bytes(&self) -> usize {
        let mb = usize::try_from(self.max_upload_mb).unwrap_or(1);
        (mb + 1) * 1024 * 1024
    }
}
