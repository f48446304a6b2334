//! Shared query parameter types for API handlers.

use clearance_core::error::CoreError;
use clearance_core::pagination::{clamp_limit, Cursor};
use serde::Deserialize;

/// Cursor pagination parameters (`?cursor=&limit=`).
#[derive(Debug, Default, Deserialize)]
pub struct CursorParams {
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

impl CursorParams {
    /// Decoded cursor and clamped limit.
    pub fn resolve(&self) -> Result<(Option<Cursor>, i64), CoreError> {
        resolve_page(self.cursor.as_deref(), self.limit)
    }
}

/// Decode a raw `cursor` / `limit` pair. Handlers whose query structs carry
/// extra filters call this directly: `serde(flatten)` does not work with
/// numeric query values.
pub fn resolve_page(
    cursor: Option<&str>,
    limit: Option<i64>,
) -> Result<(Option<Cursor>, i64), CoreError> {
    Ok((Cursor::parse_opt(cursor)?, clamp_limit(limit)))
}

/// Query parameters for list endpoints that support an `include_inactive` flag.
#[derive(Debug, Deserialize)]
pub struct IncludeInactiveParams {
    #[serde(default)]
    pub include_inactive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_defaults_and_clamps() {
        let params = CursorParams::default();
        assert_eq!(params.resolve().unwrap(), (None, 20));

        let params = CursorParams {
            cursor: None,
            limit: Some(1_000),
        };
        assert_eq!(params.resolve().unwrap().1, 100);
    }

    #[test]
    fn resolve_rejects_garbage_cursor() {
        let params = CursorParams {
            cursor: Some("nope".into()),
            limit: None,
        };
        assert!(params.resolve().is_err());
    }
}
