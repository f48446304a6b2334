//! Keyset pagination over `(created_at DESC, id DESC)`.
//!
//! Cursors are opaque strings of the form `<created_at micros>_<id>`.
//! Repositories fetch `limit + 1` rows and [`Page::from_rows`] trims the
//! overflow row into `next_cursor`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Default page size.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Maximum page size.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Clamp a user-provided page size into `[1, MAX_PAGE_LIMIT]`.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
}

/// Position after the last row of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: Timestamp,
    pub id: DbId,
}

impl Cursor {
    pub fn encode(&self) -> String {
        format!("{}_{}", self.created_at.timestamp_micros(), self.id)
    }

    pub fn decode(raw: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::Validation(format!("Invalid cursor '{raw}'"));

        let (micros, id) = raw.split_once('_').ok_or_else(invalid)?;
        let micros: i64 = micros.parse().map_err(|_| invalid())?;
        let id: DbId = id.parse().map_err(|_| invalid())?;
        let created_at: DateTime<Utc> = DateTime::from_timestamp_micros(micros).ok_or_else(invalid)?;

        Ok(Self { created_at, id })
    }

    /// Decode an optional query-string cursor.
    pub fn parse_opt(raw: Option<&str>) -> Result<Option<Self>, CoreError> {
        raw.filter(|s| !s.is_empty()).map(Self::decode).transpose()
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Build a page from rows fetched with `LIMIT limit + 1`.
    pub fn from_rows(mut rows: Vec<T>, limit: i64, cursor_of: impl Fn(&T) -> Cursor) -> Self {
        let limit = usize::try_from(limit).unwrap_or(0);
        let next_cursor = if rows.len() > limit {
            rows.truncate(limit);
            rows.last().map(|last| cursor_of(last).encode())
        } else {
            None
        };
        Self {
            items: rows,
            next_cursor,
        }
    }

    /// Transform the items while keeping the cursor.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}
