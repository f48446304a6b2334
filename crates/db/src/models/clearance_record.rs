//! Clearance audit record model (append-only, no update DTO).

use clearance_core::clearance::{ClearanceAction, ClearanceStatus};
use clearance_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `clearance_records` table. Immutable once created.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClearanceRecord {
    pub id: DbId,
    #[sqlx(try_from = "String")]
    pub action: ClearanceAction,
    pub actor_id: Option<DbId>,
    pub student_id: DbId,
    pub department_id: Option<DbId>,
    pub document_id: Option<DbId>,
    pub requirement_id: Option<DbId>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

/// DTO for appending a clearance record.
#[derive(Debug, Clone)]
pub struct CreateClearanceRecord {
    pub action: ClearanceAction,
    pub actor_id: Option<DbId>,
    pub student_id: DbId,
    pub department_id: Option<DbId>,
    pub document_id: Option<DbId>,
    pub requirement_id: Option<DbId>,
    pub metadata: serde_json::Value,
}

impl CreateClearanceRecord {
    /// A record with no optional references and empty metadata.
    pub fn new(action: ClearanceAction, actor_id: DbId, student_id: DbId) -> Self {
        Self {
            action,
            actor_id: Some(actor_id),
            student_id,
            department_id: None,
            document_id: None,
            requirement_id: None,
            metadata: serde_json::json!({}),
        }
    }
}

/// Raw approval counts for one student, before percentage math.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct ProgressCounts {
    pub student_id: DbId,
    pub total_requirements: i64,
    pub approved_requirements: i64,
}

/// Students per clearance status.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClearanceStatusCounts {
    pub not_started: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub on_hold: i64,
}

impl ClearanceStatusCounts {
    pub fn add(&mut self, status: ClearanceStatus, count: i64) {
        match status {
            ClearanceStatus::NotStarted => self.not_started += count,
            ClearanceStatus::InProgress => self.in_progress += count,
            ClearanceStatus::Completed => self.completed += count,
            ClearanceStatus::OnHold => self.on_hold += count,
        }
    }

    pub fn total(&self) -> i64 {
        self.not_started + self.in_progress + self.completed + self.on_hold
    }
}
