//! Document entity model and DTOs.

use clearance_core::access::DocumentScope;
use clearance_core::documents::DocumentStatus;
use clearance_core::pagination::Cursor;
use clearance_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `documents` table: one uploaded version.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub id: DbId,
    pub student_id: DbId,
    pub department_id: DbId,
    pub requirement_id: DbId,
    pub file_name: String,
    /// Location inside the upload store; not exposed to clients.
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[sqlx(try_from = "String")]
    pub status: DocumentStatus,
    pub version: i32,
    pub is_latest: bool,
    pub reviewed_by: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub review_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub uploaded_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Document {
    pub fn scope(&self) -> DocumentScope {
        DocumentScope {
            student_id: self.student_id,
            department_id: self.department_id,
        }
    }

    pub fn cursor(&self) -> Cursor {
        Cursor {
            created_at: self.created_at,
            id: self.id,
        }
    }
}

/// DTO for inserting a new document version. The repository assigns
/// `version` and `is_latest`.
#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub student_id: DbId,
    pub department_id: DbId,
    pub requirement_id: DbId,
    pub file_name: String,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
}

/// A review decision applied with compare-and-set on the current status.
#[derive(Debug, Clone)]
pub struct ReviewDocument {
    pub status: DocumentStatus,
    pub reviewed_by: DbId,
    pub review_notes: Option<String>,
    pub rejection_reason: Option<String>,
}

/// Filters for listing documents. `None` fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub student_id: Option<DbId>,
    pub department_id: Option<DbId>,
    pub requirement_id: Option<DbId>,
    pub status: Option<DocumentStatus>,
    /// Only the latest version of each (student, requirement).
    pub latest_only: bool,
}

/// Document counts by status.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct DocumentStats {
    pub total: i64,
    pub pending: i64,
    pub under_review: i64,
    pub approved: i64,
    pub rejected: i64,
}
