//! Department entity model and DTOs.

use clearance_core::departments::OfficerCreationPolicy;
use clearance_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `departments` table.
#[derive(Debug, Clone, FromRow)]
pub struct Department {
    pub id: DbId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub clearance_order: i32,
    pub is_active: bool,
    pub allow_officer_creation: bool,
    pub max_officers: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Department {
    pub fn officer_policy(&self, current_officers: i64) -> OfficerCreationPolicy {
        OfficerCreationPolicy {
            enabled: self.allow_officer_creation,
            max_officers: self.max_officers,
            current_officers,
        }
    }
}

/// DTO for creating a department. `code` must already be normalised.
#[derive(Debug, Clone)]
pub struct CreateDepartment {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub clearance_order: i32,
    pub allow_officer_creation: bool,
    pub max_officers: Option<i32>,
}

/// DTO for updating a department. All fields are optional.
#[derive(Debug, Clone, Default)]
pub struct UpdateDepartment {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub clearance_order: Option<i32>,
    pub is_active: Option<bool>,
    pub allow_officer_creation: Option<bool>,
    pub max_officers: Option<i32>,
    /// Reset `max_officers` to NULL. Ignored when `max_officers` is set.
    pub clear_max_officers: bool,
}

/// Per-department counters.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct DepartmentStats {
    pub students: i64,
    pub officers: i64,
    pub active_requirements: i64,
    pub pending_documents: i64,
    pub under_review_documents: i64,
    pub approved_documents: i64,
    pub rejected_documents: i64,
    pub cleared_students: i64,
}
