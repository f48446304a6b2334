//! Requirement entity model and DTOs.

use clearance_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A requirement row joined with the ids of the departments demanding it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Requirement {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub allowed_file_types: Vec<String>,
    pub max_file_size_mb: i32,
    pub display_order: i32,
    pub is_required: bool,
    pub is_active: bool,
    pub department_ids: Vec<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a requirement.
#[derive(Debug, Clone)]
pub struct CreateRequirement {
    pub name: String,
    pub description: Option<String>,
    pub allowed_file_types: Vec<String>,
    pub max_file_size_mb: i32,
    pub display_order: i32,
    pub is_required: bool,
    pub department_ids: Vec<DbId>,
}

/// DTO for updating a requirement. `department_ids`, when present,
/// replaces the whole link set.
#[derive(Debug, Clone, Default)]
pub struct UpdateRequirement {
    pub name: Option<String>,
    pub description: Option<String>,
    pub allowed_file_types: Option<Vec<String>>,
    pub max_file_size_mb: Option<i32>,
    pub display_order: Option<i32>,
    pub is_required: Option<bool>,
    pub is_active: Option<bool>,
    pub department_ids: Option<Vec<DbId>>,
}
