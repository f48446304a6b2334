//! Handlers for the `/requirements` resource.
//!
//! Reads are open to every signed-in user; writes are admin-only.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clearance_core::documents::{
    validate_allowed_types, validate_max_file_size, ACCEPTED_FILE_TYPES, DEFAULT_MAX_FILE_SIZE_MB,
};
use clearance_core::error::CoreError;
use clearance_core::roles::Role;
use clearance_core::types::DbId;
use clearance_db::models::requirement::{CreateRequirement, Requirement, UpdateRequirement};
use clearance_db::repositories::RequirementRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::{DataResponse, SuccessResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListRequirementsParams {
    pub department_id: Option<DbId>,
    #[serde(default)]
    pub include_inactive: bool,
}

/// Request body for `POST /requirements`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequirementRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    /// Defaults to every accepted type.
    pub allowed_file_types: Option<Vec<String>>,
    pub max_file_size_mb: Option<i32>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_required: bool,
    #[validate(length(min = 1))]
    pub department_ids: Vec<DbId>,
}

/// Request body for `PUT /requirements/{id}`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRequirementRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub allowed_file_types: Option<Vec<String>>,
    pub max_file_size_mb: Option<i32>,
    pub display_order: Option<i32>,
    pub is_required: Option<bool>,
    pub is_active: Option<bool>,
    #[validate(length(min = 1))]
    pub department_ids: Option<Vec<DbId>>,
}

fn default_true() -> bool {
    true
}

/// GET /api/v1/requirements
///
/// Students without a `department_id` filter see their own department's list.
pub async fn list_requirements(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListRequirementsParams>,
) -> AppResult<Json<DataResponse<Vec<Requirement>>>> {
    let department_id = match auth.role {
        Role::Student => params.department_id.or(auth.department_id),
        _ => params.department_id,
    };
    let include_inactive = params.include_inactive && auth.role == Role::Admin;
    let requirements = RequirementRepo::list(&state.pool, department_id, include_inactive).await?;
    Ok(Json(DataResponse { data: requirements }))
}

/// GET /api/v1/requirements/{id}
pub async fn get_requirement(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Requirement>>> {
    let requirement = RequirementRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Requirement", id))?;
    Ok(Json(DataResponse { data: requirement }))
}

/// POST /api/v1/requirements
pub async fn create_requirement(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CreateRequirementRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Requirement>>)> {
    input.validate()?;

    let allowed_file_types = match input.allowed_file_types {
        Some(types) => normalize_types(types),
        None => ACCEPTED_FILE_TYPES.iter().map(|t| t.to_string()).collect(),
    };
    validate_allowed_types(&allowed_file_types)?;

    let max_file_size_mb = input.max_file_size_mb.unwrap_or(DEFAULT_MAX_FILE_SIZE_MB);
    validate_max_file_size(max_file_size_mb, state.config.max_upload_mb)?;

    let requirement = RequirementRepo::create(
        &state.pool,
        &CreateRequirement {
            name: input.name.trim().to_string(),
            description: input.description,
            allowed_file_types,
            max_file_size_mb,
            display_order: input.display_order,
            is_required: input.is_required,
            department_ids: dedup_ids(input.department_ids),
        },
    )
    .await?;

    tracing::info!(requirement_id = requirement.id, "Requirement created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: requirement })))
}

/// PUT /api/v1/requirements/{id}
pub async fn update_requirement(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateRequirementRequest>,
) -> AppResult<Json<DataResponse<Requirement>>> {
    input.validate()?;

    let allowed_file_types = input.allowed_file_types.map(normalize_types);
    if let Some(types) = &allowed_file_types {
        validate_allowed_types(types)?;
    }
    if let Some(max) = input.max_file_size_mb {
        validate_max_file_size(max, state.config.max_upload_mb)?;
    }

    let update = UpdateRequirement {
        name: input.name.map(|n| n.trim().to_string()),
        description: input.description,
        allowed_file_types,
        max_file_size_mb: input.max_file_size_mb,
        display_order: input.display_order,
        is_required: input.is_required,
        is_active: input.is_active,
        department_ids: input.department_ids.map(dedup_ids),
    };
    let requirement = RequirementRepo::update(&state.pool, id, &update)
        .await?
        .ok_or_else(|| AppError::not_found("Requirement", id))?;
    Ok(Json(DataResponse { data: requirement }))
}

/// DELETE /api/v1/requirements/{id}
///
/// Requirements with uploaded documents must be deactivated instead.
pub async fn delete_requirement(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SuccessResponse>>> {
    if RequirementRepo::has_documents(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "Requirement has uploaded documents; deactivate it instead".into(),
        )));
    }
    if !RequirementRepo::delete(&state.pool, id).await? {
        return Err(AppError::not_found("Requirement", id));
    }
    tracing::info!(requirement_id = id, "Requirement deleted");
    Ok(Json(SuccessResponse::ok()))
}

/// Lowercase, strip leading dots and de-duplicate file types.
fn normalize_types(types: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(types.len());
    for t in types {
        let t = t.trim().trim_start_matches('.').to_ascii_lowercase();
        if !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

fn dedup_ids(mut ids: Vec<DbId>) -> Vec<DbId> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_types_lowercases_and_dedups() {
        let types = vec![".PDF".to_string(), "pdf".to_string(), " Docx ".to_string()];
        assert_eq!(normalize_types(types), vec!["pdf", "docx"]);
    }

    #[test]
    fn dedup_ids_sorts() {
        assert_eq!(dedup_ids(vec![3, 1, 3, 2]), vec![1, 2, 3]);
    }
}
