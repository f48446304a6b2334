//! Handlers for the `/departments` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clearance_core::access::{self, Actor};
use clearance_core::departments::{
    normalize_code, validate_code, validate_max_officers, OfficerCreationPolicy,
};
use clearance_core::error::CoreError;
use clearance_core::roles::Role;
use clearance_core::types::{DbId, Timestamp};
use clearance_db::models::department::{
    CreateDepartment, Department, DepartmentStats, UpdateDepartment,
};
use clearance_db::repositories::{DepartmentRepo, UserRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::IncludeInactiveParams;
use crate::response::{DataResponse, SuccessResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A department as returned by the API.
///
/// Officer-provisioning fields are only present for admins and staff of the
/// department.
#[derive(Debug, Serialize)]
pub struct DepartmentResponse {
    pub id: DbId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub clearance_order: i32,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_officer_creation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_officers: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DepartmentResponse {
    pub fn for_actor(department: Department, actor: &Actor) -> Self {
        let provisioning = access::can_view_department_provisioning(actor, department.id);
        Self {
            id: department.id,
            name: department.name,
            code: department.code,
            description: department.description,
            clearance_order: department.clearance_order,
            is_active: department.is_active,
            allow_officer_creation: provisioning.then_some(department.allow_officer_creation),
            max_officers: if provisioning { department.max_officers } else { None },
            created_at: department.created_at,
            updated_at: department.updated_at,
        }
    }
}

/// Officer-creation policy of one department plus its current usage.
#[derive(Debug, Serialize)]
pub struct OfficerCreationResponse {
    pub department_id: DbId,
    #[serde(flatten)]
    pub policy: OfficerCreationPolicy,
    pub remaining: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CanCreateOfficerResponse {
    pub department_id: Option<DbId>,
    pub allowed: bool,
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /departments`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDepartmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub code: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    pub clearance_order: i32,
    #[serde(default)]
    pub allow_officer_creation: bool,
    pub max_officers: Option<i32>,
}

/// Request body for `PUT /departments/{id}`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDepartmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub code: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub clearance_order: Option<i32>,
    pub is_active: Option<bool>,
    pub allow_officer_creation: Option<bool>,
    pub max_officers: Option<i32>,
    /// Remove the officer cap. Ignored when `max_officers` is also given.
    #[serde(default)]
    pub clear_max_officers: bool,
}

#[derive(Debug, Deserialize)]
pub struct CanCreateOfficerParams {
    pub department_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/departments
///
/// `include_inactive` is honoured for admins only.
pub async fn list_departments(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<DataResponse<Vec<DepartmentResponse>>>> {
    let actor = auth.actor();
    let include_inactive = params.include_inactive && actor.is_admin();
    let departments = DepartmentRepo::list(&state.pool, include_inactive).await?;
    let data = departments
        .into_iter()
        .map(|d| DepartmentResponse::for_actor(d, &actor))
        .collect();
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/departments/{id}
pub async fn get_department(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<DepartmentResponse>>> {
    let department = find_department(&state, id).await?;
    Ok(Json(DataResponse {
        data: DepartmentResponse::for_actor(department, &auth.actor()),
    }))
}

/// POST /api/v1/departments
///
/// A duplicate code is rejected with 409 by `uq_departments_code`.
pub async fn create_department(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateDepartmentRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<DepartmentResponse>>)> {
    input.validate()?;
    let code = normalize_code(&input.code);
    validate_code(&code)?;
    validate_max_officers(input.max_officers)?;

    let department = DepartmentRepo::create(
        &state.pool,
        &CreateDepartment {
            name: input.name.trim().to_string(),
            code,
            description: input.description,
            clearance_order: input.clearance_order,
            allow_officer_creation: input.allow_officer_creation,
            max_officers: input.max_officers,
        },
    )
    .await?;

    tracing::info!(department_id = department.id, code = %department.code, "Department created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: DepartmentResponse::for_actor(department, &admin.actor()),
        }),
    ))
}

/// PUT /api/v1/departments/{id}
pub async fn update_department(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateDepartmentRequest>,
) -> AppResult<Json<DataResponse<DepartmentResponse>>> {
    input.validate()?;
    let code = input.code.as_deref().map(normalize_code);
    if let Some(code) = &code {
        validate_code(code)?;
    }
    validate_max_officers(input.max_officers)?;

    let update = UpdateDepartment {
        name: input.name.map(|n| n.trim().to_string()),
        code,
        description: input.description,
        clearance_order: input.clearance_order,
        is_active: input.is_active,
        allow_officer_creation: input.allow_officer_creation,
        max_officers: input.max_officers,
        clear_max_officers: input.clear_max_officers,
    };
    let department = DepartmentRepo::update(&state.pool, id, &update)
        .await?
        .ok_or_else(|| AppError::not_found("Department", id))?;

    Ok(Json(DataResponse {
        data: DepartmentResponse::for_actor(department, &admin.actor()),
    }))
}

/// DELETE /api/v1/departments/{id}
///
/// Departments still referenced by users or documents must be deactivated
/// instead.
pub async fn delete_department(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SuccessResponse>>> {
    find_department(&state, id).await?;
    if DepartmentRepo::is_referenced(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "Department is still referenced by users or documents; deactivate it instead".into(),
        )));
    }
    DepartmentRepo::delete(&state.pool, id).await?;
    tracing::info!(department_id = id, "Department deleted");
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/v1/departments/{id}/stats
pub async fn get_stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<DepartmentStats>>> {
    if !access::can_view_department_stats(&auth.actor(), id) {
        return Err(AppError::forbidden("You may not view this department's statistics"));
    }
    find_department(&state, id).await?;
    let stats = DepartmentRepo::stats(&state.pool, id).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/departments/{id}/officer-creation
pub async fn get_officer_creation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<OfficerCreationResponse>>> {
    if !access::can_view_department_provisioning(&auth.actor(), id) {
        return Err(AppError::forbidden(
            "You may not view this department's provisioning settings",
        ));
    }
    let department = find_department(&state, id).await?;
    let current = UserRepo::count_officers(&state.pool, id).await?;
    let policy = department.officer_policy(current);
    Ok(Json(DataResponse {
        data: OfficerCreationResponse {
            department_id: id,
            remaining: policy.remaining(),
            policy,
        },
    }))
}

/// GET /api/v1/departments/can-create-officer?department_id=
///
/// Defaults to the caller's own department.
pub async fn can_create_officer(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<CanCreateOfficerParams>,
) -> AppResult<Json<DataResponse<CanCreateOfficerResponse>>> {
    let actor = auth.actor();
    let department_id = params.department_id.or(actor.department_id);

    let allowed = match (actor.role, department_id) {
        (Role::Admin | Role::Officer, Some(dept)) => {
            match DepartmentRepo::find_by_id(&state.pool, dept).await? {
                Some(department) if department.is_active => {
                    let current = UserRepo::count_officers(&state.pool, dept).await?;
                    let policy = department.officer_policy(current);
                    access::can_create_officer(&actor, dept, &policy) && !policy.is_full()
                }
                _ => false,
            }
        }
        (Role::Admin, None) => true,
        _ => false,
    };

    Ok(Json(DataResponse {
        data: CanCreateOfficerResponse {
            department_id,
            allowed,
        },
    }))
}

async fn find_department(state: &AppState, id: DbId) -> AppResult<Department> {
    DepartmentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Department", id))
}
