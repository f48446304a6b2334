//! Handlers for the `/users` resource.
//!
//! Provisioning (single, bulk and officer creation) issues a welcome token
//! and emails the set-password link. Deleting a user suspends the account.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clearance_core::access::{self, Actor, ListScope};
use clearance_core::clearance::ClearanceStatus;
use clearance_core::error::CoreError;
use clearance_core::pagination::Page;
use clearance_core::roles::Role;
use clearance_core::tokens::{generate_token, TokenPurpose};
use clearance_core::types::{DbId, Timestamp};
use clearance_core::users::{
    normalize_email, validate_name, validate_role_fields, AccountStatus, MAX_BULK_STUDENTS,
};
use clearance_db::models::user::{CreateUser, UpdateUser, User, UserFilter, UserStats};
use clearance_db::repositories::{AuthTokenRepo, DepartmentRepo, UserRepo};
use clearance_notifications::Recipient;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::resolve_page;
use crate::response::{DataResponse, SuccessResponse};
use crate::state::AppState;

const MAX_PHONE_LEN: usize = 30;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A user as returned by the API. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub department_id: Option<DbId>,
    pub matric_number: Option<String>,
    pub phone: Option<String>,
    pub status: AccountStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clearance_status: Option<ClearanceStatus>,
    /// Only visible to admins and the user themself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_set_password: Option<bool>,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserResponse {
    /// Project a user row for `actor`, hiding fields they may not see.
    pub fn for_actor(user: User, actor: &Actor) -> Self {
        let show_password_fields = access::can_view_password_fields(actor, user.id);
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            department_id: user.department_id,
            matric_number: user.matric_number,
            phone: user.phone,
            status: user.status,
            clearance_status: (user.role == Role::Student).then_some(user.clearance_status),
            has_set_password: show_password_fields.then_some(user.has_set_password),
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Feature flags for the signed-in user's UI.
#[derive(Debug, Serialize)]
pub struct FeatureAccess {
    pub role: Role,
    pub can_upload_documents: bool,
    pub can_review_documents: bool,
    pub can_list_users: bool,
    pub can_create_students: bool,
    pub can_create_officers: bool,
    pub can_manage_departments: bool,
    pub can_manage_requirements: bool,
    pub can_view_user_stats: bool,
}

/// Outcome of a bulk student import.
#[derive(Debug, Serialize)]
pub struct BulkCreateResult {
    pub created: Vec<UserResponse>,
    pub failed: Vec<BulkFailure>,
}

#[derive(Debug, Serialize)]
pub struct BulkFailure {
    /// Position in the submitted list.
    pub index: usize,
    pub email: String,
    pub error: String,
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListUsersParams {
    pub role: Option<Role>,
    pub department_id: Option<DbId>,
    pub status: Option<AccountStatus>,
    pub search: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

/// Request body for `POST /users/students`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub department_id: DbId,
    pub matric_number: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

/// Request body for `POST /users/officers`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOfficerRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub department_id: DbId,
    /// `officer` (default) or `student-affairs`; the latter is admin-only.
    pub role: Option<Role>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

/// Request body for `POST /users/students/bulk`.
#[derive(Debug, Deserialize)]
pub struct BulkCreateStudentsRequest {
    pub students: Vec<CreateStudentRequest>,
}

/// Request body for `PUT /users/{id}`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    /// `null` clears the phone number.
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "nullable")]
    pub department_id: Option<Option<DbId>>,
    #[serde(default, deserialize_with = "nullable")]
    pub matric_number: Option<Option<String>>,
    pub status: Option<AccountStatus>,
}

/// Tells an absent field (`None`) apart from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateUserRequest {
    fn touches_privileged_fields(&self) -> bool {
        self.role.is_some()
            || self.department_id.is_some()
            || self.matric_number.is_some()
            || self.status.is_some()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/users
///
/// Staff see students of their department; admins see everyone.
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListUsersParams>,
) -> AppResult<Json<DataResponse<Page<UserResponse>>>> {
    let actor = auth.actor();
    if !access::can_list_users(&actor) {
        return Err(AppError::forbidden("Listing users requires a staff role"));
    }
    let (cursor, limit) = resolve_page(params.cursor.as_deref(), params.limit)?;

    let mut filter = UserFilter {
        role: params.role,
        department_id: params.department_id,
        status: params.status,
        search: params.search.filter(|s| !s.trim().is_empty()),
    };
    match actor.list_scope() {
        ListScope::All => {}
        ListScope::Department(dept) => {
            filter.department_id = Some(dept);
            filter.role = Some(Role::Student);
        }
        ListScope::Student(_) | ListScope::Nothing => {
            return Ok(Json(DataResponse {
                data: Page {
                    items: Vec::new(),
                    next_cursor: None,
                },
            }));
        }
    }

    let rows = UserRepo::list(&state.pool, &filter, cursor, limit).await?;
    let page = Page::from_rows(rows, limit, User::cursor)
        .map(|user| UserResponse::for_actor(user, &actor));
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let actor = auth.actor();
    let user = find_user(&state, id).await?;
    if !access::can_view_user(&actor, &user.scope()) {
        return Err(AppError::forbidden("You may not view this user"));
    }
    Ok(Json(DataResponse {
        data: UserResponse::for_actor(user, &actor),
    }))
}

/// POST /api/v1/users/students
pub async fn create_student(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateStudentRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    let actor = auth.actor();
    if !access::can_create_student(&actor, input.department_id) {
        return Err(AppError::forbidden(
            "You may not create students in this department",
        ));
    }
    input.validate()?;
    ensure_active_department(&state, input.department_id).await?;

    let user = provision_student(&state, &actor, &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::for_actor(user, &actor),
        }),
    ))
}

/// POST /api/v1/users/students/bulk
///
/// Each student is created independently; failures are reported per row
/// and do not stop the rest of the batch.
pub async fn bulk_create_students(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<BulkCreateStudentsRequest>,
) -> AppResult<Json<DataResponse<BulkCreateResult>>> {
    let actor = auth.actor();
    if !matches!(actor.role, Role::Admin | Role::StudentAffairs) {
        return Err(AppError::forbidden("Bulk import requires student-affairs or admin"));
    }
    if input.students.is_empty() {
        return Err(AppError::validation("At least one student is required"));
    }
    if input.students.len() > MAX_BULK_STUDENTS {
        return Err(AppError::validation(format!(
            "At most {MAX_BULK_STUDENTS} students may be imported at once"
        )));
    }

    let mut created = Vec::new();
    let mut failed = Vec::new();

    for (index, student) in input.students.into_iter().enumerate() {
        let result = async {
            if !access::can_create_student(&actor, student.department_id) {
                return Err(AppError::forbidden(
                    "You may not create students in this department",
                ));
            }
            student.validate()?;
            ensure_active_department(&state, student.department_id).await?;
            provision_student(&state, &actor, &student).await
        }
        .await;

        match result {
            Ok(user) => created.push(UserResponse::for_actor(user, &actor)),
            Err(err) => failed.push(BulkFailure {
                index,
                email: student.email,
                error: bulk_error_message(&err),
            }),
        }
    }

    tracing::info!(
        actor_id = actor.id,
        created = created.len(),
        failed = failed.len(),
        "Bulk student import finished"
    );
    Ok(Json(DataResponse {
        data: BulkCreateResult { created, failed },
    }))
}

/// POST /api/v1/users/officers
///
/// Admins create officers anywhere. An officer may create a colleague when
/// the department allows it and its cap is not reached; the cap is checked
/// under a row lock on the department.
pub async fn create_officer(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateOfficerRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    let actor = auth.actor();
    if !matches!(actor.role, Role::Admin | Role::Officer) {
        return Err(AppError::forbidden("You may not create officers"));
    }
    let role = input.role.unwrap_or(Role::Officer);
    match role {
        Role::Officer => {}
        Role::StudentAffairs if actor.is_admin() => {}
        _ => {
            return Err(AppError::validation(
                "role must be 'officer' or, for admins, 'student-affairs'",
            ))
        }
    }
    input.validate()?;
    validate_name("first_name", &input.first_name)?;
    validate_name("last_name", &input.last_name)?;

    let mut tx = state.pool.begin().await?;

    let department = DepartmentRepo::find_for_update(&mut *tx, input.department_id)
        .await?
        .ok_or_else(|| AppError::not_found("Department", input.department_id))?;
    if !department.is_active {
        return Err(AppError::Core(CoreError::BadRequest(
            "Department is inactive".into(),
        )));
    }

    let current = UserRepo::count_officers(&mut *tx, department.id).await?;
    let policy = department.officer_policy(current);
    if !access::can_create_officer(&actor, department.id, &policy) {
        return Err(AppError::forbidden(
            "Officer creation is not allowed for this department",
        ));
    }
    if role == Role::Officer && policy.is_full() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Department already has its maximum of {} officers",
            department.max_officers.unwrap_or_default()
        ))));
    }

    let user = UserRepo::create(
        &mut *tx,
        &CreateUser {
            email: normalize_email(&input.email),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            role,
            department_id: Some(department.id),
            matric_number: None,
            phone: input.phone,
            created_by: Some(actor.id),
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(user_id = user.id, department_id = department.id, actor_id = actor.id, "Officer created");

    let token = issue_welcome_token(&state, user.id).await?;
    state
        .notifier
        .officer_welcome(recipient(&user), &department.name, &token)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::for_actor(user, &actor),
        }),
    ))
}

/// PUT /api/v1/users/{id}
///
/// Users edit their own profile fields; role, department, matriculation
/// number and status are admin-only.
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUserRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let actor = auth.actor();
    let existing = find_user(&state, id).await?;

    if !access::can_update_profile(&actor, &existing.scope()) {
        return Err(AppError::forbidden("You may not update this user"));
    }
    if input.touches_privileged_fields() && !access::can_update_privileged_fields(&actor) {
        return Err(AppError::forbidden(
            "Only admins may change role, department, matriculation number or status",
        ));
    }
    if input.status == Some(AccountStatus::Suspended) && actor.id == id {
        return Err(AppError::Core(CoreError::BadRequest(
            "You cannot suspend your own account".into(),
        )));
    }
    input.validate()?;

    if let Some(Some(phone)) = &input.phone {
        if phone.chars().count() > MAX_PHONE_LEN {
            return Err(AppError::validation(format!(
                "phone must be at most {MAX_PHONE_LEN} characters"
            )));
        }
    }

    // Validate the role-dependent fields as they will be after the update.
    let role = input.role.unwrap_or(existing.role);
    let department_id = input.department_id.unwrap_or(existing.department_id);
    let matric_number = match input.matric_number {
        Some(value) => value.map(|m| m.trim().to_string()),
        None if role == Role::Student => existing.matric_number.clone(),
        // Leaving the student role drops the matriculation number.
        None => None,
    };
    validate_role_fields(role, department_id, matric_number.as_deref())?;
    if let Some(Some(dept)) = input.department_id {
        ensure_active_department(&state, dept).await?;
    }

    let update = UpdateUser {
        first_name: input.first_name.map(|s| s.trim().to_string()),
        last_name: input.last_name.map(|s| s.trim().to_string()),
        phone: input
            .phone
            .map(|p| p.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())),
        role: input.role,
        department_id: input.department_id,
        matric_number: (matric_number != existing.matric_number).then_some(matric_number),
        status: input.status,
    };
    let user = UserRepo::update(&state.pool, id, &update)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))?;

    Ok(Json(DataResponse {
        data: UserResponse::for_actor(user, &actor),
    }))
}

/// DELETE /api/v1/users/{id}
///
/// Suspends the account; users are never removed.
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SuccessResponse>>> {
    let actor = auth.actor();
    let user = find_user(&state, id).await?;
    if !access::can_delete_user(&actor, &user.scope()) {
        return Err(AppError::forbidden("You may not delete this user"));
    }
    UserRepo::suspend(&state.pool, id).await?;
    tracing::info!(user_id = id, actor_id = actor.id, "User suspended");
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/v1/users/stats
pub async fn get_stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<UserStats>>> {
    let stats = UserRepo::stats(&state.pool).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/users/me/access
pub async fn can_access_features(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<FeatureAccess>>> {
    let actor = auth.actor();

    let can_create_officers = match (actor.role, actor.department_id) {
        (Role::Admin, _) => true,
        (Role::Officer, Some(dept)) => match DepartmentRepo::find_by_id(&state.pool, dept).await? {
            Some(department) => {
                let current = UserRepo::count_officers(&state.pool, dept).await?;
                access::can_create_officer(&actor, dept, &department.officer_policy(current))
            }
            None => false,
        },
        _ => false,
    };

    Ok(Json(DataResponse {
        data: FeatureAccess {
            role: actor.role,
            can_upload_documents: actor.role == Role::Student,
            can_review_documents: actor.role != Role::Student,
            can_list_users: access::can_list_users(&actor),
            can_create_students: actor
                .department_id
                .map_or(actor.is_admin(), |dept| access::can_create_student(&actor, dept)),
            can_create_officers,
            can_manage_departments: access::can_manage_departments(&actor),
            can_manage_requirements: access::can_manage_requirements(&actor),
            can_view_user_stats: access::can_view_user_stats(&actor),
        },
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) async fn find_user(state: &AppState, id: DbId) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("User", id))
}

pub(crate) fn recipient(user: &User) -> Recipient<'_> {
    Recipient {
        email: &user.email,
        first_name: &user.first_name,
    }
}

async fn ensure_active_department(state: &AppState, id: DbId) -> AppResult<()> {
    let department = DepartmentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Department", id))?;
    if !department.is_active {
        return Err(AppError::Core(CoreError::BadRequest(
            "Department is inactive".into(),
        )));
    }
    Ok(())
}

/// Create one student account and send the welcome email.
async fn provision_student(
    state: &AppState,
    actor: &Actor,
    input: &CreateStudentRequest,
) -> AppResult<User> {
    validate_name("first_name", &input.first_name)?;
    validate_name("last_name", &input.last_name)?;
    let matric = input.matric_number.trim().to_string();
    validate_role_fields(Role::Student, Some(input.department_id), Some(&matric))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email: normalize_email(&input.email),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            role: Role::Student,
            department_id: Some(input.department_id),
            matric_number: Some(matric),
            phone: input.phone.clone(),
            created_by: Some(actor.id),
        },
    )
    .await?;
    tracing::info!(user_id = user.id, actor_id = actor.id, "Student created");

    let token = issue_welcome_token(state, user.id).await?;
    state.notifier.welcome(recipient(&user), &token).await;
    Ok(user)
}

/// Store a fresh welcome token and return its plaintext for the email.
pub(crate) async fn issue_welcome_token(state: &AppState, user_id: DbId) -> AppResult<String> {
    let token = generate_token();
    AuthTokenRepo::issue(&state.pool, user_id, TokenPurpose::Welcome, &token.hash).await?;
    Ok(token.plaintext)
}

/// Client-facing message for one failed bulk row.
fn bulk_error_message(err: &AppError) -> String {
    match err {
        AppError::Core(core) => match core {
            CoreError::Validation(msg)
            | CoreError::BadRequest(msg)
            | CoreError::Conflict(msg)
            | CoreError::Forbidden(msg) => msg.clone(),
            CoreError::NotFound { entity, id } => format!("{entity} with id {id} not found"),
            _ => "Could not create student".to_string(),
        },
        AppError::Database(sqlx::Error::Database(db_err))
            if db_err.code().as_deref() == Some("23505") =>
        {
            "Email or matriculation number already exists".to_string()
        }
        AppError::BadRequest(msg) => msg.clone(),
        other => {
            tracing::error!(error = %other, "Bulk student row failed");
            "Could not create student".to_string()
        }
    }
}
