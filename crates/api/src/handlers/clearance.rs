//! Handlers for the `/clearance` resource.
//!
//! Progress is always computed from approved latest documents against the
//! student's department requirements; `users.clearance_status` is only the
//! recorded workflow state.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clearance_core::access::{self, Actor, ListScope};
use clearance_core::clearance::{ClearanceAction, ClearanceProgress, ClearanceStatus};
use clearance_core::documents::DocumentStatus;
use clearance_core::error::CoreError;
use clearance_core::pagination::Page;
use clearance_core::roles::Role;
use clearance_core::types::{DbId, Timestamp};
use clearance_db::models::clearance_record::{
    ClearanceRecord, ClearanceStatusCounts, CreateClearanceRecord,
};
use clearance_db::models::user::{User, UserFilter};
use clearance_db::repositories::{
    ClearanceRecordRepo, DocumentRepo, RequirementRepo, UserRepo,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::handlers::users::{find_user, recipient, UserResponse};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireStaff;
use crate::query::resolve_page;
use crate::response::DataResponse;
use crate::state::AppState;

const MAX_NOTE_LENGTH: usize = 2000;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Latest submission state of one requirement for a student.
#[derive(Debug, Serialize)]
pub struct RequirementProgress {
    pub requirement_id: DbId,
    pub name: String,
    pub is_required: bool,
    pub document_id: Option<DbId>,
    pub document_status: Option<DocumentStatus>,
    pub version: Option<i32>,
    pub uploaded_at: Option<Timestamp>,
}

#[derive(Debug, Serialize)]
pub struct StudentClearance {
    pub student: UserResponse,
    pub clearance_status: ClearanceStatus,
    pub progress: ClearanceProgress,
    pub requirements: Vec<RequirementProgress>,
}

/// One row of the staff progress listing.
#[derive(Debug, Serialize)]
pub struct StudentProgress {
    pub student: UserResponse,
    pub clearance_status: ClearanceStatus,
    pub progress: ClearanceProgress,
}

#[derive(Debug, Serialize)]
pub struct ClearanceStats {
    pub total_students: i64,
    pub by_status: ClearanceStatusCounts,
    pub average_completion_rate: f64,
    pub fully_approved_students: i64,
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ProgressParams {
    pub department_id: Option<DbId>,
    pub search: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClearanceStatusRequest {
    pub status: ClearanceStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub department_id: Option<DbId>,
}

/// Body for `POST /clearance/records`.
#[derive(Debug, Deserialize)]
pub struct LogClearanceActionRequest {
    pub student_id: DbId,
    pub action: ClearanceAction,
    pub department_id: Option<DbId>,
    pub requirement_id: Option<DbId>,
    pub document_id: Option<DbId>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/clearance/students/{id}
pub async fn get_student_clearance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(student_id): Path<DbId>,
) -> AppResult<Json<DataResponse<StudentClearance>>> {
    let actor = auth.actor();
    let student = find_user(&state, student_id).await?;
    if !access::can_view_clearance(&actor, &student.scope()) {
        return Err(AppError::forbidden("You may not view this student's clearance"));
    }

    let progress = student_progress(&state, &student).await?;

    let requirements = match student.department_id {
        Some(dept) => RequirementRepo::list(&state.pool, Some(dept), false).await?,
        None => Vec::new(),
    };
    let mut latest: HashMap<DbId, _> = DocumentRepo::latest_for_student(&state.pool, student.id)
        .await?
        .into_iter()
        .map(|doc| (doc.requirement_id, doc))
        .collect();
    let requirements = requirements
        .into_iter()
        .map(|req| {
            let doc = latest.remove(&req.id);
            RequirementProgress {
                requirement_id: req.id,
                name: req.name,
                is_required: req.is_required,
                document_id: doc.as_ref().map(|d| d.id),
                document_status: doc.as_ref().map(|d| d.status),
                version: doc.as_ref().map(|d| d.version),
                uploaded_at: doc.as_ref().map(|d| d.uploaded_at),
            }
        })
        .collect();

    Ok(Json(DataResponse {
        data: StudentClearance {
            clearance_status: student.clearance_status,
            student: UserResponse::for_actor(student, &actor),
            progress,
            requirements,
        },
    }))
}

/// GET /api/v1/clearance/progress
///
/// Staff see their department's students; admins may filter by department.
pub async fn get_all_clearance_progress(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Query(params): Query<ProgressParams>,
) -> AppResult<Json<DataResponse<Page<StudentProgress>>>> {
    let actor = staff.actor();
    let department_id = staff_department_scope(&actor, params.department_id)?;
    let (cursor, limit) = resolve_page(params.cursor.as_deref(), params.limit)?;

    let filter = UserFilter {
        role: Some(Role::Student),
        department_id,
        search: params.search.filter(|s| !s.trim().is_empty()),
        ..Default::default()
    };
    let rows = UserRepo::list(&state.pool, &filter, cursor, limit).await?;
    let page = Page::from_rows(rows, limit, User::cursor);

    let ids: Vec<DbId> = page.items.iter().map(|u| u.id).collect();
    let counts: HashMap<DbId, ClearanceProgress> =
        ClearanceRecordRepo::progress_counts(&state.pool, &ids)
            .await?
            .into_iter()
            .map(|c| {
                (
                    c.student_id,
                    ClearanceProgress::compute(c.total_requirements, c.approved_requirements),
                )
            })
            .collect();

    let page = page.map(|student| StudentProgress {
        progress: counts
            .get(&student.id)
            .copied()
            .unwrap_or_else(|| ClearanceProgress::compute(0, 0)),
        clearance_status: student.clearance_status,
        student: UserResponse::for_actor(student, &actor),
    });
    Ok(Json(DataResponse { data: page }))
}

/// PUT /api/v1/clearance/students/{id}/status
pub async fn update_clearance_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(student_id): Path<DbId>,
    Json(input): Json<UpdateClearanceStatusRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let actor = auth.actor();
    let student = find_user(&state, student_id).await?;
    if !access::can_manage_clearance(&actor, &student.scope()) {
        return Err(AppError::forbidden(
            "You may not change this student's clearance status",
        ));
    }
    let note = checked_note(input.note)?;

    if input.status == ClearanceStatus::Completed {
        student_progress(&state, &student).await?.ensure_completable()?;
    }

    let from = student.clearance_status;
    let mut tx = state.pool.begin().await?;
    let updated = UserRepo::set_clearance_status(&mut *tx, student_id, input.status)
        .await?
        .ok_or_else(|| AppError::not_found("Student", student_id))?;

    let mut record = CreateClearanceRecord::new(ClearanceAction::StatusChange, actor.id, student_id);
    record.department_id = student.department_id;
    record.metadata = json!({ "from": from, "to": input.status, "note": note });
    ClearanceRecordRepo::create(&mut *tx, &record).await?;
    tx.commit().await?;

    tracing::info!(
        student_id,
        actor_id = actor.id,
        from = %from,
        to = %input.status,
        "Clearance status changed"
    );
    Ok(Json(DataResponse {
        data: UserResponse::for_actor(updated, &actor),
    }))
}

/// POST /api/v1/clearance/students/{id}/complete
///
/// Fails with `BAD_REQUEST` unless every active requirement of the
/// student's department has an approved latest document.
pub async fn mark_clearance_completed(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(student_id): Path<DbId>,
) -> AppResult<Json<DataResponse<StudentProgress>>> {
    let actor = auth.actor();
    let student = find_user(&state, student_id).await?;
    if !access::can_manage_clearance(&actor, &student.scope()) {
        return Err(AppError::forbidden(
            "You may not complete this student's clearance",
        ));
    }
    if student.clearance_status == ClearanceStatus::Completed {
        return Err(AppError::Core(CoreError::BadRequest(
            "Clearance is already completed".into(),
        )));
    }

    let progress = student_progress(&state, &student).await?;
    progress.ensure_completable()?;

    let mut tx = state.pool.begin().await?;
    let updated = UserRepo::set_clearance_status(&mut *tx, student_id, ClearanceStatus::Completed)
        .await?
        .ok_or_else(|| AppError::not_found("Student", student_id))?;

    let mut record =
        CreateClearanceRecord::new(ClearanceAction::FinalClearance, actor.id, student_id);
    record.department_id = student.department_id;
    record.metadata = json!({
        "from": student.clearance_status,
        "approved_requirements": progress.approved_requirements,
        "total_requirements": progress.total_requirements,
    });
    ClearanceRecordRepo::create(&mut *tx, &record).await?;
    tx.commit().await?;

    tracing::info!(student_id, actor_id = actor.id, "Clearance completed");
    state.notifier.clearance_completed(recipient(&updated)).await;

    Ok(Json(DataResponse {
        data: StudentProgress {
            clearance_status: updated.clearance_status,
            student: UserResponse::for_actor(updated, &actor),
            progress,
        },
    }))
}

/// GET /api/v1/clearance/stats
pub async fn get_clearance_stats(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Query(params): Query<StatsParams>,
) -> AppResult<Json<DataResponse<ClearanceStats>>> {
    let department_id = staff_department_scope(&staff.actor(), params.department_id)?;

    let mut by_status = ClearanceStatusCounts::default();
    for (status, count) in UserRepo::clearance_status_counts(&state.pool, department_id).await? {
        match status.parse::<ClearanceStatus>() {
            Ok(status) => by_status.add(status, count),
            Err(_) => tracing::warn!(status = %status, "Unknown clearance status in users table"),
        }
    }

    let progress = ClearanceRecordRepo::progress_for_all_students(&state.pool, department_id).await?;
    let fully_approved = progress
        .iter()
        .filter(|c| c.total_requirements > 0 && c.approved_requirements >= c.total_requirements)
        .count() as i64;
    let average_completion_rate = if progress.is_empty() {
        0.0
    } else {
        let sum: f64 = progress
            .iter()
            .map(|c| {
                ClearanceProgress::compute(c.total_requirements, c.approved_requirements)
                    .completion_rate
            })
            .sum();
        (sum / progress.len() as f64 * 100.0).round() / 100.0
    };

    Ok(Json(DataResponse {
        data: ClearanceStats {
            total_students: by_status.total(),
            by_status,
            average_completion_rate,
            fully_approved_students: fully_approved,
        },
    }))
}

/// GET /api/v1/clearance/students/{id}/timeline
pub async fn get_clearance_timeline(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(student_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ClearanceRecord>>>> {
    let student = find_user(&state, student_id).await?;
    if !access::can_view_clearance(&auth.actor(), &student.scope()) {
        return Err(AppError::forbidden("You may not view this student's clearance"));
    }
    let records = ClearanceRecordRepo::list_for_student(&state.pool, student_id).await?;
    Ok(Json(DataResponse { data: records }))
}

/// POST /api/v1/clearance/records
///
/// Staff append `note`, `status-change` or `department-clearance` entries.
/// Other actions are written only by the operations that perform them.
pub async fn log_clearance_action(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<LogClearanceActionRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ClearanceRecord>>)> {
    let actor = auth.actor();
    if !input.action.is_manual() {
        return Err(AppError::validation(format!(
            "Action '{}' cannot be logged manually",
            input.action
        )));
    }

    let student = find_user(&state, input.student_id).await?;
    if !access::can_manage_clearance(&actor, &student.scope()) {
        return Err(AppError::forbidden(
            "You may not log actions for this student",
        ));
    }

    let metadata = input.metadata.unwrap_or_else(|| json!({}));
    if !metadata.is_object() {
        return Err(AppError::validation("metadata must be a JSON object"));
    }

    let mut record = CreateClearanceRecord::new(input.action, actor.id, student.id);
    record.department_id = input.department_id.or(student.department_id);
    record.requirement_id = input.requirement_id;
    record.document_id = input.document_id;
    record.metadata = metadata;
    let created = ClearanceRecordRepo::create(&state.pool, &record).await?;

    tracing::info!(
        record_id = created.id,
        student_id = student.id,
        action = %created.action,
        "Clearance action logged"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn student_progress(state: &AppState, student: &User) -> AppResult<ClearanceProgress> {
    let counts = ClearanceRecordRepo::progress_counts(&state.pool, &[student.id]).await?;
    Ok(counts
        .first()
        .map(|c| ClearanceProgress::compute(c.total_requirements, c.approved_requirements))
        .unwrap_or_else(|| ClearanceProgress::compute(0, 0)))
}

/// Department filter for staff views: staff are pinned to their own
/// department, admins may pass one or see all, students are refused.
fn staff_department_scope(actor: &Actor, requested: Option<DbId>) -> AppResult<Option<DbId>> {
    match actor.list_scope() {
        ListScope::All => Ok(requested),
        ListScope::Department(dept) => {
            if requested.is_some_and(|r| r != dept) {
                return Err(AppError::forbidden(
                    "You may only view your own department",
                ));
            }
            Ok(Some(dept))
        }
        ListScope::Student(_) | ListScope::Nothing => Err(AppError::forbidden(
            "Clearance overviews require a staff role",
        )),
    }
}

fn checked_note(note: Option<String>) -> AppResult<Option<String>> {
    let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    if note.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTE_LENGTH) {
        return Err(AppError::validation(format!(
            "Note must be at most {MAX_NOTE_LENGTH} characters"
        )));
    }
    Ok(note)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn actor(role: Role, department_id: Option<DbId>) -> Actor {
        Actor {
            id: 1,
            role,
            department_id,
        }
    }

    #[test]
    fn admins_choose_their_department_filter() {
        let admin = actor(Role::Admin, None);
        assert_eq!(staff_department_scope(&admin, None).unwrap(), None);
        assert_eq!(staff_department_scope(&admin, Some(4)).unwrap(), Some(4));
    }

    #[test]
    fn officers_are_pinned_to_their_department() {
        let officer = actor(Role::Officer, Some(3));
        assert_eq!(staff_department_scope(&officer, None).unwrap(), Some(3));
        assert_matches!(
            staff_department_scope(&officer, Some(9)),
            Err(AppError::Core(CoreError::Forbidden(_)))
        );
    }

    #[test]
    fn students_have_no_overview() {
        let student = actor(Role::Student, Some(3));
        assert!(staff_department_scope(&student, None).is_err());
    }

    #[test]
    fn notes_are_trimmed_and_bounded() {
        assert_eq!(checked_note(Some("  ".into())).unwrap(), None);
        assert_eq!(checked_note(Some(" ok ".into())).unwrap().as_deref(), Some("ok"));
        assert!(checked_note(Some("x".repeat(MAX_NOTE_LENGTH + 1))).is_err());
    }
}
