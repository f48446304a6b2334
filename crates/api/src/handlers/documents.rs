//! Handlers for the `/documents` resource.
//!
//! Uploads create a new version per (student, requirement). Reviews move a
//! document through its status machine with a compare-and-set update, log a
//! clearance record and email the student.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use clearance_core::access::{self, Actor, ListScope};
use clearance_core::clearance::{status_after_upload, ClearanceAction};
use clearance_core::documents::{validate_review, validate_upload, content_type_for, DocumentStatus};
use clearance_core::error::CoreError;
use clearance_core::pagination::Page;
use clearance_core::roles::Role;
use clearance_core::types::DbId;
use clearance_db::models::clearance_record::CreateClearanceRecord;
use clearance_db::models::document::{
    CreateDocument, Document, DocumentFilter, DocumentStats, ReviewDocument,
};
use clearance_db::repositories::{
    ClearanceRecordRepo, DepartmentRepo, DocumentRepo, RequirementRepo, UserRepo,
};
use clearance_notifications::ReviewedDocument;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::handlers::users::{find_user, recipient};
use crate::middleware::auth::AuthUser;
use crate::query::{resolve_page, CursorParams};
use crate::response::{DataResponse, SuccessResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListDocumentsParams {
    pub student_id: Option<DbId>,
    pub department_id: Option<DbId>,
    pub requirement_id: Option<DbId>,
    pub status: Option<DocumentStatus>,
    #[serde(default)]
    pub latest_only: bool,
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

/// Request body for `POST /documents/{id}/review`.
#[derive(Debug, Deserialize)]
pub struct ReviewDocumentRequest {
    pub status: DocumentStatus,
    pub review_notes: Option<String>,
    pub rejection_reason: Option<String>,
}

/// Fields collected from the upload form before anything is checked.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    requirement_id: Option<DbId>,
    department_id: Option<DbId>,
    student_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/documents
pub async fn list_documents(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListDocumentsParams>,
) -> AppResult<Json<DataResponse<Page<Document>>>> {
    let (cursor, limit) = resolve_page(params.cursor.as_deref(), params.limit)?;
    let filter = DocumentFilter {
        student_id: params.student_id,
        department_id: params.department_id,
        requirement_id: params.requirement_id,
        status: params.status,
        latest_only: params.latest_only,
    };
    let page = list_page(&state, auth.actor().list_scope(), &filter, cursor, limit).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/documents/{id}
pub async fn get_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Document>>> {
    let document = find_visible(&state, &auth.actor(), id).await?;
    Ok(Json(DataResponse { data: document }))
}

/// POST /api/v1/documents (multipart)
///
/// Form fields: `file` (required), `requirement_id` (required),
/// `department_id` (defaults to the student's department) and `student_id`
/// (admins uploading on a student's behalf).
pub async fn upload_document(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Document>>)> {
    let actor = auth.actor();
    let form = read_upload_form(multipart).await?;

    let student_id = form.student_id.unwrap_or(actor.id);
    if !access::can_upload_for(&actor, student_id) {
        return Err(AppError::forbidden("You may not upload documents for this student"));
    }

    let (file_name, bytes) = form
        .file
        .ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;
    let requirement_id = form
        .requirement_id
        .ok_or_else(|| AppError::BadRequest("Missing required 'requirement_id' field".into()))?;

    let student = find_user(&state, student_id).await?;
    if student.role != Role::Student {
        return Err(AppError::Core(CoreError::BadRequest(
            "Documents can only be uploaded for students".into(),
        )));
    }
    if !student.is_active() {
        return Err(AppError::forbidden("Account is suspended"));
    }

    let department_id = form
        .department_id
        .or(student.department_id)
        .ok_or_else(|| AppError::BadRequest("Missing required 'department_id' field".into()))?;
    let department = DepartmentRepo::find_by_id(&state.pool, department_id)
        .await?
        .ok_or_else(|| AppError::not_found("Department", department_id))?;
    if !department.is_active {
        return Err(AppError::Core(CoreError::BadRequest(
            "Department is inactive".into(),
        )));
    }

    let requirement = RequirementRepo::find_by_id(&state.pool, requirement_id)
        .await?
        .filter(|r| r.is_active)
        .ok_or_else(|| AppError::not_found("Requirement", requirement_id))?;
    if !requirement.department_ids.contains(&department_id) {
        return Err(AppError::Core(CoreError::BadRequest(format!(
            "Requirement '{}' does not belong to department '{}'",
            requirement.name, department.name
        ))));
    }

    let max_mb = requirement.max_file_size_mb.min(state.config.max_upload_mb);
    let size_bytes = i64::try_from(bytes.len()).unwrap_or(i64::MAX);
    let ext = validate_upload(&file_name, size_bytes, &requirement.allowed_file_types, max_mb)?;

    let storage_key = state.storage.put(&ext, &bytes).await?;

    let input = CreateDocument {
        student_id,
        department_id,
        requirement_id,
        file_name: file_name.clone(),
        storage_key: storage_key.clone(),
        content_type: content_type_for(&ext).to_string(),
        size_bytes,
    };
    let document = match DocumentRepo::create_version(&state.pool, &input).await {
        Ok(document) => document,
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(&storage_key).await {
                tracing::warn!(key = %storage_key, error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
    };

    let mut record = CreateClearanceRecord::new(ClearanceAction::Upload, actor.id, student_id);
    record.department_id = Some(department_id);
    record.document_id = Some(document.id);
    record.requirement_id = Some(requirement_id);
    record.metadata = json!({ "file_name": file_name, "version": document.version });
    ClearanceRecordRepo::create(&state.pool, &record).await?;

    if let Some(next) = status_after_upload(student.clearance_status) {
        UserRepo::set_clearance_status(&state.pool, student_id, next).await?;
    }

    tracing::info!(
        document_id = document.id,
        student_id,
        requirement_id,
        version = document.version,
        "Document uploaded"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: document })))
}

/// POST /api/v1/documents/{id}/review
pub async fn review_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<ReviewDocumentRequest>,
) -> AppResult<Json<DataResponse<Document>>> {
    let actor = auth.actor();
    let document = DocumentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Document", id))?;

    if !access::can_review_document(&actor, document.department_id) {
        return Err(AppError::forbidden(
            "Only staff of the document's department may review it",
        ));
    }
    if !document.is_latest {
        return Err(AppError::Core(CoreError::BadRequest(
            "Only the latest version of a document can be reviewed".into(),
        )));
    }

    let notes = trimmed(input.review_notes);
    let reason = trimmed(input.rejection_reason);
    validate_review(document.status, input.status, reason.as_deref(), notes.as_deref())?;

    let review = ReviewDocument {
        status: input.status,
        reviewed_by: actor.id,
        review_notes: notes,
        rejection_reason: if input.status == DocumentStatus::Rejected { reason } else { None },
    };
    let updated = DocumentRepo::review(&state.pool, id, document.status, &review)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Document was reviewed by someone else; reload and try again".into(),
            ))
        })?;

    let action = match updated.status {
        DocumentStatus::Approved => ClearanceAction::Approval,
        DocumentStatus::Rejected => ClearanceAction::Rejection,
        _ => ClearanceAction::Review,
    };
    let mut record = CreateClearanceRecord::new(action, actor.id, updated.student_id);
    record.department_id = Some(updated.department_id);
    record.document_id = Some(updated.id);
    record.requirement_id = Some(updated.requirement_id);
    record.metadata = json!({
        "from": document.status,
        "to": updated.status,
        "version": updated.version,
        "review_notes": updated.review_notes,
        "rejection_reason": updated.rejection_reason,
    });
    ClearanceRecordRepo::create(&state.pool, &record).await?;

    if updated.status == DocumentStatus::Approved {
        record_department_clearance(&state, &actor, &updated).await?;
    }

    tracing::info!(
        document_id = updated.id,
        reviewer_id = actor.id,
        from = %document.status,
        to = %updated.status,
        "Document reviewed"
    );

    notify_review(&state, &updated).await?;
    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/v1/documents/{id}
///
/// Students may withdraw their own pending uploads; admins delete anything.
pub async fn delete_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SuccessResponse>>> {
    let actor = auth.actor();
    let document = DocumentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Document", id))?;
    if !access::can_delete_document(&actor, &document.scope(), document.status) {
        return Err(AppError::forbidden("You may not delete this document"));
    }

    DocumentRepo::delete(&state.pool, id).await?;
    if let Err(e) = state.storage.delete(&document.storage_key).await {
        tracing::warn!(document_id = id, error = %e, "Failed to remove stored file");
    }

    tracing::info!(document_id = id, actor_id = actor.id, "Document deleted");
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/v1/documents/student/{id}
pub async fn list_by_student(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(student_id): Path<DbId>,
    Query(params): Query<CursorParams>,
) -> AppResult<Json<DataResponse<Page<Document>>>> {
    let actor = auth.actor();
    let student = find_user(&state, student_id).await?;
    if !access::can_view_clearance(&actor, &student.scope()) {
        return Err(AppError::forbidden("You may not view this student's documents"));
    }
    let (cursor, limit) = params.resolve()?;
    let filter = DocumentFilter {
        student_id: Some(student_id),
        ..Default::default()
    };
    let page = list_page(&state, actor.list_scope(), &filter, cursor, limit).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/documents/department/{id}
pub async fn list_by_department(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(department_id): Path<DbId>,
    Query(params): Query<CursorParams>,
) -> AppResult<Json<DataResponse<Page<Document>>>> {
    let actor = auth.actor();
    if !access::can_view_department_stats(&actor, department_id) {
        return Err(AppError::forbidden(
            "You may not view this department's documents",
        ));
    }
    let (cursor, limit) = params.resolve()?;
    let filter = DocumentFilter {
        department_id: Some(department_id),
        ..Default::default()
    };
    let page = list_page(&state, actor.list_scope(), &filter, cursor, limit).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/documents/stats
///
/// Counts of latest documents visible to the caller.
pub async fn get_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<DocumentStats>>> {
    let stats = DocumentRepo::stats(&state.pool, auth.actor().list_scope()).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/documents/{id}/file
pub async fn download_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let document = find_visible(&state, &auth.actor(), id).await?;
    let bytes = state.storage.get(&document.storage_key).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_header_filename(&document.file_name)
    );
    Ok((
        [
            (CONTENT_TYPE, document.content_type),
            (CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_visible(state: &AppState, actor: &Actor, id: DbId) -> AppResult<Document> {
    let document = DocumentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Document", id))?;
    if !access::can_view_document(actor, &document.scope()) {
        return Err(AppError::forbidden("You may not view this document"));
    }
    Ok(document)
}

async fn list_page(
    state: &AppState,
    scope: ListScope,
    filter: &DocumentFilter,
    cursor: Option<clearance_core::pagination::Cursor>,
    limit: i64,
) -> AppResult<Page<Document>> {
    let rows = DocumentRepo::list(&state.pool, scope, filter, cursor, limit).await?;
    Ok(Page::from_rows(rows, limit, Document::cursor))
}

async fn read_upload_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.file = Some((file_name, data.to_vec()));
            }
            "requirement_id" | "department_id" | "student_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                let value: DbId = text
                    .trim()
                    .parse()
                    .map_err(|_| AppError::BadRequest(format!("'{name}' must be an integer id")))?;
                match name.as_str() {
                    "requirement_id" => form.requirement_id = Some(value),
                    "department_id" => form.department_id = Some(value),
                    _ => form.student_id = Some(value),
                }
            }
            _ => {} // ignore unknown fields
        }
    }

    Ok(form)
}

/// Append a `department-clearance` record when this approval completes the
/// document department's active requirements for the student.
async fn record_department_clearance(
    state: &AppState,
    actor: &Actor,
    document: &Document,
) -> AppResult<()> {
    let (total, approved) =
        ClearanceRecordRepo::department_counts(&state.pool, document.student_id, document.department_id)
            .await?;
    if total == 0 || approved < total {
        return Ok(());
    }

    let mut record = CreateClearanceRecord::new(
        ClearanceAction::DepartmentClearance,
        actor.id,
        document.student_id,
    );
    record.department_id = Some(document.department_id);
    record.metadata = json!({ "approved_requirements": approved, "total_requirements": total });
    ClearanceRecordRepo::create(&state.pool, &record).await?;

    tracing::info!(
        student_id = document.student_id,
        department_id = document.department_id,
        "Department clearance reached"
    );
    Ok(())
}

/// Email the student about a review decision. Mail failures are logged by
/// the notifier; only lookup errors surface here.
async fn notify_review(state: &AppState, document: &Document) -> AppResult<()> {
    let Some(student) = UserRepo::find_by_id(&state.pool, document.student_id).await? else {
        return Ok(());
    };
    let requirement = RequirementRepo::find_by_id(&state.pool, document.requirement_id).await?;
    let department = DepartmentRepo::find_by_id(&state.pool, document.department_id).await?;

    let requirement_name = requirement.as_ref().map_or("your requirement", |r| r.name.as_str());
    let department_name = department.as_ref().map_or("the department", |d| d.name.as_str());

    state
        .notifier
        .document_reviewed(
            recipient(&student),
            ReviewedDocument {
                status: document.status,
                requirement_name,
                department_name,
                notes: document.review_notes.as_deref(),
                rejection_reason: document.rejection_reason.as_deref(),
            },
        )
        .await;
    Ok(())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Keep a file name safe for a quoted `Content-Disposition` value.
fn sanitize_header_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trimmed_drops_blank_text() {
        assert_eq!(trimmed(Some("  ".into())), None);
        assert_eq!(trimmed(Some(" ok ".into())).as_deref(), Some("ok"));
        assert_eq!(trimmed(None), None);
    }

    #[test]
    fn header_filename_is_sanitized() {
        assert_eq!(sanitize_header_filename("a\"b\\c.pdf"), "a_b_c.pdf");
        assert_eq!(sanitize_header_filename("résumé.pdf"), "r_sum_.pdf");
        assert_eq!(sanitize_header_filename("plain name.pdf"), "plain name.pdf");
    }
}
