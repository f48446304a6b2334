//! HTTP-level integration tests for `/documents` and `/clearance`.

mod common;

use axum::http::StatusCode;
use clearance_core::roles::Role;
use clearance_db::models::requirement::{CreateRequirement, Requirement};
use clearance_db::repositories::RequirementRepo;
use common::{
    body_json, create_department, create_user, get_auth, post_json_auth, token_for, upload_auth,
};
use http_body_util::BodyExt;
use serde_json::json;
use sqlx::PgPool;

const PDF_BYTES: &[u8] = b"%PDF-1.4 test transcript";

async fn create_requirement(pool: &PgPool, department_ids: &[i64]) -> Requirement {
    RequirementRepo::create(
        pool,
        &CreateRequirement {
            name: "Academic Transcript".to_string(),
            description: None,
            allowed_file_types: vec!["pdf".to_string()],
            max_file_size_mb: 10,
            display_order: 0,
            is_required: true,
            department_ids: department_ids.to_vec(),
        },
    )
    .await
    .expect("requirement creation should succeed")
}

// ---------------------------------------------------------------------------
// Role gates
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn upload_gates(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    let requirement = create_requirement(&pool, &[dept.id]).await;
    let student = create_user(&pool, "ada@uni.test", Role::Student, Some(dept.id), true).await;
    let other = create_user(&pool, "bob@uni.test", Role::Student, Some(dept.id), true).await;
    let officer = create_user(&pool, "grace@uni.test", Role::Officer, Some(dept.id), true).await;
    let app = common::build_test_app(pool);
    let requirement_id = requirement.id.to_string();

    // Officers never upload.
    let fields = [
        ("requirement_id", requirement_id.clone()),
        ("student_id", student.id.to_string()),
    ];
    let response =
        upload_auth(&app, "transcript.pdf", PDF_BYTES, &fields, &token_for(&officer)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Students only upload for themselves.
    let fields = [
        ("requirement_id", requirement_id),
        ("student_id", other.id.to_string()),
    ];
    let response =
        upload_auth(&app, "transcript.pdf", PDF_BYTES, &fields, &token_for(&student)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let fields = [("requirement_id", "abc".to_string())];
    let response =
        upload_auth(&app, "transcript.pdf", PDF_BYTES, &fields, &token_for(&student)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(app.outbox.sent().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn clearance_overviews_are_staff_only(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    let student = create_user(&pool, "ada@uni.test", Role::Student, Some(dept.id), true).await;
    let token = token_for(&student);
    let app = common::build_test_app(pool);

    for uri in ["/api/v1/clearance/progress", "/api/v1/clearance/stats"] {
        let response = get_auth(&app, uri, &token).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn officers_cannot_read_another_departments_overview(pool: PgPool) {
    let cs = create_department(&pool, "CS").await;
    let law = create_department(&pool, "LAW").await;
    let officer = create_user(&pool, "grace@uni.test", Role::Officer, Some(cs.id), true).await;
    let app = common::build_test_app(pool);

    let response = get_auth(
        &app,
        &format!("/api/v1/clearance/stats?department_id={}", law.id),
        &token_for(&officer),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn automatic_actions_cannot_be_logged_by_hand(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    let student = create_user(&pool, "ada@uni.test", Role::Student, Some(dept.id), true).await;
    let officer = create_user(&pool, "grace@uni.test", Role::Officer, Some(dept.id), true).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        &app,
        "/api/v1/clearance/records",
        json!({ "student_id": student.id, "action": "final-clearance" }),
        &token_for(&officer),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Upload → review → completion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn upload_review_and_complete_clearance(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    let requirement = create_requirement(&pool, &[dept.id]).await;
    let student = create_user(&pool, "ada@uni.test", Role::Student, Some(dept.id), true).await;
    let officer = create_user(&pool, "grace@uni.test", Role::Officer, Some(dept.id), true).await;
    let student_token = token_for(&student);
    let officer_token = token_for(&officer);
    let fields = [("requirement_id", requirement.id.to_string())];
    let app = common::build_test_app(pool);

    // Completing with nothing approved is refused.
    let response = post_json_auth(
        &app,
        &format!("/api/v1/clearance/students/{}/complete", student.id),
        json!({}),
        &officer_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Disallowed extension.
    let response = upload_auth(&app, "transcript.exe", PDF_BYTES, &fields, &student_token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Two uploads: the second becomes version 2 and the only latest.
    for expected_version in [1, 2] {
        let response =
            upload_auth(&app, "transcript.pdf", PDF_BYTES, &fields, &student_token).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let data = &body_json(response).await["data"];
        assert_eq!(data["version"], expected_version);
        assert_eq!(data["status"], "pending");
        assert_eq!(data["is_latest"], true);
        assert!(data.get("storage_key").is_none());
    }
    assert!(app.outbox.sent().is_empty(), "uploads send no email");

    let response = get_auth(&app, "/api/v1/documents?latest_only=true", &student_token).await;
    let page = body_json(response).await;
    let items = page["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    let document_id = items[0]["id"].as_i64().unwrap();
    let review_uri = format!("/api/v1/documents/{document_id}/review");

    // Students cannot review.
    let response = post_json_auth(
        &app,
        &review_uri,
        json!({ "status": "approved" }),
        &student_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Rejection needs a reason.
    let response = post_json_auth(
        &app,
        &review_uri,
        json!({ "status": "rejected" }),
        &officer_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        &app,
        &review_uri,
        json!({ "status": "approved", "review_notes": "Looks good" }),
        &officer_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["status"], "approved");
    assert_eq!(data["reviewed_by"], officer.id);
    assert!(data["reviewed_at"].is_string());

    let sent = app.outbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ada@uni.test");
    assert_eq!(sent[0].email.subject, "Document approved: Academic Transcript");
    assert!(sent[0].email.text.contains("Looks good"));

    // Approved is terminal for this version.
    let response = post_json_auth(
        &app,
        &review_uri,
        json!({ "status": "rejected", "rejection_reason": "changed my mind" }),
        &officer_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.outbox.sent().len(), 1);

    let response = get_auth(
        &app,
        &format!("/api/v1/clearance/students/{}", student.id),
        &student_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["progress"]["completion_rate"], 100.0);
    assert_eq!(data["progress"]["is_completed"], true);
    assert_eq!(data["clearance_status"], "in-progress");
    assert_eq!(data["requirements"][0]["document_status"], "approved");

    let response = post_json_auth(
        &app,
        &format!("/api/v1/clearance/students/{}/complete", student.id),
        json!({}),
        &officer_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["clearance_status"], "completed");
    assert_eq!(
        app.outbox.subjects_for("ada@uni.test"),
        [
            "Document approved: Academic Transcript",
            "Student Clearance: clearance completed"
        ]
    );

    let response = get_auth(
        &app,
        &format!("/api/v1/clearance/students/{}/timeline", student.id),
        &student_token,
    )
    .await;
    let timeline = body_json(response).await;
    let actions: Vec<&str> = timeline["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions,
        [
            "upload",
            "upload",
            "approval",
            "department-clearance",
            "final-clearance"
        ]
    );

    let response = get_auth(
        &app,
        &format!("/api/v1/documents/{document_id}/file"),
        &officer_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"transcript.pdf\""
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], PDF_BYTES);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn review_then_reject_notifies_each_step(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    let requirement = create_requirement(&pool, &[dept.id]).await;
    let student = create_user(&pool, "ada@uni.test", Role::Student, Some(dept.id), true).await;
    let officer = create_user(&pool, "grace@uni.test", Role::Officer, Some(dept.id), true).await;
    let officer_token = token_for(&officer);
    let app = common::build_test_app(pool);

    let response = upload_auth(
        &app,
        "transcript.pdf",
        PDF_BYTES,
        &[("requirement_id", requirement.id.to_string())],
        &token_for(&student),
    )
    .await;
    let document_id = body_json(response).await["data"]["id"].as_i64().unwrap();
    let review_uri = format!("/api/v1/documents/{document_id}/review");

    let response = post_json_auth(
        &app,
        &review_uri,
        json!({ "status": "under-review" }),
        &officer_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json_auth(
        &app,
        &review_uri,
        json!({ "status": "rejected", "rejection_reason": "Scan is illegible" }),
        &officer_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["rejection_reason"], "Scan is illegible");

    let sent = app.outbox.sent();
    let subjects: Vec<&str> = sent.iter().map(|m| m.email.subject.as_str()).collect();
    assert_eq!(
        subjects,
        [
            "Document under review: Academic Transcript",
            "Document rejected: Academic Transcript"
        ]
    );
    assert!(sent.iter().all(|m| m.to == "ada@uni.test"));
    assert!(sent[1].email.text.contains("Scan is illegible"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn other_department_officer_cannot_review(pool: PgPool) {
    let cs = create_department(&pool, "CS").await;
    let law = create_department(&pool, "LAW").await;
    let requirement = create_requirement(&pool, &[cs.id]).await;
    let student = create_user(&pool, "ada@uni.test", Role::Student, Some(cs.id), true).await;
    let outsider = create_user(&pool, "lex@uni.test", Role::Officer, Some(law.id), true).await;
    let app = common::build_test_app(pool);

    let response = upload_auth(
        &app,
        "transcript.pdf",
        PDF_BYTES,
        &[("requirement_id", requirement.id.to_string())],
        &token_for(&student),
    )
    .await;
    let document_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let outsider_token = token_for(&outsider);
    let response = post_json_auth(
        &app,
        &format!("/api/v1/documents/{document_id}/review"),
        json!({ "status": "approved" }),
        &outsider_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(
        &app,
        &format!("/api/v1/documents/{document_id}"),
        &outsider_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(app.outbox.sent().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn approvals_filed_elsewhere_do_not_count_toward_home_progress(pool: PgPool) {
    let cs = create_department(&pool, "CS").await;
    let law = create_department(&pool, "LAW").await;
    let requirement = create_requirement(&pool, &[cs.id, law.id]).await;
    let student = create_user(&pool, "ada@uni.test", Role::Student, Some(cs.id), true).await;
    let law_officer = create_user(&pool, "lex@uni.test", Role::Officer, Some(law.id), true).await;
    let app = common::build_test_app(pool);

    // Filed under LAW rather than the student's home department.
    let response = upload_auth(
        &app,
        "transcript.pdf",
        PDF_BYTES,
        &[
            ("requirement_id", requirement.id.to_string()),
            ("department_id", law.id.to_string()),
        ],
        &token_for(&student),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let document_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = post_json_auth(
        &app,
        &format!("/api/v1/documents/{document_id}/review"),
        json!({ "status": "approved" }),
        &token_for(&law_officer),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(
        &app,
        &format!("/api/v1/clearance/students/{}", student.id),
        &token_for(&student),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["progress"]["total_requirements"], 1);
    assert_eq!(data["progress"]["approved_requirements"], 0);
    assert_eq!(data["progress"]["is_completed"], false);
}
