//! HTTP-level integration tests for `/users`, `/departments` and
//! `/requirements`: role gates and provisioning.

mod common;

use axum::http::StatusCode;
use clearance_core::roles::Role;
use clearance_db::models::department::UpdateDepartment;
use clearance_db::repositories::{DepartmentRepo, UserRepo};
use common::{
    body_json, create_department, create_user, get_auth, post_json_auth, put_json_auth, token_for,
};
use serde_json::json;
use sqlx::PgPool;

async fn cap_department(pool: &PgPool, id: i64, max_officers: i32) {
    DepartmentRepo::update(
        pool,
        id,
        &UpdateDepartment {
            allow_officer_creation: Some(true),
            max_officers: Some(max_officers),
            ..Default::default()
        },
    )
    .await
    .unwrap();
}

fn new_officer(email: &str, department_id: i64) -> serde_json::Value {
    json!({
        "email": email,
        "first_name": "New",
        "last_name": "Officer",
        "department_id": department_id
    })
}

// ---------------------------------------------------------------------------
// Role gates
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn students_cannot_list_users(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    let student = create_user(&pool, "ada@uni.test", Role::Student, Some(dept.id), true).await;
    let app = common::build_test_app(pool);

    let response = get_auth(&app, "/api/v1/users", &token_for(&student)).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn user_stats_are_admin_only(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    let users = [
        create_user(&pool, "ada@uni.test", Role::Student, Some(dept.id), true).await,
        create_user(&pool, "grace@uni.test", Role::Officer, Some(dept.id), true).await,
        create_user(&pool, "sa@uni.test", Role::StudentAffairs, Some(dept.id), true).await,
    ];
    let app = common::build_test_app(pool);

    for user in &users {
        let response = get_auth(&app, "/api/v1/users/stats", &token_for(user)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "role {}", user.role);
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn students_cannot_create_officers(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    let student = create_user(&pool, "ada@uni.test", Role::Student, Some(dept.id), true).await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        &app,
        "/api/v1/users/officers",
        new_officer("new@uni.test", dept.id),
        &token_for(&student),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn officers_cannot_create_student_affairs(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    let officer = create_user(&pool, "grace@uni.test", Role::Officer, Some(dept.id), true).await;
    let app = common::build_test_app(pool);

    let mut body = new_officer("new@uni.test", dept.id);
    body["role"] = json!("student-affairs");
    let response = post_json_auth(&app, "/api/v1/users/officers", body, &token_for(&officer)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn bulk_import_gates(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    let officer = create_user(&pool, "grace@uni.test", Role::Officer, Some(dept.id), true).await;
    let admin = create_user(&pool, "admin@uni.test", Role::Admin, None, true).await;
    let app = common::build_test_app(pool);
    let body = json!({ "students": [] });

    let response = post_json_auth(
        &app,
        "/api/v1/users/students/bulk",
        body.clone(),
        &token_for(&officer),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response =
        post_json_auth(&app, "/api/v1/users/students/bulk", body, &token_for(&admin)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn department_and_requirement_writes_are_admin_only(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    let officer = create_user(&pool, "grace@uni.test", Role::Officer, Some(dept.id), true).await;
    let token = token_for(&officer);
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        &app,
        "/api/v1/departments",
        json!({ "name": "Law", "code": "LAW" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        &app,
        "/api/v1/requirements",
        json!({ "name": "Transcript", "department_ids": [dept.id] }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn student_feature_flags(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    let student = create_user(&pool, "ada@uni.test", Role::Student, Some(dept.id), true).await;
    let app = common::build_test_app(pool);

    let response = get_auth(&app, "/api/v1/users/me/access", &token_for(&student)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["role"], "student");
    assert_eq!(data["can_upload_documents"], true);
    assert_eq!(data["can_review_documents"], false);
    assert_eq!(data["can_list_users"], false);
    assert_eq!(data["can_create_officers"], false);
    assert_eq!(data["can_manage_departments"], false);
}

// ---------------------------------------------------------------------------
// Provisioning
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn admin_creates_student_without_password(pool: PgPool) {
    let admin = create_user(&pool, "admin@uni.test", Role::Admin, None, true).await;
    let dept = create_department(&pool, "CS").await;
    let token = token_for(&admin);
    let app = common::build_test_app(pool);

    let body = json!({
        "email": "Ada@Uni.test",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "department_id": dept.id,
        "matric_number": "CS/001"
    });
    let response = post_json_auth(&app, "/api/v1/users/students", body.clone(), &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let data = &body_json(response).await["data"];
    assert_eq!(data["email"], "ada@uni.test");
    assert_eq!(data["role"], "student");
    assert_eq!(data["has_set_password"], false);
    assert_eq!(data["clearance_status"], "not-started");

    let sent = app.outbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ada@uni.test");
    assert_eq!(sent[0].email.subject, "Welcome to Student Clearance");
    assert!(sent[0].email.text.contains("/set-password?token="));

    // Same email again violates the unique constraint.
    let response = post_json_auth(&app, "/api/v1/users/students", body, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(app.outbox.sent().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_department_code_conflicts(pool: PgPool) {
    let admin = create_user(&pool, "admin@uni.test", Role::Admin, None, true).await;
    let token = token_for(&admin);
    let app = common::build_test_app(pool);
    let body = json!({ "name": "Law", "code": "LAW" });

    let response = post_json_auth(&app, "/api/v1/departments", body.clone(), &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json_auth(&app, "/api/v1/departments", body, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn officer_creation_respects_department_cap(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    cap_department(&pool, dept.id, 2).await;
    let officer = create_user(&pool, "o1@uni.test", Role::Officer, Some(dept.id), true).await;
    let token = token_for(&officer);
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        &app,
        "/api/v1/users/officers",
        new_officer("o2@uni.test", dept.id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        app.outbox.subjects_for("o2@uni.test"),
        vec!["Student Clearance: officer account for Department CS".to_string()]
    );

    let response = post_json_auth(
        &app,
        "/api/v1/users/officers",
        new_officer("o3@uni.test", dept.id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(
        &app,
        &format!("/api/v1/departments/{}/officer-creation", dept.id),
        &token,
    )
    .await;
    let data = &body_json(response).await["data"];
    assert_eq!(data["current_officers"], 2);
    assert_eq!(data["remaining"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn full_department_blocks_admins_too(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    cap_department(&pool, dept.id, 1).await;
    create_user(&pool, "o1@uni.test", Role::Officer, Some(dept.id), true).await;
    let admin = create_user(&pool, "admin@uni.test", Role::Admin, None, true).await;
    let token = token_for(&admin);
    let app = common::build_test_app(pool);

    let response = get_auth(
        &app,
        &format!("/api/v1/departments/can-create-officer?department_id={}", dept.id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["department_id"], dept.id);
    assert_eq!(data["allowed"], false);

    let response = post_json_auth(
        &app,
        "/api/v1/users/officers",
        new_officer("o2@uni.test", dept.id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(app.outbox.sent().is_empty());

    // Student-affairs staff do not count toward the officer cap.
    let mut body = new_officer("sa@uni.test", dept.id);
    body["role"] = json!("student-affairs");
    let response = post_json_auth(&app, "/api/v1/users/officers", body, &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn admin_promotes_student_to_officer(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    let admin = create_user(&pool, "admin@uni.test", Role::Admin, None, true).await;
    let student = create_user(&pool, "ada@uni.test", Role::Student, Some(dept.id), true).await;
    let app = common::build_test_app(pool.clone());
    let uri = format!("/api/v1/users/{}", student.id);

    let response = put_json_auth(&app, &uri, json!({ "role": "officer" }), &token_for(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let data = &body_json(response).await["data"];
    assert_eq!(data["role"], "officer");
    assert_eq!(data["department_id"], dept.id);
    assert!(data["matric_number"].is_null());

    let stored = UserRepo::find_by_id(&pool, student.id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Officer);
    assert_eq!(stored.matric_number, None);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn explicit_null_clears_optional_fields(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    let student = create_user(&pool, "ada@uni.test", Role::Student, Some(dept.id), true).await;
    let token = token_for(&student);
    let app = common::build_test_app(pool);
    let uri = format!("/api/v1/users/{}", student.id);

    let response = put_json_auth(&app, &uri, json!({ "phone": "+234 800 000 0000" }), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["phone"], "+234 800 000 0000");

    // Absent leaves the phone alone.
    let response = put_json_auth(&app, &uri, json!({ "first_name": "Augusta" }), &token).await;
    let data = &body_json(response).await["data"];
    assert_eq!(data["first_name"], "Augusta");
    assert_eq!(data["phone"], "+234 800 000 0000");

    let response = put_json_auth(&app, &uri, json!({ "phone": null }), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert!(data["phone"].is_null());
    assert_eq!(data["matric_number"], "MAT/ada");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn students_cannot_null_their_department(pool: PgPool) {
    let dept = create_department(&pool, "CS").await;
    let admin = create_user(&pool, "admin@uni.test", Role::Admin, None, true).await;
    let student = create_user(&pool, "ada@uni.test", Role::Student, Some(dept.id), true).await;
    let app = common::build_test_app(pool);

    let response = put_json_auth(
        &app,
        &format!("/api/v1/users/{}", student.id),
        json!({ "department_id": null }),
        &token_for(&admin),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn rejected_department_update_keeps_the_cap(pool: PgPool) {
    let admin = create_user(&pool, "admin@uni.test", Role::Admin, None, true).await;
    let cs = create_department(&pool, "CS").await;
    create_department(&pool, "LAW").await;
    cap_department(&pool, cs.id, 3).await;
    let token = token_for(&admin);
    let app = common::build_test_app(pool.clone());
    let uri = format!("/api/v1/departments/{}", cs.id);

    let response = put_json_auth(
        &app,
        &uri,
        json!({ "code": "LAW", "clear_max_officers": true }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let stored = DepartmentRepo::find_by_id(&pool, cs.id).await.unwrap().unwrap();
    assert_eq!(stored.max_officers, Some(3));
    assert_eq!(stored.code, "CS");

    let response = put_json_auth(&app, &uri, json!({ "clear_max_officers": true }), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stored = DepartmentRepo::find_by_id(&pool, cs.id).await.unwrap().unwrap();
    assert_eq!(stored.max_officers, None);
}
