use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::repositories;
use crate::test_support;

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn teacher_creates_classroom_and_student_joins_by_code() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "teacher@classhub.test").await;
    let student = test_support::insert_student(ctx.state.db(), "student@classhub.test").await;
    let teacher_token = test_support::bearer_token(&teacher, ctx.state.settings());
    let student_token = test_support::bearer_token(&student, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/classrooms",
            Some(&teacher_token),
            Some(json!({"name": "Period 3", "description": "Algebra I"})),
        ))
        .await
        .expect("create classroom");
    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    let classroom_id = created["id"].as_str().expect("id").to_string();
    let join_code = created["join_code"].as_str().expect("join code").to_string();
    assert_eq!(join_code.len(), 8);

    for _ in 0..2 {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/classrooms/join",
                Some(&student_token),
                Some(json!({"join_code": join_code.to_lowercase()})),
            ))
            .await
            .expect("join classroom");
        let status = response.status();
        let joined = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {joined}");
        assert_eq!(joined["id"], classroom_id.as_str());
        assert!(joined.get("join_code").is_none());
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/classrooms/{classroom_id}/students"),
            Some(&teacher_token),
            None,
        ))
        .await
        .expect("list students");
    let roster = test_support::read_json(response).await;
    assert_eq!(roster.as_array().map(Vec::len), Some(1));
    assert_eq!(roster[0]["student_id"], student.id.as_str());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/classrooms",
            Some(&student_token),
            None,
        ))
        .await
        .expect("student list");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn rotating_join_code_invalidates_the_old_one() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "teacher@classhub.test").await;
    let student = test_support::insert_student(ctx.state.db(), "student@classhub.test").await;
    let classroom = test_support::insert_classroom(ctx.state.db(), &teacher.id, "Lab").await;
    let teacher_token = test_support::bearer_token(&teacher, ctx.state.settings());
    let student_token = test_support::bearer_token(&student, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/classrooms/{}/join-code/rotate", classroom.id),
            Some(&teacher_token),
            None,
        ))
        .await
        .expect("rotate");
    let rotated = test_support::read_json(response).await;
    assert_ne!(rotated["join_code"], classroom.join_code.as_str());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/classrooms/join",
            Some(&student_token),
            Some(json!({"join_code": classroom.join_code})),
        ))
        .await
        .expect("join with stale code");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn only_students_can_be_added_and_outsiders_are_forbidden() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_teacher(ctx.state.db(), "teacher@classhub.test").await;
    let other = test_support::insert_teacher(ctx.state.db(), "other@classhub.test").await;
    let student = test_support::insert_student(ctx.state.db(), "student@classhub.test").await;
    let classroom = test_support::insert_classroom(ctx.state.db(), &teacher.id, "Lab").await;
    let teacher_token = test_support::bearer_token(&teacher, ctx.state.settings());
    let other_token = test_support::bearer_token(&other, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/classrooms/{}/students", classroom.id),
            Some(&teacher_token),
            Some(json!({"student_id": other.id})),
        ))
        .await
        .expect("add teacher as student");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/classrooms/{}/students", classroom.id),
            Some(&teacher_token),
            Some(json!({"student_id": student.id})),
        ))
        .await
        .expect("add student");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/classrooms/{}", classroom.id),
            Some(&other_token),
            None,
        ))
        .await
        .expect("outsider get");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/classrooms/{}/students/{}", classroom.id, student.id),
            Some(&teacher_token),
            None,
        ))
        .await
        .expect("remove student");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let still_member = repositories::classrooms::is_member(ctx.state.db(), &classroom.id, &student.id)
        .await
        .expect("is member");
    assert!(!still_member);
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn students_cannot_create_classrooms() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_student(ctx.state.db(), "student@classhub.test").await;
    let token = test_support::bearer_token(&student, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/classrooms",
            Some(&token),
            Some(json!({"name": "Mine"})),
        ))
        .await
        .expect("create classroom");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
