use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::{Course, Quiz, QuizAttempt};
use crate::repositories;
use crate::test_support;

struct Fixture {
    ctx: test_support::TestContext,
    course: Course,
    teacher_token: String,
    student_token: String,
    student_id: String,
}

async fn fixture() -> Fixture {
    let ctx = test_support::setup_test_context().await;
    let teacher = test_support::insert_teacher(ctx.state.db(), "teacher@classhub.test").await;
    let student = test_support::insert_student(ctx.state.db(), "student@classhub.test").await;
    let course = test_support::insert_course(ctx.state.db(), &teacher.id, "Physics", true).await;
    test_support::enroll(ctx.state.db(), &course.id, &student.id).await;

    let teacher_token = test_support::bearer_token(&teacher, ctx.state.settings());
    let student_token = test_support::bearer_token(&student, ctx.state.settings());
    Fixture { ctx, course, teacher_token, student_token, student_id: student.id }
}

fn questions() -> Value {
    json!([
        {
            "id": "capital",
            "type": "single_choice",
            "question": "Capital of France?",
            "options": ["Berlin", "Paris", "Rome"],
            "answer": 1,
            "points": 2
        },
        {
            "id": "g",
            "type": "numeric",
            "prompt": "Gravity at sea level, m/s^2",
            "correct_value": "9.81",
            "tolerance": 0.05
        },
        {
            "id": "essay",
            "type": "essay",
            "prompt": "Explain inertia",
            "points": 3
        }
    ])
}

async fn send(
    fx: &Fixture,
    method: Method,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = fx
        .ctx
        .app
        .clone()
        .oneshot(test_support::json_request(method, uri, Some(token), body))
        .await
        .expect("request");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

fn quiz_uri(fx: &Fixture, quiz: &Quiz) -> String {
    format!("/api/v1/courses/{}/quizzes/{}", fx.course.id, quiz.id)
}

/// Stores a first in-progress attempt that started `minutes_ago` with a `limit_minutes` timer.
async fn insert_timed_attempt(
    fx: &Fixture,
    quiz: &Quiz,
    minutes_ago: i64,
    limit_minutes: i64,
) -> QuizAttempt {
    let started_at = primitive_now_utc() - time::Duration::minutes(minutes_ago);
    repositories::quiz_attempts::create(
        fx.ctx.state.db(),
        repositories::quiz_attempts::CreateAttempt {
            id: &Uuid::new_v4().to_string(),
            quiz_id: &quiz.id,
            course_id: &quiz.course_id,
            student_id: &fx.student_id,
            attempt_number: 1,
            total_points: quiz.total_points,
            started_at,
            expires_at: Some(started_at + time::Duration::minutes(limit_minutes)),
        },
    )
    .await
    .expect("insert attempt")
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn teacher_creates_quiz_and_student_sees_public_view() {
    let fx = fixture().await;
    let base = format!("/api/v1/courses/{}/quizzes", fx.course.id);

    let (status, created) = send(
        &fx,
        Method::POST,
        &base,
        &fx.teacher_token,
        Some(json!({"title": "Forces", "questions": questions(), "is_published": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["total_points"], 6.0);
    assert_eq!(created["max_attempts"], 3);
    assert_eq!(created["passing_score"], 60.0);
    assert_eq!(created["questions"][0]["type"], "mcq");
    assert_eq!(created["questions"][0]["correct_option"], "Paris");
    let quiz_id = created["id"].as_str().expect("quiz id").to_string();

    let (status, seen) =
        send(&fx, Method::GET, &format!("{base}/{quiz_id}"), &fx.student_token, None).await;
    assert_eq!(status, StatusCode::OK, "response: {seen}");
    assert!(seen["questions"][0].get("correct_option").is_none());
    assert!(seen["questions"][1].get("tolerance").is_none());
    assert_eq!(seen["question_count"], 3);
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn malformed_questions_are_unprocessable() {
    let fx = fixture().await;

    let (status, body) = send(
        &fx,
        Method::POST,
        &format!("/api/v1/courses/{}/quizzes", fx.course.id),
        &fx.teacher_token,
        Some(json!({
            "title": "Broken",
            "questions": [{"type": "mcq", "prompt": "Pick", "options": ["only"], "answer": 0}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "response: {body}");
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn attempt_is_resumed_graded_and_capped() {
    let fx = fixture().await;
    let quiz = test_support::insert_quiz(fx.ctx.state.db(), &fx.course, questions(), 1, None).await;
    let base = quiz_uri(&fx, &quiz);

    let (status, started) =
        send(&fx, Method::POST, &format!("{base}/attempts"), &fx.student_token, None).await;
    assert_eq!(status, StatusCode::CREATED, "response: {started}");
    assert_eq!(started["attempt_number"], 1);
    assert_eq!(started["status"], "in_progress");
    let attempt_id = started["id"].as_str().expect("attempt id").to_string();

    let (status, resumed) =
        send(&fx, Method::POST, &format!("{base}/attempts"), &fx.student_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resumed["id"], attempt_id.as_str());

    let (status, rejected) = send(
        &fx,
        Method::POST,
        &format!("{base}/attempts/{attempt_id}/submit"),
        &fx.student_token,
        Some(json!({"answers": {"unknown": "x"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {rejected}");

    let (status, submitted) = send(
        &fx,
        Method::POST,
        &format!("{base}/attempts/{attempt_id}/submit"),
        &fx.student_token,
        Some(json!({"answers": [
            {"question_id": "capital", "answer": "Paris"},
            {"question_id": "g", "answer": 9.8}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {submitted}");
    assert_eq!(submitted["status"], "completed");
    assert_eq!(submitted["score"], 3.0);
    assert_eq!(submitted["percentage"], 50.0);
    assert_eq!(submitted["passed"], false);
    assert_eq!(submitted["needs_manual_grading"], false);

    let (status, body) =
        send(&fx, Method::POST, &format!("{base}/attempts"), &fx.student_token, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Maximum attempts reached");
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn teacher_grades_long_answer() {
    let fx = fixture().await;
    let quiz = test_support::insert_quiz(fx.ctx.state.db(), &fx.course, questions(), 2, None).await;
    let base = quiz_uri(&fx, &quiz);

    let (_, started) =
        send(&fx, Method::POST, &format!("{base}/attempts"), &fx.student_token, None).await;
    let attempt_id = started["id"].as_str().expect("attempt id").to_string();

    let (status, _) = send(
        &fx,
        Method::POST,
        &format!("{base}/attempts/{attempt_id}/grade"),
        &fx.teacher_token,
        Some(json!({"grades": [{"question_id": "essay", "points": 3}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &fx,
        Method::POST,
        &format!("{base}/attempts/{attempt_id}/submit"),
        &fx.student_token,
        Some(json!({"answers": {
            "capital": 1,
            "g": "9.81",
            "essay": "An object keeps its state of motion"
        }})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &fx,
        Method::POST,
        &format!("{base}/attempts/{attempt_id}/grade"),
        &fx.teacher_token,
        Some(json!({"grades": [{"question_id": "capital", "points": 1}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");

    let (status, graded) = send(
        &fx,
        Method::POST,
        &format!("{base}/attempts/{attempt_id}/grade"),
        &fx.teacher_token,
        Some(json!({"grades": [{"question_id": "essay", "points": 3, "feedback": "Clear"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {graded}");
    assert_eq!(graded["score"], 6.0);
    assert_eq!(graded["percentage"], 100.0);
    assert_eq!(graded["passed"], true);
    assert_eq!(graded["needs_manual_grading"], false);
    assert_eq!(graded["answers"][2]["feedback"], "Clear");

    let (_, listed) = send(
        &fx,
        Method::GET,
        &format!("{base}/attempts?student_id={}", fx.student_id),
        &fx.teacher_token,
        None,
    )
    .await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn questions_are_frozen_once_attempts_exist() {
    let fx = fixture().await;
    let quiz = test_support::insert_quiz(fx.ctx.state.db(), &fx.course, questions(), 3, None).await;
    let base = quiz_uri(&fx, &quiz);

    let (status, _) =
        send(&fx, Method::POST, &format!("{base}/attempts"), &fx.student_token, None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &fx,
        Method::PATCH,
        &base,
        &fx.teacher_token,
        Some(json!({"questions": [{"type": "essay", "prompt": "Replace"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, renamed) =
        send(&fx, Method::PATCH, &base, &fx.teacher_token, Some(json!({"title": "Renamed"}))).await;
    assert_eq!(status, StatusCode::OK, "response: {renamed}");
    assert_eq!(renamed["title"], "Renamed");
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn late_submission_abandons_attempt() {
    let fx = fixture().await;
    let quiz =
        test_support::insert_quiz(fx.ctx.state.db(), &fx.course, questions(), 3, Some(5)).await;
    let attempt = insert_timed_attempt(&fx, &quiz, 10, 5).await;
    let base = quiz_uri(&fx, &quiz);

    let (status, _) = send(
        &fx,
        Method::POST,
        &format!("{base}/attempts/{}/submit", attempt.id),
        &fx.student_token,
        Some(json!({"answers": {"capital": "Paris"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, fetched) =
        send(&fx, Method::GET, &format!("{base}/attempts/{}", attempt.id), &fx.student_token, None)
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "abandoned");

    let (status, next) =
        send(&fx, Method::POST, &format!("{base}/attempts"), &fx.student_token, None).await;
    assert_eq!(status, StatusCode::CREATED, "response: {next}");
    assert_eq!(next["attempt_number"], 2);
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn drafts_are_hidden_from_students() {
    let fx = fixture().await;
    let quiz = test_support::insert_quiz(fx.ctx.state.db(), &fx.course, questions(), 3, None).await;
    let base = quiz_uri(&fx, &quiz);

    let (status, body) =
        send(&fx, Method::POST, &format!("{base}/unpublish"), &fx.teacher_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_published"], false);

    let (status, _) = send(&fx, Method::GET, &base, &fx.student_token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) =
        send(&fx, Method::POST, &format!("{base}/attempts"), &fx.student_token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn attempt_start_waits_for_question_edit_and_uses_new_total() {
    let fx = fixture().await;
    let quiz = test_support::insert_quiz(fx.ctx.state.db(), &fx.course, questions(), 3, None).await;
    let base = quiz_uri(&fx, &quiz);

    let mut holder = fx.ctx.state.db().begin().await.expect("begin");
    repositories::quiz_attempts::lock_for_student(&mut *holder, &quiz.id, &fx.student_id)
        .await
        .expect("hold attempt lock");

    let start = tokio::spawn(fx.ctx.app.clone().oneshot(test_support::json_request(
        Method::POST,
        &format!("{base}/attempts"),
        Some(&fx.student_token),
        None,
    )));
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let (status, patched) = send(
        &fx,
        Method::PATCH,
        &base,
        &fx.teacher_token,
        Some(json!({"questions": [
            {"id": "only", "type": "mcq", "prompt": "Pick", "options": ["a", "b"], "answer": 0, "points": 10}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {patched}");
    assert_eq!(patched["total_points"], 10.0);

    holder.rollback().await.expect("release attempt lock");
    let response = start.await.expect("join start").expect("start request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let started = test_support::read_json(response).await;
    assert_eq!(started["total_points"], 10.0);
    let attempt_id = started["id"].as_str().expect("attempt id").to_string();

    let (status, submitted) = send(
        &fx,
        Method::POST,
        &format!("{base}/attempts/{attempt_id}/submit"),
        &fx.student_token,
        Some(json!({"answers": {"only": "a"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {submitted}");
    assert_eq!(submitted["score"], 10.0);
    assert_eq!(submitted["percentage"], 100.0);
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn abandon_is_owner_only_and_single_shot() {
    let fx = fixture().await;
    let other = test_support::insert_student(fx.ctx.state.db(), "other@classhub.test").await;
    test_support::enroll(fx.ctx.state.db(), &fx.course.id, &other.id).await;
    let other_token = test_support::bearer_token(&other, fx.ctx.state.settings());

    let quiz = test_support::insert_quiz(fx.ctx.state.db(), &fx.course, questions(), 3, None).await;
    let base = quiz_uri(&fx, &quiz);
    let (_, started) =
        send(&fx, Method::POST, &format!("{base}/attempts"), &fx.student_token, None).await;
    let abandon = format!("{base}/attempts/{}/abandon", started["id"].as_str().expect("attempt id"));

    let (status, _) = send(&fx, Method::POST, &abandon, &other_token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, abandoned) = send(&fx, Method::POST, &abandon, &fx.student_token, None).await;
    assert_eq!(status, StatusCode::OK, "response: {abandoned}");
    assert_eq!(abandoned["status"], "abandoned");
    assert!(abandoned["updated_at"].is_string());

    let (status, body) = send(&fx, Method::POST, &abandon, &fx.student_token, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Attempt is not in progress");
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn expired_attempt_is_abandoned_when_starting_again() {
    let fx = fixture().await;
    let quiz =
        test_support::insert_quiz(fx.ctx.state.db(), &fx.course, questions(), 3, Some(5)).await;
    let expired = insert_timed_attempt(&fx, &quiz, 10, 5).await;
    let base = quiz_uri(&fx, &quiz);

    let (status, next) =
        send(&fx, Method::POST, &format!("{base}/attempts"), &fx.student_token, None).await;
    assert_eq!(status, StatusCode::CREATED, "response: {next}");
    assert_eq!(next["attempt_number"], 2);
    assert_ne!(next["id"], expired.id.as_str());

    let (_, old) =
        send(&fx, Method::GET, &format!("{base}/attempts/{}", expired.id), &fx.student_token, None)
            .await;
    assert_eq!(old["status"], "abandoned");
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn attempt_inside_grace_window_is_resumed_and_submittable() {
    let fx = fixture().await;
    let quiz =
        test_support::insert_quiz(fx.ctx.state.db(), &fx.course, questions(), 3, Some(5)).await;
    let started_at = primitive_now_utc() - time::Duration::minutes(5) - time::Duration::seconds(10);
    let attempt = repositories::quiz_attempts::create(
        fx.ctx.state.db(),
        repositories::quiz_attempts::CreateAttempt {
            id: &Uuid::new_v4().to_string(),
            quiz_id: &quiz.id,
            course_id: &quiz.course_id,
            student_id: &fx.student_id,
            attempt_number: 1,
            total_points: quiz.total_points,
            started_at,
            expires_at: Some(started_at + time::Duration::minutes(5)),
        },
    )
    .await
    .expect("insert attempt");
    let base = quiz_uri(&fx, &quiz);

    let (status, resumed) =
        send(&fx, Method::POST, &format!("{base}/attempts"), &fx.student_token, None).await;
    assert_eq!(status, StatusCode::OK, "response: {resumed}");
    assert_eq!(resumed["id"], attempt.id.as_str());

    let (status, submitted) = send(
        &fx,
        Method::POST,
        &format!("{base}/attempts/{}/submit", attempt.id),
        &fx.student_token,
        Some(json!({"answers": {"capital": "Paris"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {submitted}");
    assert_eq!(submitted["status"], "completed");
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn abandoned_attempts_count_toward_the_cap() {
    let fx = fixture().await;
    let quiz = test_support::insert_quiz(fx.ctx.state.db(), &fx.course, questions(), 1, None).await;
    let base = quiz_uri(&fx, &quiz);

    let (status, started) =
        send(&fx, Method::POST, &format!("{base}/attempts"), &fx.student_token, None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &fx,
        Method::POST,
        &format!("{base}/attempts/{}/abandon", started["id"].as_str().expect("attempt id")),
        &fx.student_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        send(&fx, Method::POST, &format!("{base}/attempts"), &fx.student_token, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Maximum attempts reached");
}
