use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn signup_creates_student_and_returns_token() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "Ada@Example.com",
                "full_name": "Ada Lovelace",
                "password": "analytical-engine"
            })),
        ))
        .await
        .expect("signup");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["role"], "student");

    let token = body["access_token"].as_str().expect("token").to_string();
    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", Some(&token), None))
        .await
        .expect("me");
    let status = response.status();
    let me = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {me}");
    assert_eq!(me["full_name"], "Ada Lovelace");
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn signup_rejects_duplicate_email_and_short_password() {
    let ctx = test_support::setup_test_context().await;
    test_support::insert_student(ctx.state.db(), "taken@classhub.test").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "TAKEN@classhub.test",
                "full_name": "Copycat",
                "password": "long-enough-password"
            })),
        ))
        .await
        .expect("signup duplicate");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({
                "email": "fresh@classhub.test",
                "full_name": "Short",
                "password": "short"
            })),
        ))
        .await
        .expect("signup short password");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert!(body["detail"].as_str().unwrap_or("").contains("Password must be at least"));
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn login_checks_password_and_active_flag() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_student(ctx.state.db(), "login@classhub.test").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "login@classhub.test", "password": "wrong-password"})),
        ))
        .await
        .expect("login wrong password");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "login@classhub.test", "password": "student-password"})),
        ))
        .await
        .expect("login");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["user"]["id"], user.id.as_str());

    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(&user.id)
        .execute(ctx.state.db())
        .await
        .expect("deactivate");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "login@classhub.test", "password": "student-password"})),
        ))
        .await
        .expect("login inactive");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn token_endpoint_accepts_password_form() {
    let ctx = test_support::setup_test_context().await;
    test_support::insert_teacher(ctx.state.db(), "form@classhub.test").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=form%40classhub.test&password=teacher-password"))
        .expect("form request");

    let response = ctx.app.oneshot(request).await.expect("token");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["user"]["role"], "teacher");
}

#[tokio::test]
#[ignore = "requires local postgres and redis"]
async fn login_is_rate_limited_per_email() {
    let ctx = test_support::setup_test_context().await;

    let mut last_status = StatusCode::OK;
    for _ in 0..11 {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({"email": "nobody@classhub.test", "password": "whatever-password"})),
            ))
            .await
            .expect("login attempt");
        last_status = response.status();
    }

    assert_eq!(last_status, StatusCode::TOO_MANY_REQUESTS);
}
