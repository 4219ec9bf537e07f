use crate::test_support::{body_json, TestApp};
use axum::http::{Method, StatusCode};
use serde_json::json;

async fn post(app: &TestApp, uri: &str, body: serde_json::Value) -> axum::response::Response {
    app.request(Method::POST, uri, None, Some(body)).await
}

#[tokio::test]
async fn test_signup_normalizes_email() {
    let app = TestApp::new();
    let response = post(
        &app,
        "/api/auth/signup",
        json!({"email": "Cook@EXAMPLE.com", "password": "testpass123", "name": " Cook "}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert!(body["token"].as_str().unwrap().len() > 10);

    let user = app
        .state
        .store
        .find_user_by_email("Cook@example.com")
        .unwrap()
        .unwrap();
    assert_eq!(user.id, body["user_id"].as_i64().unwrap());
    assert_eq!(user.name, "Cook");
    assert!(!user.is_staff);
    assert_ne!(user.password_hash, "testpass123");
}

#[tokio::test]
async fn test_signup_duplicate_email() {
    let app = TestApp::new();
    app.signup("cook@example.com").await;
    let response = post(
        &app,
        "/api/auth/signup",
        json!({"email": "cook@EXAMPLE.COM", "password": "other"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_requires_email_and_password() {
    let app = TestApp::new();
    let response = post(
        &app,
        "/api/auth/signup",
        json!({"email": "", "password": "testpass123"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["email"].is_array());

    let response = post(
        &app,
        "/api/auth/signup",
        json!({"email": "cook@example.com", "password": ""}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["password"].is_array());
}

#[tokio::test]
async fn test_login_issues_working_token() {
    let app = TestApp::new();
    app.signup("cook@example.com").await;

    let response = post(
        &app,
        "/api/auth/login",
        json!({"email": "cook@Example.com", "password": "testpass123"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request(Method::GET, "/api/recipes", Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_bad_credentials() {
    let app = TestApp::new();
    app.signup("cook@example.com").await;

    let response = post(
        &app,
        "/api/auth/login",
        json!({"email": "cook@example.com", "password": "wrong"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post(
        &app,
        "/api/auth/login",
        json!({"email": "nobody@example.com", "password": "testpass123"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid credentials");
}
