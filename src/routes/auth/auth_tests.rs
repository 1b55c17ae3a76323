use actix_web::http::{header, Method, StatusCode};
use actix_web::test;
use serde_json::json;

use crate::routes::build_app;
use crate::session::SESSION_COOKIE;
use crate::test_support::{call_json, register_user, test_state};

#[actix_web::test]
async fn register_returns_user_and_token() {
    let app = test::init_service(build_app(test_state())).await;

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "secret123",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(resp
        .response()
        .cookies()
        .any(|cookie| cookie.name() == SESSION_COOKIE));

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert!(body["data"]["user"].get("password_hash").is_none());
    assert!(!body["data"]["token"].as_str().unwrap().is_empty());
}

#[actix_web::test]
async fn register_reports_every_violation() {
    let app = test::init_service(build_app(test_state())).await;

    let (status, body) = call_json(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "a!", "email": "nope", "password": "123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Validation failed");
    let errors = body["errors"].as_array().unwrap();
    assert!(errors.contains(&json!("Username must contain only alphanumeric characters")));
    assert!(errors.contains(&json!("Username must be at least 3 characters long")));
    assert!(errors.contains(&json!("Please provide a valid email address")));
    assert!(errors.contains(&json!("Password must be at least 6 characters long")));
}

#[actix_web::test]
async fn register_rejects_taken_identity() {
    let app = test::init_service(build_app(test_state())).await;
    register_user(&app, "alice").await;

    let (status, body) = call_json(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": "someoneelse",
            "email": "ALICE@example.com",
            "password": "secret123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User with this email or username already exists");
}

#[actix_web::test]
async fn login_checks_credentials() {
    let app = test::init_service(build_app(test_state())).await;
    register_user(&app, "alice").await;

    let (status, body) = call_json(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wrongpass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, body) = call_json(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, body) = call_json(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["data"]["user"]["email"], "alice@example.com");
}

#[actix_web::test]
async fn profile_requires_a_token() {
    let app = test::init_service(build_app(test_state())).await;

    let (status, body) = call_json(&app, Method::GET, "/auth/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access denied. No token provided.");

    let (status, body) = call_json(&app, Method::GET, "/auth/profile", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token.");
}

#[actix_web::test]
async fn profile_accepts_the_session_cookie() {
    let app = test::init_service(build_app(test_state())).await;
    let (token, _) = register_user(&app, "alice").await;

    let req = test::TestRequest::get()
        .uri("/auth/profile")
        .cookie(actix_web::cookie::Cookie::new(SESSION_COOKIE, token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert!(body["data"]["user"]["created_at"].is_string());
}

#[actix_web::test]
async fn profile_update_changes_identity_and_password() {
    let app = test::init_service(build_app(test_state())).await;
    let (token, _) = register_user(&app, "alice").await;
    register_user(&app, "bob").await;

    let (status, body) = call_json(
        &app,
        Method::PUT,
        "/auth/profile",
        Some(&token),
        Some(json!({ "username": "bob", "email": "alice@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Username or email already exists");

    let (status, body) = call_json(
        &app,
        Method::PUT,
        "/auth/profile",
        Some(&token),
        Some(json!({
            "username": "alice2",
            "email": "alice2@example.com",
            "password": "newsecret",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["username"], "alice2");

    let (status, _) = call_json(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "alice2@example.com", "password": "newsecret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn logout_ends_the_session() {
    let app = test::init_service(build_app(test_state())).await;
    let (token, _) = register_user(&app, "alice").await;

    let req = test::TestRequest::post()
        .uri("/auth/logout")
        .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, body) = call_json(&app, Method::GET, "/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token.");
}

#[actix_web::test]
async fn malformed_json_is_a_validation_error() {
    let app = test::init_service(build_app(test_state())).await;

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Validation failed");
}
