//! Helpers for driving the full route table against an in-memory store.

use std::sync::Arc;

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, Method, StatusCode};
use actix_web::{test, web};
use chrono::Duration;
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::store::MemoryStore;

pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        database_url: None,
        max_connections: 1,
        session_ttl: Duration::hours(1),
        bcrypt_cost: 4,
        environment: "test".into(),
    }
}

pub fn test_state() -> web::Data<AppState> {
    web::Data::new(AppState::new(Arc::new(MemoryStore::new()), test_config()))
}

/// Sends a request and returns the status with the parsed JSON body.
pub async fn call_json<S, B>(
    app: &S,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let mut req = test::TestRequest::default().method(method).uri(uri);
    if let Some(token) = token {
        req = req.insert_header((header::AUTHORIZATION, format!("Bearer {token}")));
    }
    if let Some(body) = body {
        req = req.set_json(body);
    }
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// Registers `username` and returns its session token and user id.
pub async fn register_user<S, B>(app: &S, username: &str) -> (String, i64)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = call_json(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "secret123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register {username}: {body}");
    let token = body["data"]["token"].as_str().unwrap_or_default().to_string();
    let id = body["data"]["user"]["id"].as_i64().unwrap_or_default();
    (token, id)
}

/// Creates a project owned by the token's user and returns its id.
pub async fn create_project<S, B>(app: &S, token: &str, name: &str) -> i64
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = call_json(
        app,
        Method::POST,
        "/api/projects",
        Some(token),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create project {name}: {body}");
    body["data"]["project"]["id"].as_i64().unwrap_or_default()
}

/// Adds `user_id` to the project as its creator.
pub async fn add_member<S, B>(app: &S, token: &str, project_id: i64, user_id: i64)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = call_json(
        app,
        Method::POST,
        &format!("/api/projects/{project_id}/members"),
        Some(token),
        Some(json!({ "user_id": user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "add member {user_id}: {body}");
}
