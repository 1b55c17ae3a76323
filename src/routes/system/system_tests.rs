use actix_web::http::{Method, StatusCode};
use actix_web::test;

use crate::routes::build_app;
use crate::test_support::{call_json, test_state};

#[actix_web::test]
async fn health_reports_environment() {
    let app = test::init_service(build_app(test_state())).await;

    let (status, body) = call_json(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "SynergySphere API is running");
    assert_eq!(body["environment"], "test");
    assert!(body["timestamp"].is_string());
}

#[actix_web::test]
async fn root_and_index_are_public() {
    let app = test::init_service(build_app(test_state())).await;

    let (status, body) = call_json(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["health"], "/health");

    let (status, body) = call_json(&app, Method::GET, "/api", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"]["tasks"]["mine"], "GET /api/tasks/my-tasks");
}

#[actix_web::test]
async fn unknown_routes_name_the_path() {
    let app = test::init_service(build_app(test_state())).await;

    let (status, body) = call_json(&app, Method::GET, "/nowhere/at/all", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not Found - /nowhere/at/all");
}
