use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "SynergySphere API is running",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": state.config.environment,
    }))
}

pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Welcome to SynergySphere API",
        "version": env!("CARGO_PKG_VERSION"),
        "documentation": "/api",
        "health": "/health",
    }))
}

// Endpoint index grouped by area
pub async fn api_index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "SynergySphere API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": {
                "register": "POST /auth/register",
                "login": "POST /auth/login",
                "profile": "GET /auth/profile",
                "updateProfile": "PUT /auth/profile",
                "logout": "POST /auth/logout",
            },
            "projects": {
                "create": "POST /api/projects",
                "list": "GET /api/projects",
                "get": "GET /api/projects/:id",
                "update": "PUT /api/projects/:id",
                "delete": "DELETE /api/projects/:id",
                "addMember": "POST /api/projects/:id/members",
                "removeMember": "DELETE /api/projects/:id/members/:memberId",
            },
            "tasks": {
                "create": "POST /api/tasks/projects/:id/tasks",
                "list": "GET /api/tasks/projects/:id/tasks",
                "byStatus": "GET /api/tasks/projects/:id/tasks/status?status=",
                "mine": "GET /api/tasks/my-tasks",
                "get": "GET /api/tasks/:id",
                "update": "PUT /api/tasks/:id",
                "delete": "DELETE /api/tasks/:id",
            },
            "comments": {
                "create": "POST /api/comments/projects/:id/messages",
                "list": "GET /api/comments/projects/:id/messages?page=&limit=",
                "recent": "GET /api/comments/recent?limit=",
                "get": "GET /api/comments/:id",
                "update": "PUT /api/comments/:id",
                "delete": "DELETE /api/comments/:id",
            },
        },
    }))
}

pub async fn not_found(req: HttpRequest) -> ApiResult<HttpResponse> {
    Err(ApiError::NotFound(format!("Not Found - {}", req.path())))
}
