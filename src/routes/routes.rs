use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App};

use super::auth::auth_handlers;
use super::comments::comments_handlers;
use super::projects::projects_handlers;
use super::system::system_handlers;
use super::tasks::tasks_handlers;
use crate::state::AppState;
use crate::validation::{json_config, path_config, query_config};

pub fn system_configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(system_handlers::root))
        .route("/health", web::get().to(system_handlers::health))
        .route("/api", web::get().to(system_handlers::api_index));
}

pub fn auth_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(auth_handlers::register))
            .route("/login", web::post().to(auth_handlers::login))
            .route("/profile", web::get().to(auth_handlers::get_profile))
            .route("/profile", web::put().to(auth_handlers::update_profile))
            .route("/logout", web::post().to(auth_handlers::logout)),
    );
}

pub fn projects_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/projects")
            .route("", web::post().to(projects_handlers::create_project))
            .route("", web::get().to(projects_handlers::get_projects))
            .route("/", web::post().to(projects_handlers::create_project))
            .route("/", web::get().to(projects_handlers::get_projects))
            .route("/{id}", web::get().to(projects_handlers::get_project))
            .route("/{id}", web::put().to(projects_handlers::update_project))
            .route("/{id}", web::delete().to(projects_handlers::delete_project))
            .route("/{id}/members", web::post().to(projects_handlers::add_member))
            .route(
                "/{id}/members/{member_id}",
                web::delete().to(projects_handlers::remove_member),
            ),
    );
}

pub fn tasks_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tasks")
            .route("/my-tasks", web::get().to(tasks_handlers::get_my_tasks))
            .route("/projects/{id}/tasks", web::post().to(tasks_handlers::create_task))
            .route("/projects/{id}/tasks", web::get().to(tasks_handlers::get_project_tasks))
            .route(
                "/projects/{id}/tasks/status",
                web::get().to(tasks_handlers::get_tasks_by_status),
            )
            .route("/{id}", web::get().to(tasks_handlers::get_task))
            .route("/{id}", web::put().to(tasks_handlers::update_task))
            .route("/{id}", web::delete().to(tasks_handlers::delete_task)),
    );
}

pub fn comments_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/comments")
            .route("/recent", web::get().to(comments_handlers::get_recent_comments))
            .route(
                "/projects/{id}/messages",
                web::post().to(comments_handlers::create_comment),
            )
            .route(
                "/projects/{id}/messages",
                web::get().to(comments_handlers::get_project_comments),
            )
            .route("/{id}", web::get().to(comments_handlers::get_comment))
            .route("/{id}", web::put().to(comments_handlers::update_comment))
            .route("/{id}", web::delete().to(comments_handlers::delete_comment)),
    );
}

/// The full application: shared state, extractor configs and every route.
pub fn build_app(
    state: web::Data<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .configure(system_configure)
        .configure(auth_configure)
        .configure(projects_configure)
        .configure(tasks_configure)
        .configure(comments_configure)
        .default_service(web::to(system_handlers::not_found))
}
