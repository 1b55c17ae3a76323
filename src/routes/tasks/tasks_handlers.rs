use actix_web::{web, HttpResponse};
use log::info;

use super::tasks_models::{CreateTaskRequest, StatusQuery, TaskData, TaskListData, UpdateTaskRequest};
use crate::access::require_member;
use crate::error::{ApiError, ApiResult};
use crate::models::task::{Task, TaskStatus};
use crate::response::Envelope;
use crate::session::AuthUser;
use crate::state::AppState;
use crate::store::Store;

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found".into())
}

async fn require_assignable(store: &dyn Store, project_id: i64, assignee: Option<i64>) -> ApiResult<()> {
    if let Some(user_id) = assignee {
        if !store.is_member(project_id, user_id).await? {
            return Err(ApiError::BadRequest(
                "Assigned user is not a member of this project".into(),
            ));
        }
    }
    Ok(())
}

/// Loads a task the caller may see through membership of its project.
async fn member_task(store: &dyn Store, task_id: i64, user_id: i64) -> ApiResult<Task> {
    let task = store.find_task(task_id).await?.ok_or_else(task_not_found)?;
    require_member(store, task.project_id, user_id).await?;
    Ok(task)
}

pub async fn create_task(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<i64>,
    request: web::Json<CreateTaskRequest>,
) -> ApiResult<HttpResponse> {
    let project_id = path.into_inner();
    require_member(state.store.as_ref(), project_id, auth.id()).await?;
    let new_task = request.into_inner().validate()?;
    require_assignable(state.store.as_ref(), project_id, new_task.assigned_to_user_id).await?;

    let task = state.store.create_task(project_id, new_task).await?;

    info!("New task created: {} in project {}", task.title, project_id);
    Ok(HttpResponse::Created().json(Envelope::with_message(
        "Task created successfully",
        TaskData { task },
    )))
}

pub async fn get_project_tasks(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let project_id = path.into_inner();
    require_member(state.store.as_ref(), project_id, auth.id()).await?;

    let tasks = state.store.project_tasks(project_id, None).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(TaskListData { tasks })))
}

pub async fn get_tasks_by_status(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<i64>,
    query: web::Query<StatusQuery>,
) -> ApiResult<HttpResponse> {
    let project_id = path.into_inner();
    require_member(state.store.as_ref(), project_id, auth.id()).await?;

    let status: TaskStatus = query
        .into_inner()
        .status
        .and_then(|status| status.parse().ok())
        .ok_or_else(|| {
            ApiError::BadRequest("Valid status is required (To-Do, In Progress, Done)".into())
        })?;

    let tasks = state.store.project_tasks(project_id, Some(status)).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(TaskListData { tasks })))
}

// Tasks assigned to the caller across every project
pub async fn get_my_tasks(state: web::Data<AppState>, auth: AuthUser) -> ApiResult<HttpResponse> {
    let tasks = state.store.assigned_tasks(auth.id()).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(TaskListData { tasks })))
}

pub async fn get_task(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let task = member_task(state.store.as_ref(), path.into_inner(), auth.id()).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(TaskData { task })))
}

pub async fn update_task(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<i64>,
    request: web::Json<UpdateTaskRequest>,
) -> ApiResult<HttpResponse> {
    let task_id = path.into_inner();
    let current = member_task(state.store.as_ref(), task_id, auth.id()).await?;
    let changes = request.into_inner().validate()?;
    require_assignable(
        state.store.as_ref(),
        current.project_id,
        changes.assigned_to_user_id.flatten(),
    )
    .await?;

    state.store.update_task(task_id, changes).await?;
    let task = state
        .store
        .find_task(task_id)
        .await?
        .ok_or_else(task_not_found)?;

    info!("Task {} updated by user {}", task_id, auth.user.username);
    Ok(HttpResponse::Ok().json(Envelope::with_message(
        "Task updated successfully",
        TaskData { task },
    )))
}

pub async fn delete_task(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let task_id = path.into_inner();
    member_task(state.store.as_ref(), task_id, auth.id()).await?;

    if !state.store.delete_task(task_id).await? {
        return Err(task_not_found());
    }

    info!("Task {} deleted by user {}", task_id, auth.user.username);
    Ok(HttpResponse::Ok().json(Envelope::message("Task deleted successfully")))
}
