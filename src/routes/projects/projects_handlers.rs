use actix_web::{web, HttpResponse};
use log::info;

use super::projects_models::{
    AddMemberRequest, MemberData, ProjectData, ProjectDetails, ProjectDetailsData,
    ProjectListData, ProjectRequest,
};
use crate::access::{require_creator, require_member};
use crate::error::{ApiError, ApiResult};
use crate::response::Envelope;
use crate::session::AuthUser;
use crate::state::AppState;

/// How many of the newest comments the project detail view embeds.
const DETAIL_COMMENT_LIMIT: i64 = 10;

// Handler to create a project; the creator joins it as first member
pub async fn create_project(
    state: web::Data<AppState>,
    auth: AuthUser,
    request: web::Json<ProjectRequest>,
) -> ApiResult<HttpResponse> {
    let new_project = request.into_inner().validate()?;
    let project = state.store.create_project(new_project, auth.id()).await?;

    info!("New project created: {} by user {}", project.name, auth.user.username);
    Ok(HttpResponse::Created().json(Envelope::with_message(
        "Project created successfully",
        ProjectData { project },
    )))
}

// Handler to get the projects the caller belongs to
pub async fn get_projects(state: web::Data<AppState>, auth: AuthUser) -> ApiResult<HttpResponse> {
    let projects = state.store.projects_for_member(auth.id()).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(ProjectListData { projects })))
}

// Handler to get project details with members, tasks and recent comments
pub async fn get_project(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let project_id = path.into_inner();
    let project = require_member(state.store.as_ref(), project_id, auth.id()).await?;

    let members = state.store.project_members(project_id).await?;
    let tasks = state.store.project_tasks(project_id, None).await?;
    let comments = state
        .store
        .project_comments(project_id, DETAIL_COMMENT_LIMIT, 0)
        .await?;

    Ok(HttpResponse::Ok().json(Envelope::data(ProjectDetailsData {
        project: ProjectDetails {
            project,
            members,
            tasks,
            comments,
        },
    })))
}

// Handler to update a project
pub async fn update_project(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<i64>,
    request: web::Json<ProjectRequest>,
) -> ApiResult<HttpResponse> {
    let project_id = path.into_inner();
    require_creator(state.store.as_ref(), project_id, auth.id()).await?;
    let changes = request.into_inner().validate()?;

    state.store.update_project(project_id, changes).await?;
    let project = state
        .store
        .find_project(project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))?;

    info!("Project {} updated by user {}", project_id, auth.user.username);
    Ok(HttpResponse::Ok().json(Envelope::with_message(
        "Project updated successfully",
        ProjectData { project },
    )))
}

// Handler to delete a project with its tasks, members and comments
pub async fn delete_project(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let project_id = path.into_inner();
    require_creator(state.store.as_ref(), project_id, auth.id()).await?;

    state.store.delete_project(project_id).await?;

    info!("Project {} deleted by user {}", project_id, auth.user.username);
    Ok(HttpResponse::Ok().json(Envelope::message("Project deleted successfully")))
}

// Handler to add a member
pub async fn add_member(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<i64>,
    request: web::Json<AddMemberRequest>,
) -> ApiResult<HttpResponse> {
    let project_id = path.into_inner();
    require_creator(state.store.as_ref(), project_id, auth.id()).await?;
    let user_id = request.into_inner().validate()?;

    let Some(user) = state.store.find_user(user_id).await? else {
        info!("Cannot add unknown user {} to project {}", user_id, project_id);
        return Err(ApiError::NotFound("User not found".into()));
    };
    if state.store.is_member(project_id, user_id).await? {
        return Err(ApiError::Conflict(
            "User is already a member of this project".into(),
        ));
    }

    state.store.add_member(project_id, user_id).await?;
    let member = state
        .store
        .project_members(project_id)
        .await?
        .into_iter()
        .find(|member| member.id == user_id)
        .ok_or_else(|| ApiError::Internal(format!("member {user_id} missing after insert")))?;

    info!("User {} added to project {}", user.username, project_id);
    Ok(HttpResponse::Created().json(Envelope::with_message(
        "Member added to project successfully",
        MemberData { member },
    )))
}

// Handler to remove a member; the creator always stays
pub async fn remove_member(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<(i64, i64)>,
) -> ApiResult<HttpResponse> {
    let (project_id, member_id) = path.into_inner();
    let project = require_creator(state.store.as_ref(), project_id, auth.id()).await?;

    if member_id == project.created_by_user_id {
        return Err(ApiError::BadRequest(
            "Project creator cannot be removed from the project".into(),
        ));
    }
    if !state.store.remove_member(project_id, member_id).await? {
        return Err(ApiError::NotFound("Member not found in this project".into()));
    }

    info!("User {} removed from project {}", member_id, project_id);
    Ok(HttpResponse::Ok().json(Envelope::message(
        "Member removed from project successfully",
    )))
}
