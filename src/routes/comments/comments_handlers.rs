use actix_web::{web, HttpResponse};
use log::info;

use super::comments_models::{
    CommentData, CommentListData, CommentPageData, CommentRequest, EditCommentRequest, PageQuery,
    Pagination, RecentQuery,
};
use crate::access::require_member;
use crate::error::{ApiError, ApiResult};
use crate::models::comment::{thread_comments, Comment};
use crate::response::Envelope;
use crate::session::AuthUser;
use crate::state::AppState;
use crate::store::Store;

/// Loads a comment only when `user_id` wrote it.
async fn authored_comment(
    store: &dyn Store,
    comment_id: i64,
    user_id: i64,
    action: &str,
) -> ApiResult<Comment> {
    store
        .find_comment(comment_id)
        .await?
        .filter(|comment| comment.user_id == user_id)
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "Comment not found or you do not have permission to {action} it"
            ))
        })
}

// Post a message, optionally as a reply within the same project
pub async fn create_comment(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<i64>,
    request: web::Json<CommentRequest>,
) -> ApiResult<HttpResponse> {
    let project_id = path.into_inner();
    require_member(state.store.as_ref(), project_id, auth.id()).await?;
    let new_comment = request.into_inner().validate()?;

    if let Some(parent_id) = new_comment.parent_comment_id {
        let parent = state.store.find_comment(parent_id).await?;
        if !parent.is_some_and(|parent| parent.project_id == project_id) {
            return Err(ApiError::BadRequest(
                "Parent comment not found or does not belong to this project".into(),
            ));
        }
    }

    let comment = state
        .store
        .create_comment(project_id, auth.id(), new_comment)
        .await?;

    info!("New comment added to project {} by user {}", project_id, auth.user.username);
    Ok(HttpResponse::Created().json(Envelope::with_message(
        "Comment created successfully",
        CommentData { comment },
    )))
}

// One page of a project's messages, nested into reply threads
pub async fn get_project_comments(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let project_id = path.into_inner();
    require_member(state.store.as_ref(), project_id, auth.id()).await?;
    let page = query.into_inner().validate()?;

    let total = state.store.count_project_comments(project_id).await?;
    let comments = state
        .store
        .project_comments(project_id, page.limit, page.offset)
        .await?;

    Ok(HttpResponse::Ok().json(Envelope::data(CommentPageData {
        comments: thread_comments(comments),
        pagination: Pagination::new(page, total),
    })))
}

pub async fn get_recent_comments(
    state: web::Data<AppState>,
    auth: AuthUser,
    query: web::Query<RecentQuery>,
) -> ApiResult<HttpResponse> {
    let limit = query.into_inner().validate()?;
    let comments = state.store.recent_comments(auth.id(), limit).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(CommentListData { comments })))
}

pub async fn get_comment(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let comment = state
        .store
        .find_comment(path.into_inner())
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".into()))?;
    require_member(state.store.as_ref(), comment.project_id, auth.id()).await?;

    Ok(HttpResponse::Ok().json(Envelope::data(CommentData { comment })))
}

pub async fn update_comment(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<i64>,
    request: web::Json<EditCommentRequest>,
) -> ApiResult<HttpResponse> {
    let comment_id = path.into_inner();
    let content = request.into_inner().validate()?;
    authored_comment(state.store.as_ref(), comment_id, auth.id(), "edit").await?;

    state.store.update_comment(comment_id, &content).await?;
    let comment = state
        .store
        .find_comment(comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".into()))?;

    info!("Comment {} updated by user {}", comment_id, auth.user.username);
    Ok(HttpResponse::Ok().json(Envelope::with_message(
        "Comment updated successfully",
        CommentData { comment },
    )))
}

// Deleting a comment takes its replies with it
pub async fn delete_comment(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let comment_id = path.into_inner();
    authored_comment(state.store.as_ref(), comment_id, auth.id(), "delete").await?;

    state.store.delete_comment(comment_id).await?;

    info!("Comment {} deleted by user {}", comment_id, auth.user.username);
    Ok(HttpResponse::Ok().json(Envelope::message("Comment deleted successfully")))
}
