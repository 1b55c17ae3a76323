//! Project-level permission checks shared by the project, task and comment routes.

use crate::error::ApiError;
use crate::models::project::Project;
use crate::store::Store;

async fn existing_project(store: &dyn Store, project_id: i64) -> Result<Project, ApiError> {
    store
        .find_project(project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".into()))
}

/// Loads the project if `user_id` belongs to it.
pub async fn require_member(
    store: &dyn Store,
    project_id: i64,
    user_id: i64,
) -> Result<Project, ApiError> {
    let project = existing_project(store, project_id).await?;
    if !store.is_member(project_id, user_id).await? {
        return Err(ApiError::Forbidden(
            "Access denied. You are not a member of this project.".into(),
        ));
    }
    Ok(project)
}

/// Loads the project if `user_id` created it.
pub async fn require_creator(
    store: &dyn Store,
    project_id: i64,
    user_id: i64,
) -> Result<Project, ApiError> {
    let project = existing_project(store, project_id).await?;
    if project.created_by_user_id != user_id {
        return Err(ApiError::Forbidden(
            "Access denied. Only project creator can perform this action.".into(),
        ));
    }
    Ok(project)
}
