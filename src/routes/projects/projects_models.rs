use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::comment::Comment;
use crate::models::project::{NewProject, Project, ProjectMember};
use crate::models::task::Task;
use crate::validation::{check_positive_id, check_short_text, trimmed, Violations};

// Create / update project request
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl ProjectRequest {
    pub fn validate(self) -> Result<NewProject, ApiError> {
        let name = trimmed(self.name);
        let mut violations = Violations::new();
        check_short_text(&mut violations, name.as_deref(), "Project name", true);
        violations.into_result()?;
        Ok(NewProject {
            name: name.unwrap_or_default(),
            description: trimmed(self.description),
        })
    }
}

// Add member request
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AddMemberRequest {
    pub user_id: Option<i64>,
}

impl AddMemberRequest {
    pub fn validate(self) -> Result<i64, ApiError> {
        let mut violations = Violations::new();
        match self.user_id {
            Some(_) => check_positive_id(&mut violations, self.user_id, "User ID"),
            None => violations.push("User ID is required"),
        }
        violations.into_result()?;
        Ok(self.user_id.unwrap_or_default())
    }
}

#[derive(Serialize)]
pub struct ProjectData {
    pub project: Project,
}

#[derive(Serialize)]
pub struct ProjectListData {
    pub projects: Vec<Project>,
}

/// A project together with its members, tasks and latest comments.
#[derive(Serialize)]
pub struct ProjectDetails {
    #[serde(flatten)]
    pub project: Project,
    pub members: Vec<ProjectMember>,
    pub tasks: Vec<Task>,
    pub comments: Vec<Comment>,
}

#[derive(Serialize)]
pub struct ProjectDetailsData {
    pub project: ProjectDetails,
}

#[derive(Serialize)]
pub struct MemberData {
    pub member: ProjectMember,
}
