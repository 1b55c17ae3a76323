//! Persistence for users, sessions, projects, tasks and comments.
//!
//! Handlers only see the [`Store`] trait. [`MySqlStore`] is the production
//! back end; [`MemoryStore`] keeps everything in process and backs the test
//! suite as well as deployments started without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::comment::{Comment, NewComment};
use crate::models::project::{NewProject, Project, ProjectMember};
use crate::models::session::Session;
use crate::models::task::{NewTask, Task, TaskChanges, TaskStatus};
use crate::models::user::{NewUser, User};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key was violated; carries the offending column when known.
    #[error("duplicate {0}")]
    Duplicate(String),
    #[error("referenced record not found")]
    MissingReference,
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                let message = db.message();
                let field = if message.contains("username") {
                    "username"
                } else if message.contains("email") {
                    "email"
                } else {
                    "record"
                };
                return StoreError::Duplicate(field.to_string());
            }
            if db.is_foreign_key_violation() {
                return StoreError::MissingReference;
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Whether another account already uses `username` or `email`.
    async fn identity_taken(
        &self,
        username: &str,
        email: &str,
        excluding: Option<i64>,
    ) -> StoreResult<bool>;
    async fn update_user(&self, id: i64, username: &str, email: &str) -> StoreResult<()>;
    async fn update_password(&self, id: i64, password_hash: &str) -> StoreResult<()>;

    async fn create_session(&self, session: &Session) -> StoreResult<()>;
    async fn find_session(&self, session_id: &str) -> StoreResult<Option<Session>>;
    async fn delete_session(&self, session_id: &str) -> StoreResult<bool>;
    /// Drops every session that expired at or before `now`.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64>;

    /// Inserts the project and makes `creator` its first member.
    async fn create_project(&self, project: NewProject, creator: i64) -> StoreResult<Project>;
    async fn find_project(&self, id: i64) -> StoreResult<Option<Project>>;
    async fn projects_for_member(&self, user_id: i64) -> StoreResult<Vec<Project>>;
    async fn update_project(&self, id: i64, project: NewProject) -> StoreResult<()>;
    /// Removes the project together with its members, tasks and comments.
    async fn delete_project(&self, id: i64) -> StoreResult<()>;

    async fn project_members(&self, project_id: i64) -> StoreResult<Vec<ProjectMember>>;
    async fn is_member(&self, project_id: i64, user_id: i64) -> StoreResult<bool>;
    async fn add_member(&self, project_id: i64, user_id: i64) -> StoreResult<()>;
    /// Removes the membership and unassigns the user's tasks in that project.
    async fn remove_member(&self, project_id: i64, user_id: i64) -> StoreResult<bool>;

    async fn create_task(&self, project_id: i64, task: NewTask) -> StoreResult<Task>;
    async fn find_task(&self, id: i64) -> StoreResult<Option<Task>>;
    async fn project_tasks(
        &self,
        project_id: i64,
        status: Option<TaskStatus>,
    ) -> StoreResult<Vec<Task>>;
    /// Tasks assigned to the user across projects, with `project_name` set.
    async fn assigned_tasks(&self, user_id: i64) -> StoreResult<Vec<Task>>;
    async fn update_task(&self, id: i64, changes: TaskChanges) -> StoreResult<()>;
    async fn delete_task(&self, id: i64) -> StoreResult<bool>;

    async fn create_comment(
        &self,
        project_id: i64,
        user_id: i64,
        comment: NewComment,
    ) -> StoreResult<Comment>;
    async fn find_comment(&self, id: i64) -> StoreResult<Option<Comment>>;
    async fn count_project_comments(&self, project_id: i64) -> StoreResult<i64>;
    async fn project_comments(
        &self,
        project_id: i64,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Comment>>;
    /// Latest comments in every project the user belongs to, with `project_name` set.
    async fn recent_comments(&self, user_id: i64, limit: i64) -> StoreResult<Vec<Comment>>;
    async fn update_comment(&self, id: i64, content: &str) -> StoreResult<()>;
    /// Removes the comment and every reply below it.
    async fn delete_comment(&self, id: i64) -> StoreResult<bool>;
}
