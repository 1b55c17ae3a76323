use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::{Executor, FromRow};

use super::{Store, StoreError, StoreResult};
use crate::models::comment::{Comment, NewComment};
use crate::models::project::{NewProject, Project, ProjectMember};
use crate::models::session::Session;
use crate::models::task::{NewTask, Task, TaskChanges, TaskStatus};
use crate::models::user::{NewUser, User};

const SCHEMA: &str = include_str!("schema.sql");

const USER_SELECT: &str = "SELECT id, username, email, password_hash, created_at FROM Users";

const PROJECT_SELECT: &str = "
    SELECT p.id, p.name, p.description, p.created_by_user_id, p.created_at, p.updated_at,
           u.username AS created_by_username, u.email AS created_by_email
    FROM Projects p
    LEFT JOIN Users u ON p.created_by_user_id = u.id";

const TASK_SELECT: &str = "
    SELECT t.id, t.project_id, t.title, t.description, t.assigned_to_user_id, t.due_date,
           t.status, t.created_at, t.updated_at,
           u.username AS assigned_to_username, u.email AS assigned_to_email
    FROM Tasks t
    LEFT JOIN Users u ON t.assigned_to_user_id = u.id";

const COMMENT_SELECT: &str = "
    SELECT c.id, c.project_id, c.user_id, c.content, c.parent_comment_id,
           c.created_at, c.updated_at, u.username, u.email
    FROM Comments c
    JOIN Users u ON c.user_id = u.id";

/// Task row as stored; `status` is kept as text in the table.
#[derive(FromRow)]
struct TaskRow {
    id: i64,
    project_id: i64,
    title: String,
    description: Option<String>,
    assigned_to_user_id: Option<i64>,
    due_date: Option<NaiveDate>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    assigned_to_username: Option<String>,
    assigned_to_email: Option<String>,
    #[sqlx(default)]
    project_name: Option<String>,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status: TaskStatus = row
            .status
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("task {} has status {:?}", row.id, row.status)))?;
        Ok(Task {
            id: row.id,
            project_id: row.project_id,
            title: row.title,
            description: row.description,
            assigned_to_user_id: row.assigned_to_user_id,
            due_date: row.due_date,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            assigned_to_username: row.assigned_to_username,
            assigned_to_email: row.assigned_to_email,
            project_name: row.project_name,
        })
    }
}

fn into_tasks(rows: Vec<TaskRow>) -> StoreResult<Vec<Task>> {
    rows.into_iter().map(Task::try_from).collect()
}

fn inserted_id(id: u64) -> StoreResult<i64> {
    i64::try_from(id).map_err(|_| StoreError::Corrupt(format!("insert id {id} out of range")))
}

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Creates any missing tables.
    pub async fn initialize(&self) -> Result<(), sqlx::Error> {
        let script: String = SCHEMA
            .lines()
            .filter(|line| !line.trim_start().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        for statement in script.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            self.pool.execute(statement).await?;
        }
        info!("Database schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let result = sqlx::query("INSERT INTO Users (username, email, password_hash) VALUES (?, ?, ?)")
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .execute(&self.pool)
            .await?;
        let id = inserted_id(result.last_insert_id())?;
        self.find_user(id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("user {id} vanished after insert")))
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn identity_taken(
        &self,
        username: &str,
        email: &str,
        excluding: Option<i64>,
    ) -> StoreResult<bool> {
        // ids start at 1, so 0 excludes nobody
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM Users WHERE (email = ? OR username = ?) AND id <> ?",
        )
        .bind(email)
        .bind(username)
        .bind(excluding.unwrap_or(0))
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn update_user(&self, id: i64, username: &str, email: &str) -> StoreResult<()> {
        sqlx::query("UPDATE Users SET username = ?, email = ? WHERE id = ?")
            .bind(username)
            .bind(email)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> StoreResult<()> {
        sqlx::query("UPDATE Users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_session(&self, session: &Session) -> StoreResult<()> {
        sqlx::query("INSERT INTO Sessions (session_id, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&session.session_id)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_session(&self, session_id: &str) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT session_id, user_id, expires_at FROM Sessions WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM Sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_session(&self, session_id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM Sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_project(&self, project: NewProject, creator: i64) -> StoreResult<Project> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO Projects (name, description, created_by_user_id) VALUES (?, ?, ?)",
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(creator)
        .execute(&mut *tx)
        .await?;
        let project_id = inserted_id(result.last_insert_id())?;

        sqlx::query("INSERT INTO ProjectMembers (project_id, user_id) VALUES (?, ?)")
            .bind(project_id)
            .bind(creator)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.find_project(project_id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("project {project_id} vanished after insert")))
    }

    async fn find_project(&self, id: i64) -> StoreResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(&format!("{PROJECT_SELECT} WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    async fn projects_for_member(&self, user_id: i64) -> StoreResult<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            "{PROJECT_SELECT}
             JOIN ProjectMembers pm ON p.id = pm.project_id
             WHERE pm.user_id = ?
             ORDER BY p.created_at DESC, p.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(projects)
    }

    async fn update_project(&self, id: i64, project: NewProject) -> StoreResult<()> {
        sqlx::query("UPDATE Projects SET name = ?, description = ? WHERE id = ?")
            .bind(&project.name)
            .bind(&project.description)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_project(&self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM Projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn project_members(&self, project_id: i64) -> StoreResult<Vec<ProjectMember>> {
        let members = sqlx::query_as::<_, ProjectMember>(
            "SELECT u.id, u.username, u.email, pm.joined_at
             FROM ProjectMembers pm
             JOIN Users u ON pm.user_id = u.id
             WHERE pm.project_id = ?
             ORDER BY pm.joined_at ASC, u.id ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    async fn is_member(&self, project_id: i64, user_id: i64) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ProjectMembers WHERE project_id = ? AND user_id = ?",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn add_member(&self, project_id: i64, user_id: i64) -> StoreResult<()> {
        sqlx::query("INSERT INTO ProjectMembers (project_id, user_id) VALUES (?, ?)")
            .bind(project_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_member(&self, project_id: i64, user_id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM ProjectMembers WHERE project_id = ? AND user_id = ?")
            .bind(project_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE Tasks SET assigned_to_user_id = NULL
             WHERE project_id = ? AND assigned_to_user_id = ?",
        )
        .bind(project_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn create_task(&self, project_id: i64, task: NewTask) -> StoreResult<Task> {
        let result = sqlx::query(
            "INSERT INTO Tasks (project_id, title, description, assigned_to_user_id, due_date, status)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(project_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.assigned_to_user_id)
        .bind(task.due_date)
        .bind(task.status.as_str())
        .execute(&self.pool)
        .await?;
        let id = inserted_id(result.last_insert_id())?;
        self.find_task(id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("task {id} vanished after insert")))
    }

    async fn find_task(&self, id: i64) -> StoreResult<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!("{TASK_SELECT} WHERE t.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Task::try_from).transpose()
    }

    async fn project_tasks(
        &self,
        project_id: i64,
        status: Option<TaskStatus>,
    ) -> StoreResult<Vec<Task>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, TaskRow>(&format!(
                    "{TASK_SELECT} WHERE t.project_id = ? AND t.status = ?
                     ORDER BY t.created_at DESC, t.id DESC"
                ))
                .bind(project_id)
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, TaskRow>(&format!(
                    "{TASK_SELECT} WHERE t.project_id = ? ORDER BY t.created_at DESC, t.id DESC"
                ))
                .bind(project_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        into_tasks(rows)
    }

    async fn assigned_tasks(&self, user_id: i64) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            "SELECT t.id, t.project_id, t.title, t.description, t.assigned_to_user_id, t.due_date,
                    t.status, t.created_at, t.updated_at,
                    u.username AS assigned_to_username, u.email AS assigned_to_email,
                    p.name AS project_name
             FROM Tasks t
             JOIN Projects p ON t.project_id = p.id
             LEFT JOIN Users u ON t.assigned_to_user_id = u.id
             WHERE t.assigned_to_user_id = ?
             ORDER BY t.created_at DESC, t.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        into_tasks(rows)
    }

    async fn update_task(&self, id: i64, changes: TaskChanges) -> StoreResult<()> {
        sqlx::query(
            "UPDATE Tasks SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                assigned_to_user_id = IF(?, ?, assigned_to_user_id),
                due_date = IF(?, ?, due_date),
                status = COALESCE(?, status)
             WHERE id = ?",
        )
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.assigned_to_user_id.is_some())
        .bind(changes.assigned_to_user_id.flatten())
        .bind(changes.due_date.is_some())
        .bind(changes.due_date.flatten())
        .bind(changes.status.map(TaskStatus::as_str))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_task(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM Tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_comment(
        &self,
        project_id: i64,
        user_id: i64,
        comment: NewComment,
    ) -> StoreResult<Comment> {
        let result = sqlx::query(
            "INSERT INTO Comments (project_id, user_id, content, parent_comment_id) VALUES (?, ?, ?, ?)",
        )
        .bind(project_id)
        .bind(user_id)
        .bind(&comment.content)
        .bind(comment.parent_comment_id)
        .execute(&self.pool)
        .await?;
        let id = inserted_id(result.last_insert_id())?;
        self.find_comment(id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("comment {id} vanished after insert")))
    }

    async fn find_comment(&self, id: i64) -> StoreResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE c.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn count_project_comments(&self, project_id: i64) -> StoreResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Comments WHERE project_id = ?")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn project_comments(
        &self,
        project_id: i64,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.project_id = ?
             ORDER BY c.created_at DESC, c.id DESC
             LIMIT ? OFFSET ?"
        ))
        .bind(project_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn recent_comments(&self, user_id: i64, limit: i64) -> StoreResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT c.id, c.project_id, c.user_id, c.content, c.parent_comment_id,
                    c.created_at, c.updated_at, u.username, u.email, p.name AS project_name
             FROM Comments c
             JOIN Users u ON c.user_id = u.id
             JOIN Projects p ON c.project_id = p.id
             JOIN ProjectMembers pm ON p.id = pm.project_id
             WHERE pm.user_id = ?
             ORDER BY c.created_at DESC, c.id DESC
             LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn update_comment(&self, id: i64, content: &str) -> StoreResult<()> {
        sqlx::query("UPDATE Comments SET content = ? WHERE id = ?")
            .bind(content)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_comment(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM Comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
