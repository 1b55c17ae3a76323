use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use super::{Store, StoreError, StoreResult};
use crate::models::comment::{Comment, NewComment};
use crate::models::project::{NewProject, Project, ProjectMember};
use crate::models::session::Session;
use crate::models::task::{NewTask, Task, TaskChanges, TaskStatus};
use crate::models::user::{NewUser, User};

struct ProjectRecord {
    id: i64,
    name: String,
    description: Option<String>,
    created_by_user_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

struct MemberRecord {
    project_id: i64,
    user_id: i64,
    joined_at: DateTime<Utc>,
}

struct TaskRecord {
    id: i64,
    project_id: i64,
    title: String,
    description: Option<String>,
    assigned_to_user_id: Option<i64>,
    due_date: Option<NaiveDate>,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

struct CommentRecord {
    id: i64,
    project_id: i64,
    user_id: i64,
    content: String,
    parent_comment_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    sessions: HashMap<String, Session>,
    projects: BTreeMap<i64, ProjectRecord>,
    members: Vec<MemberRecord>,
    tasks: BTreeMap<i64, TaskRecord>,
    comments: BTreeMap<i64, CommentRecord>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn is_member(&self, project_id: i64, user_id: i64) -> bool {
        self.members
            .iter()
            .any(|member| member.project_id == project_id && member.user_id == user_id)
    }

    fn project_view(&self, record: &ProjectRecord) -> Project {
        let creator = self.users.get(&record.created_by_user_id);
        Project {
            id: record.id,
            name: record.name.clone(),
            description: record.description.clone(),
            created_by_user_id: record.created_by_user_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            created_by_username: creator.map(|user| user.username.clone()),
            created_by_email: creator.map(|user| user.email.clone()),
        }
    }

    fn task_view(&self, record: &TaskRecord, with_project_name: bool) -> Task {
        let assignee = record
            .assigned_to_user_id
            .and_then(|id| self.users.get(&id));
        let project_name = if with_project_name {
            self.projects.get(&record.project_id).map(|project| project.name.clone())
        } else {
            None
        };
        Task {
            id: record.id,
            project_id: record.project_id,
            title: record.title.clone(),
            description: record.description.clone(),
            assigned_to_user_id: record.assigned_to_user_id,
            due_date: record.due_date,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
            assigned_to_username: assignee.map(|user| user.username.clone()),
            assigned_to_email: assignee.map(|user| user.email.clone()),
            project_name,
        }
    }

    fn comment_view(&self, record: &CommentRecord, with_project_name: bool) -> Option<Comment> {
        let author = self.users.get(&record.user_id)?;
        let project_name = if with_project_name {
            self.projects.get(&record.project_id).map(|project| project.name.clone())
        } else {
            None
        };
        Some(Comment {
            id: record.id,
            project_id: record.project_id,
            user_id: record.user_id,
            content: record.content.clone(),
            parent_comment_id: record.parent_comment_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            username: author.username.clone(),
            email: author.email.clone(),
            project_name,
        })
    }

    /// Comments of the project, newest first.
    fn project_comment_records(&self, project_id: i64) -> Vec<&CommentRecord> {
        let mut records: Vec<&CommentRecord> = self
            .comments
            .values()
            .filter(|comment| comment.project_id == project_id)
            .collect();
        records.sort_by_key(|comment| Reverse((comment.created_at, comment.id)));
        records
    }
}

/// Process-local store with the same keys, cascades and ordering as the
/// MySQL schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_identity(left: &str, right: &str) -> bool {
    // mirrors the case-insensitive collation of the SQL schema
    left.eq_ignore_ascii_case(right)
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        for existing in tables.users.values() {
            if same_identity(&existing.username, &user.username) {
                return Err(StoreError::Duplicate("username".into()));
            }
            if same_identity(&existing.email, &user.email) {
                return Err(StoreError::Duplicate("email".into()));
            }
        }
        let id = tables.next_id();
        let created = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| same_identity(&user.email, email))
            .cloned())
    }

    async fn identity_taken(
        &self,
        username: &str,
        email: &str,
        excluding: Option<i64>,
    ) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().any(|user| {
            Some(user.id) != excluding
                && (same_identity(&user.username, username) || same_identity(&user.email, email))
        }))
    }

    async fn update_user(&self, id: i64, username: &str, email: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        for other in tables.users.values().filter(|user| user.id != id) {
            if same_identity(&other.username, username) {
                return Err(StoreError::Duplicate("username".into()));
            }
            if same_identity(&other.email, email) {
                return Err(StoreError::Duplicate("email".into()));
            }
        }
        if let Some(user) = tables.users.get_mut(&id) {
            user.username = username.to_string();
            user.email = email.to_string();
        }
        Ok(())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.get_mut(&id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn create_session(&self, session: &Session) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&session.user_id) {
            return Err(StoreError::MissingReference);
        }
        if tables.sessions.contains_key(&session.session_id) {
            return Err(StoreError::Duplicate("session_id".into()));
        }
        tables
            .sessions
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, session_id: &str) -> StoreResult<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(session_id).cloned())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, session| !session.is_expired_at(now));
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn delete_session(&self, session_id: &str) -> StoreResult<bool> {
        Ok(self
            .tables
            .write()
            .await
            .sessions
            .remove(session_id)
            .is_some())
    }

    async fn create_project(&self, project: NewProject, creator: i64) -> StoreResult<Project> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&creator) {
            return Err(StoreError::MissingReference);
        }
        let id = tables.next_id();
        let now = Utc::now();
        let record = ProjectRecord {
            id,
            name: project.name,
            description: project.description,
            created_by_user_id: creator,
            created_at: now,
            updated_at: now,
        };
        let view = tables.project_view(&record);
        tables.projects.insert(id, record);
        tables.members.push(MemberRecord {
            project_id: id,
            user_id: creator,
            joined_at: now,
        });
        Ok(view)
    }

    async fn find_project(&self, id: i64) -> StoreResult<Option<Project>> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .get(&id)
            .map(|record| tables.project_view(record)))
    }

    async fn projects_for_member(&self, user_id: i64) -> StoreResult<Vec<Project>> {
        let tables = self.tables.read().await;
        let mut records: Vec<&ProjectRecord> = tables
            .projects
            .values()
            .filter(|project| tables.is_member(project.id, user_id))
            .collect();
        records.sort_by_key(|project| Reverse((project.created_at, project.id)));
        Ok(records
            .into_iter()
            .map(|record| tables.project_view(record))
            .collect())
    }

    async fn update_project(&self, id: i64, project: NewProject) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(record) = tables.projects.get_mut(&id) {
            record.name = project.name;
            record.description = project.description;
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_project(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.projects.remove(&id);
        tables.members.retain(|member| member.project_id != id);
        tables.tasks.retain(|_, task| task.project_id != id);
        tables.comments.retain(|_, comment| comment.project_id != id);
        Ok(())
    }

    async fn project_members(&self, project_id: i64) -> StoreResult<Vec<ProjectMember>> {
        let tables = self.tables.read().await;
        let mut members: Vec<ProjectMember> = tables
            .members
            .iter()
            .filter(|member| member.project_id == project_id)
            .filter_map(|member| {
                tables.users.get(&member.user_id).map(|user| ProjectMember {
                    id: user.id,
                    username: user.username.clone(),
                    email: user.email.clone(),
                    joined_at: member.joined_at,
                })
            })
            .collect();
        members.sort_by_key(|member| (member.joined_at, member.id));
        Ok(members)
    }

    async fn is_member(&self, project_id: i64, user_id: i64) -> StoreResult<bool> {
        Ok(self.tables.read().await.is_member(project_id, user_id))
    }

    async fn add_member(&self, project_id: i64, user_id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.projects.contains_key(&project_id) || !tables.users.contains_key(&user_id) {
            return Err(StoreError::MissingReference);
        }
        if tables.is_member(project_id, user_id) {
            return Err(StoreError::Duplicate("record".into()));
        }
        tables.members.push(MemberRecord {
            project_id,
            user_id,
            joined_at: Utc::now(),
        });
        Ok(())
    }

    async fn remove_member(&self, project_id: i64, user_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.members.len();
        tables
            .members
            .retain(|member| !(member.project_id == project_id && member.user_id == user_id));
        if tables.members.len() == before {
            return Ok(false);
        }
        let now = Utc::now();
        for task in tables.tasks.values_mut() {
            if task.project_id == project_id && task.assigned_to_user_id == Some(user_id) {
                task.assigned_to_user_id = None;
                task.updated_at = now;
            }
        }
        Ok(true)
    }

    async fn create_task(&self, project_id: i64, task: NewTask) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;
        if !tables.projects.contains_key(&project_id) {
            return Err(StoreError::MissingReference);
        }
        if let Some(assignee) = task.assigned_to_user_id {
            if !tables.users.contains_key(&assignee) {
                return Err(StoreError::MissingReference);
            }
        }
        let id = tables.next_id();
        let now = Utc::now();
        let record = TaskRecord {
            id,
            project_id,
            title: task.title,
            description: task.description,
            assigned_to_user_id: task.assigned_to_user_id,
            due_date: task.due_date,
            status: task.status,
            created_at: now,
            updated_at: now,
        };
        let view = tables.task_view(&record, false);
        tables.tasks.insert(id, record);
        Ok(view)
    }

    async fn find_task(&self, id: i64) -> StoreResult<Option<Task>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .get(&id)
            .map(|record| tables.task_view(record, false)))
    }

    async fn project_tasks(
        &self,
        project_id: i64,
        status: Option<TaskStatus>,
    ) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        let mut records: Vec<&TaskRecord> = tables
            .tasks
            .values()
            .filter(|task| task.project_id == project_id)
            .filter(|task| status.map_or(true, |wanted| task.status == wanted))
            .collect();
        records.sort_by_key(|task| Reverse((task.created_at, task.id)));
        Ok(records
            .into_iter()
            .map(|record| tables.task_view(record, false))
            .collect())
    }

    async fn assigned_tasks(&self, user_id: i64) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        let mut records: Vec<&TaskRecord> = tables
            .tasks
            .values()
            .filter(|task| task.assigned_to_user_id == Some(user_id))
            .collect();
        records.sort_by_key(|task| Reverse((task.created_at, task.id)));
        Ok(records
            .into_iter()
            .map(|record| tables.task_view(record, true))
            .collect())
    }

    async fn update_task(&self, id: i64, changes: TaskChanges) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(Some(assignee)) = changes.assigned_to_user_id {
            if !tables.users.contains_key(&assignee) {
                return Err(StoreError::MissingReference);
            }
        }
        if let Some(task) = tables.tasks.get_mut(&id) {
            if let Some(title) = changes.title {
                task.title = title;
            }
            if let Some(description) = changes.description {
                task.description = Some(description);
            }
            if let Some(assignee) = changes.assigned_to_user_id {
                task.assigned_to_user_id = assignee;
            }
            if let Some(due_date) = changes.due_date {
                task.due_date = due_date;
            }
            if let Some(status) = changes.status {
                task.status = status;
            }
            task.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_task(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.tasks.remove(&id).is_some())
    }

    async fn create_comment(
        &self,
        project_id: i64,
        user_id: i64,
        comment: NewComment,
    ) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.projects.contains_key(&project_id) || !tables.users.contains_key(&user_id) {
            return Err(StoreError::MissingReference);
        }
        if let Some(parent) = comment.parent_comment_id {
            if !tables.comments.contains_key(&parent) {
                return Err(StoreError::MissingReference);
            }
        }
        let id = tables.next_id();
        let now = Utc::now();
        let record = CommentRecord {
            id,
            project_id,
            user_id,
            content: comment.content,
            parent_comment_id: comment.parent_comment_id,
            created_at: now,
            updated_at: now,
        };
        let view = tables
            .comment_view(&record, false)
            .ok_or_else(|| StoreError::Corrupt(format!("comment {id} has no author")))?;
        tables.comments.insert(id, record);
        Ok(view)
    }

    async fn find_comment(&self, id: i64) -> StoreResult<Option<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .get(&id)
            .and_then(|record| tables.comment_view(record, false)))
    }

    async fn count_project_comments(&self, project_id: i64) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        let total = tables
            .comments
            .values()
            .filter(|comment| comment.project_id == project_id)
            .count();
        i64::try_from(total).map_err(|_| StoreError::Corrupt("comment count overflow".into()))
    }

    async fn project_comments(
        &self,
        project_id: i64,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let skip = usize::try_from(offset).unwrap_or(0);
        let take = usize::try_from(limit).unwrap_or(0);
        Ok(tables
            .project_comment_records(project_id)
            .into_iter()
            .skip(skip)
            .take(take)
            .filter_map(|record| tables.comment_view(record, false))
            .collect())
    }

    async fn recent_comments(&self, user_id: i64, limit: i64) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        let mut records: Vec<&CommentRecord> = tables
            .comments
            .values()
            .filter(|comment| tables.is_member(comment.project_id, user_id))
            .collect();
        records.sort_by_key(|comment| Reverse((comment.created_at, comment.id)));
        let take = usize::try_from(limit).unwrap_or(0);
        Ok(records
            .into_iter()
            .filter_map(|record| tables.comment_view(record, true))
            .take(take)
            .collect())
    }

    async fn update_comment(&self, id: i64, content: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(comment) = tables.comments.get_mut(&id) {
            comment.content = content.to_string();
            comment.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_comment(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.comments.contains_key(&id) {
            return Ok(false);
        }
        let mut doomed = vec![id];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let current = doomed[cursor];
            let replies: Vec<i64> = tables
                .comments
                .values()
                .filter(|comment| comment.parent_comment_id == Some(current))
                .map(|comment| comment.id)
                .filter(|reply| !doomed.contains(reply))
                .collect();
            doomed.extend(replies);
            cursor += 1;
        }
        for comment_id in doomed {
            tables.comments.remove(&comment_id);
        }
        Ok(true)
    }
}
