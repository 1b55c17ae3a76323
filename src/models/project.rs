use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A project row joined with its creator's public details.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_by_user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by_username: Option<String>,
    pub created_by_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProjectMember {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
}
