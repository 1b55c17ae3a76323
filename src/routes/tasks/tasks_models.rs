use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::task::{NewTask, Task, TaskChanges, TaskStatus};
use crate::validation::{check_positive_id, check_short_text, nullable, parse_iso_date, trimmed, Violations};

const STATUS_MESSAGE: &str = "Status must be one of: To-Do, In Progress, Done";
const DUE_DATE_MESSAGE: &str = "Due date must be in ISO format (YYYY-MM-DD)";

fn check_status(violations: &mut Violations, status: Option<&str>) -> Option<TaskStatus> {
    let parsed = status.map(str::parse::<TaskStatus>)?;
    if parsed.is_err() {
        violations.push(STATUS_MESSAGE);
    }
    parsed.ok()
}

fn check_due_date(violations: &mut Violations, due_date: Option<&str>) -> Option<NaiveDate> {
    let parsed = due_date.map(parse_iso_date)?;
    if parsed.is_none() {
        violations.push(DUE_DATE_MESSAGE);
    }
    parsed
}

// Create task request
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assigned_to_user_id: Option<i64>,
    pub due_date: Option<String>,
    pub status: Option<String>,
}

impl CreateTaskRequest {
    pub fn validate(self) -> Result<NewTask, ApiError> {
        let title = trimmed(self.title);
        let mut violations = Violations::new();
        check_short_text(&mut violations, title.as_deref(), "Task title", true);
        check_positive_id(&mut violations, self.assigned_to_user_id, "Assigned user ID");
        let due_date = check_due_date(&mut violations, self.due_date.as_deref());
        let status = check_status(&mut violations, self.status.as_deref());
        violations.into_result()?;
        Ok(NewTask {
            title: title.unwrap_or_default(),
            description: self.description,
            assigned_to_user_id: self.assigned_to_user_id,
            due_date,
            status: status.unwrap_or_default(),
        })
    }
}

// Update task request; `null` clears the assignee or due date
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub assigned_to_user_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<String>>,
    pub status: Option<String>,
}

impl UpdateTaskRequest {
    pub fn validate(self) -> Result<TaskChanges, ApiError> {
        let title = trimmed(self.title);
        let mut violations = Violations::new();
        check_short_text(&mut violations, title.as_deref(), "Task title", false);
        check_positive_id(&mut violations, self.assigned_to_user_id.flatten(), "Assigned user ID");
        let due_date = self
            .due_date
            .map(|due| check_due_date(&mut violations, due.as_deref()));
        let status = check_status(&mut violations, self.status.as_deref());
        violations.into_result()?;
        Ok(TaskChanges {
            title,
            description: self.description,
            assigned_to_user_id: self.assigned_to_user_id,
            due_date,
            status,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct TaskData {
    pub task: Task,
}

#[derive(Serialize)]
pub struct TaskListData {
    pub tasks: Vec<Task>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_defaults_status_and_parses_dates() {
        let task = CreateTaskRequest {
            title: Some(" Write docs ".into()),
            due_date: Some("2030-05-01T12:00:00Z".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert_eq!(task.title, "Write docs");
        assert_eq!(task.status, TaskStatus::ToDo);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2030, 5, 1));
    }

    #[test]
    fn create_collects_every_violation() {
        let err = CreateTaskRequest {
            assigned_to_user_id: Some(0),
            due_date: Some("tomorrow".into()),
            status: Some("Blocked".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();

        match err {
            ApiError::Validation(messages) => assert_eq!(
                messages,
                vec![
                    "Task title is required",
                    "Assigned user ID must be positive",
                    DUE_DATE_MESSAGE,
                    STATUS_MESSAGE,
                ]
            ),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn update_keeps_absent_and_null_apart() {
        let request: UpdateTaskRequest =
            serde_json::from_str(r#"{"assigned_to_user_id": null, "status": "Done"}"#).unwrap();
        let changes = request.validate().unwrap();

        assert_eq!(changes.title, None);
        assert_eq!(changes.assigned_to_user_id, Some(None));
        assert_eq!(changes.due_date, None);
        assert_eq!(changes.status, Some(TaskStatus::Done));

        let request: UpdateTaskRequest =
            serde_json::from_str(r#"{"due_date": null, "title": "Renamed"}"#).unwrap();
        let changes = request.validate().unwrap();
        assert_eq!(changes.title.as_deref(), Some("Renamed"));
        assert_eq!(changes.assigned_to_user_id, None);
        assert_eq!(changes.due_date, Some(None));
    }

    #[test]
    fn update_rejects_an_empty_title() {
        let request: UpdateTaskRequest = serde_json::from_str(r#"{"title": "   "}"#).unwrap();
        assert!(matches!(request.validate(), Err(ApiError::Validation(_))));
    }
}
