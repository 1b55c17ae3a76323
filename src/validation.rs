//! Request validation shared by the route modules.
//!
//! Each request model checks its own fields through a [`Violations`]
//! collector so a single response reports every broken rule at once.

use std::sync::OnceLock;

use actix_web::{error, web, HttpRequest};
use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::error::ApiError;

/// Request bodies larger than this are rejected before parsing.
pub const JSON_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Debug, Default)]
pub struct Violations {
    messages: Vec<String>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Records `message` unless `ok` holds.
    pub fn check(&mut self, ok: bool, message: &str) {
        if !ok {
            self.push(message);
        }
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.messages.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.messages))
        }
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
            .expect("email pattern is valid")
    })
}

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= 255 && email_pattern().is_match(value)
}

pub fn char_len(value: &str) -> usize {
    value.chars().count()
}

pub fn check_username(violations: &mut Violations, username: Option<&str>) {
    let Some(username) = username else {
        violations.push("Username is required");
        return;
    };
    violations.check(
        username.chars().all(|c| c.is_ascii_alphanumeric()),
        "Username must contain only alphanumeric characters",
    );
    violations.check(char_len(username) >= 3, "Username must be at least 3 characters long");
    violations.check(char_len(username) <= 30, "Username must not exceed 30 characters");
}

pub fn check_email(violations: &mut Violations, email: Option<&str>) {
    match email {
        Some(email) => violations.check(is_valid_email(email), "Please provide a valid email address"),
        None => violations.push("Email is required"),
    }
}

pub fn check_password(violations: &mut Violations, password: Option<&str>) {
    match password {
        Some(password) => violations.check(
            char_len(password) >= 6,
            "Password must be at least 6 characters long",
        ),
        None => violations.push("Password is required"),
    }
}

/// Checks a 1..=255 character text such as a project name or task title.
pub fn check_short_text(violations: &mut Violations, value: Option<&str>, label: &str, required: bool) {
    match value {
        Some(value) => {
            violations.check(!value.trim().is_empty(), &format!("{label} cannot be empty"));
            violations.check(char_len(value) <= 255, &format!("{label} must not exceed 255 characters"));
        }
        None if required => violations.push(format!("{label} is required")),
        None => {}
    }
}

pub fn check_positive_id(violations: &mut Violations, value: Option<i64>, label: &str) {
    if let Some(id) = value {
        violations.check(id > 0, &format!("{label} must be positive"));
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp and keeps the date.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|ts| ts.date_naive()))
}

/// Deserializes a field that may be absent, `null`, or a value, keeping the
/// three cases apart: absent -> `None`, null -> `Some(None)`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string())
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err: error::JsonPayloadError, _req: &HttpRequest| {
            ApiError::Validation(vec![err.to_string()]).into()
        })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: error::QueryPayloadError, _req: &HttpRequest| {
        ApiError::Validation(vec![err.to_string()]).into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|_err: error::PathError, _req: &HttpRequest| {
        ApiError::BadRequest("Invalid id in request path".into()).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn messages(check: impl FnOnce(&mut Violations)) -> Vec<String> {
        let mut violations = Violations::new();
        check(&mut violations);
        match violations.into_result() {
            Ok(()) => Vec::new(),
            Err(ApiError::Validation(messages)) => messages,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    #[rstest]
    #[case("alice@example.com", true)]
    #[case("first.last+tag@sub.example.org", true)]
    #[case("no-at-sign.example.com", false)]
    #[case("missing@tld", false)]
    #[case("two@@example.com", false)]
    #[case("", false)]
    fn email_shapes(#[case] email: &str, #[case] valid: bool) {
        assert_eq!(is_valid_email(email), valid);
    }

    #[rstest]
    #[case("alice", vec![])]
    #[case("al", vec!["Username must be at least 3 characters long"])]
    #[case("alice_b", vec!["Username must contain only alphanumeric characters"])]
    #[case("a234567890123456789012345678901", vec!["Username must not exceed 30 characters"])]
    fn username_rules(#[case] username: &str, #[case] expected: Vec<&str>) {
        assert_eq!(messages(|v| check_username(v, Some(username))), expected);
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let found = messages(|v| {
            check_username(v, None);
            check_email(v, None);
            check_password(v, Some("12345"));
        });
        assert_eq!(
            found,
            vec![
                "Username is required",
                "Email is required",
                "Password must be at least 6 characters long",
            ]
        );
    }

    #[test]
    fn short_text_rules_use_the_label() {
        assert_eq!(
            messages(|v| check_short_text(v, Some("  "), "Project name", true)),
            vec!["Project name cannot be empty"]
        );
        assert_eq!(
            messages(|v| check_short_text(v, None, "Task title", true)),
            vec!["Task title is required"]
        );
        assert!(messages(|v| check_short_text(v, None, "Task title", false)).is_empty());
        let long = "x".repeat(256);
        assert_eq!(
            messages(|v| check_short_text(v, Some(&long), "Task title", false)),
            vec!["Task title must not exceed 255 characters"]
        );
    }

    #[rstest]
    #[case("2030-01-31", Some((2030, 1, 31)))]
    #[case("2030-01-31T10:00:00Z", Some((2030, 1, 31)))]
    #[case("2030-01-31T23:30:00-05:00", Some((2030, 1, 31)))]
    #[case("31/01/2030", None)]
    #[case("2030-02-30", None)]
    fn iso_dates(#[case] raw: &str, #[case] expected: Option<(i32, u32, u32)>) {
        let expected = expected.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        assert_eq!(parse_iso_date(raw), expected);
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        due: Option<Option<String>>,
    }

    #[test]
    fn nullable_keeps_absent_and_null_apart() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"due": null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"due": "2030-01-01"}"#).unwrap();

        assert_eq!(absent.due, None);
        assert_eq!(null.due, Some(None));
        assert_eq!(set.due, Some(Some("2030-01-01".to_string())));
    }
}
