use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::comment::{Comment, NewComment, ThreadedComment};
use crate::validation::{check_positive_id, Violations};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_RECENT_LIMIT: i64 = 10;
pub const MAX_RECENT_LIMIT: i64 = 50;

fn check_content(violations: &mut Violations, content: Option<&str>) {
    match content {
        Some(content) => violations.check(!content.is_empty(), "Comment content cannot be empty"),
        None => violations.push("Comment content is required"),
    }
}

// Create comment request
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CommentRequest {
    pub content: Option<String>,
    pub parent_comment_id: Option<i64>,
}

impl CommentRequest {
    pub fn validate(self) -> Result<NewComment, ApiError> {
        let content = self.content.map(|content| content.trim().to_string());
        let mut violations = Violations::new();
        check_content(&mut violations, content.as_deref());
        check_positive_id(&mut violations, self.parent_comment_id, "Parent comment ID");
        violations.into_result()?;
        Ok(NewComment {
            content: content.unwrap_or_default(),
            parent_comment_id: self.parent_comment_id,
        })
    }
}

// Edit comment request; a comment keeps its place in the thread
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EditCommentRequest {
    pub content: Option<String>,
}

impl EditCommentRequest {
    pub fn validate(self) -> Result<String, ApiError> {
        let content = self.content.map(|content| content.trim().to_string());
        let mut violations = Violations::new();
        check_content(&mut violations, content.as_deref());
        violations.into_result()?;
        Ok(content.unwrap_or_default())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// A validated page window; `offset` always fits in an `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
}

impl PageQuery {
    pub fn validate(self) -> Result<Page, ApiError> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        let mut violations = Violations::new();
        let page_ok = page >= 1;
        let limit_ok = (1..=MAX_PAGE_SIZE).contains(&limit);
        violations.check(page_ok, "Page must be at least 1");
        violations.check(limit_ok, &format!("Limit must be between 1 and {MAX_PAGE_SIZE}"));

        let offset = page.checked_sub(1).and_then(|skipped| skipped.checked_mul(limit));
        if page_ok && limit_ok && offset.is_none() {
            violations.push("Page is out of range");
        }
        violations.into_result()?;
        Ok(Page {
            page,
            limit,
            offset: offset.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

impl RecentQuery {
    pub fn validate(self) -> Result<i64, ApiError> {
        let limit = self.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
        let mut violations = Violations::new();
        violations.check(
            (1..=MAX_RECENT_LIMIT).contains(&limit),
            &format!("Limit must be between 1 and {MAX_RECENT_LIMIT}"),
        );
        violations.into_result()?;
        Ok(limit)
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: Page, total: i64) -> Self {
        Self {
            page: page.page,
            limit: page.limit,
            total,
            pages: (total + page.limit - 1) / page.limit,
        }
    }
}

#[derive(Serialize)]
pub struct CommentData {
    pub comment: Comment,
}

#[derive(Serialize)]
pub struct CommentListData {
    pub comments: Vec<Comment>,
}

#[derive(Serialize)]
pub struct CommentPageData {
    pub comments: Vec<ThreadedComment>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 20, 0)]
    #[case(1, 20, 1)]
    #[case(20, 20, 1)]
    #[case(21, 20, 2)]
    #[case(45, 10, 5)]
    fn pages_round_up(#[case] total: i64, #[case] limit: i64, #[case] pages: i64) {
        let pagination = Pagination::new(Page { page: 1, limit, offset: 0 }, total);
        assert_eq!(pagination.pages, pages);
    }

    #[test]
    fn page_query_defaults_and_offsets() {
        let page = PageQuery::default().validate().unwrap();
        assert_eq!(page, Page { page: 1, limit: 20, offset: 0 });

        let page = PageQuery { page: Some(3), limit: Some(5) }.validate().unwrap();
        assert_eq!(page.offset, 10);
    }

    #[test]
    fn page_past_the_offset_range_is_rejected() {
        let result = PageQuery { page: Some(i64::MAX), limit: Some(100) }.validate();
        match result {
            Err(ApiError::Validation(messages)) => assert_eq!(messages, vec!["Page is out of range"]),
            other => panic!("unexpected result {other:?}"),
        }

        let last = PageQuery { page: Some(i64::MAX), limit: Some(1) }.validate().unwrap();
        assert_eq!(last.offset, i64::MAX - 1);
    }

    #[test]
    fn edits_carry_content_only() {
        let edit: EditCommentRequest = serde_json::from_str(r#"{"content": " fixed "}"#).unwrap();
        assert_eq!(edit.validate().unwrap(), "fixed");

        let reparent = serde_json::from_str::<EditCommentRequest>(
            r#"{"content": "x", "parent_comment_id": 3}"#,
        );
        assert!(reparent.is_err());
    }

    #[rstest]
    #[case(Some(0), None)]
    #[case(None, Some(0))]
    #[case(None, Some(101))]
    #[case(Some(i64::MIN), None)]
    fn page_query_rejects_out_of_range(#[case] page: Option<i64>, #[case] limit: Option<i64>) {
        assert!(PageQuery { page, limit }.validate().is_err());
    }

    #[test]
    fn recent_limit_is_bounded() {
        assert_eq!(RecentQuery::default().validate().unwrap(), 10);
        assert_eq!(RecentQuery { limit: Some(50) }.validate().unwrap(), 50);
        assert!(RecentQuery { limit: Some(51) }.validate().is_err());
    }

    #[test]
    fn comment_content_is_trimmed_and_required() {
        let comment = CommentRequest {
            content: Some("  hello  ".into()),
            parent_comment_id: Some(4),
        }
        .validate()
        .unwrap();
        assert_eq!(comment.content, "hello");
        assert_eq!(comment.parent_comment_id, Some(4));

        match (CommentRequest { content: Some("   ".into()), parent_comment_id: Some(0) }).validate() {
            Err(ApiError::Validation(messages)) => assert_eq!(
                messages,
                vec!["Comment content cannot be empty", "Parent comment ID must be positive"]
            ),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
