use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A comment joined with its author's public details.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub content: String,
    pub parent_comment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub username: String,
    pub email: String,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub parent_comment_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadedComment {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<ThreadedComment>,
}

/// Nests a flat page of comments into reply trees.
///
/// A comment becomes a reply when its parent is part of the same page,
/// otherwise it is returned as a root. Input order is kept at every level.
pub fn thread_comments(comments: Vec<Comment>) -> Vec<ThreadedComment> {
    let ids: HashSet<i64> = comments.iter().map(|comment| comment.id).collect();
    let mut children: HashMap<i64, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();

    for (index, comment) in comments.iter().enumerate() {
        match comment.parent_comment_id {
            Some(parent) if parent != comment.id && ids.contains(&parent) => {
                children.entry(parent).or_default().push(index);
            }
            _ => roots.push(index),
        }
    }

    let mut slots: Vec<Option<Comment>> = comments.into_iter().map(Some).collect();
    roots
        .into_iter()
        .filter_map(|index| build_thread(index, &mut slots, &children))
        .collect()
}

fn build_thread(
    index: usize,
    slots: &mut [Option<Comment>],
    children: &HashMap<i64, Vec<usize>>,
) -> Option<ThreadedComment> {
    let comment = slots.get_mut(index)?.take()?;
    let replies = children
        .get(&comment.id)
        .map(|indexes| {
            indexes
                .iter()
                .filter_map(|&child| build_thread(child, slots, children))
                .collect()
        })
        .unwrap_or_default();
    Some(ThreadedComment { comment, replies })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: i64, parent: Option<i64>) -> Comment {
        Comment {
            id,
            project_id: 1,
            user_id: 1,
            content: format!("comment {id}"),
            parent_comment_id: parent,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            project_name: None,
        }
    }

    fn ids(threads: &[ThreadedComment]) -> Vec<i64> {
        threads.iter().map(|thread| thread.comment.id).collect()
    }

    #[test]
    fn nests_replies_under_their_parent() {
        let threads = thread_comments(vec![
            comment(4, Some(1)),
            comment(3, None),
            comment(2, Some(1)),
            comment(1, None),
        ]);

        assert_eq!(ids(&threads), vec![3, 1]);
        assert_eq!(ids(&threads[1].replies), vec![4, 2]);
        assert!(threads[0].replies.is_empty());
    }

    #[test]
    fn nests_replies_of_replies() {
        let threads = thread_comments(vec![
            comment(3, Some(2)),
            comment(2, Some(1)),
            comment(1, None),
        ]);

        assert_eq!(ids(&threads), vec![1]);
        assert_eq!(ids(&threads[0].replies), vec![2]);
        assert_eq!(ids(&threads[0].replies[0].replies), vec![3]);
    }

    #[test]
    fn reply_whose_parent_is_off_page_becomes_a_root() {
        let threads = thread_comments(vec![comment(9, Some(5)), comment(8, None)]);
        assert_eq!(ids(&threads), vec![9, 8]);
    }

    #[test]
    fn serializes_replies_next_to_comment_fields() {
        let threads = thread_comments(vec![comment(2, Some(1)), comment(1, None)]);
        let value = serde_json::to_value(&threads).unwrap();

        assert_eq!(value[0]["id"], 1);
        assert_eq!(value[0]["replies"][0]["id"], 2);
        assert_eq!(value[0]["replies"][0]["parent_comment_id"], 1);
        assert!(value[0].get("project_name").is_none());
    }
}
