use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{required_text, user::UserSummary, ValidationError};

pub const MAX_COMMENT_LEN: usize = 1000;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i32,
    pub content: String,
    pub activity_id: i32,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: UserSummary,
}

#[derive(Debug, sqlx::FromRow)]
pub struct CommentRow {
    pub id: i32,
    pub content: String,
    pub activity_id: i32,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_username: String,
    pub author_email: String,
    pub author_image: String,
}

impl From<CommentRow> for CommentView {
    fn from(row: CommentRow) -> Self {
        CommentView {
            user: UserSummary {
                id: row.user_id,
                username: row.author_username,
                email: row.author_email,
                image: row.author_image,
            },
            comment: Comment {
                id: row.id,
                content: row.content,
                activity_id: row.activity_id,
                user_id: row.user_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewComment {
    pub activity_id: i32,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateComment {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentQuery {
    pub activity_id: Option<i32>,
}

pub fn validate_content(content: &str) -> Result<String, ValidationError> {
    required_text("content", content, MAX_COMMENT_LEN)
}
