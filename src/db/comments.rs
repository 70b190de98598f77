use sqlx::PgPool;

use crate::models::comment::{Comment, CommentRow, CommentView};

const VIEW_SELECT: &str = "SELECT c.id, c.content, c.activity_id, c.user_id, c.created_at, \
     c.updated_at, u.username AS author_username, u.email AS author_email, \
     u.image AS author_image \
     FROM comments c JOIN users u ON u.id = c.user_id";

pub async fn list_for_activity(
    pool: &PgPool,
    activity_id: i32,
) -> Result<Vec<CommentView>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CommentRow>(&format!(
        "{VIEW_SELECT} WHERE c.activity_id = $1 ORDER BY c.created_at, c.id"
    ))
    .bind(activity_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(CommentView::from).collect())
}

pub async fn list_for_user(pool: &PgPool, user_id: i32) -> Result<Vec<CommentView>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CommentRow>(&format!(
        "{VIEW_SELECT} WHERE c.user_id = $1 ORDER BY c.created_at DESC, c.id DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(CommentView::from).collect())
}

pub async fn find_view(pool: &PgPool, id: i32) -> Result<Option<CommentView>, sqlx::Error> {
    let row = sqlx::query_as::<_, CommentRow>(&format!("{VIEW_SELECT} WHERE c.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(CommentView::from))
}

pub async fn find_comment(pool: &PgPool, id: i32) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        "SELECT id, content, activity_id, user_id, created_at, updated_at
         FROM comments WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create_comment(
    pool: &PgPool,
    activity_id: i32,
    user_id: i32,
    content: &str,
) -> Result<i32, sqlx::Error> {
    let row: (i32,) = sqlx::query_as(
        "INSERT INTO comments (content, activity_id, user_id) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(content)
    .bind(activity_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn update_comment(pool: &PgPool, id: i32, content: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(content)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_comment(pool: &PgPool, id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn count_by_user(pool: &PgPool, user_id: i32) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
