use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{
    routing::{get, patch},
    Json, Router,
};
use sqlx::PgPool;
use tracing::info;

use crate::{
    auth::AuthUser,
    db,
    error::AppError,
    models::comment::{validate_content, CommentQuery, CommentView, NewComment, UpdateComment},
};

pub fn routes() -> Router<PgPool> {
    Router::new()
        .route("/comments", get(list_comments).post(create_comment))
        .route("/comments/:id", patch(update_comment).delete(delete_comment))
}

pub async fn list_comments(
    State(pool): State<PgPool>,
    Query(query): Query<CommentQuery>,
) -> Result<Json<Vec<CommentView>>, AppError> {
    let activity_id = query
        .activity_id
        .ok_or_else(|| AppError::bad_request("Missing activity_id param"))?;

    Ok(Json(db::comments::list_for_activity(&pool, activity_id).await?))
}

pub async fn create_comment(
    State(pool): State<PgPool>,
    caller: AuthUser,
    Json(req): Json<NewComment>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    let content = validate_content(&req.content)?;
    if !db::activities::activity_exists(&pool, req.activity_id).await? {
        return Err(AppError::not_found("Activity"));
    }

    let id =
        db::comments::create_comment(&pool, req.activity_id, caller.id(), &content).await?;
    info!(comment_id = id, activity_id = req.activity_id, "comment posted");

    let view = db::comments::find_view(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment"))?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn update_comment(
    State(pool): State<PgPool>,
    caller: AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<UpdateComment>,
) -> Result<Json<CommentView>, AppError> {
    let comment = db::comments::find_comment(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment"))?;
    if comment.user_id != caller.id() {
        return Err(AppError::forbidden("You can only edit your own comments"));
    }

    db::comments::update_comment(&pool, id, &validate_content(&req.content)?).await?;

    let view = db::comments::find_view(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment"))?;
    Ok(Json(view))
}

// The author or the owner of the activity may remove a comment
pub async fn delete_comment(
    State(pool): State<PgPool>,
    caller: AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let comment = db::comments::find_comment(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Comment"))?;

    if comment.user_id != caller.id() {
        let activity_owner = db::activities::find_activity(&pool, comment.activity_id)
            .await?
            .map(|activity| activity.user_id);
        if activity_owner != Some(caller.id()) {
            return Err(AppError::forbidden("You can only delete your own comments"));
        }
    }

    db::comments::delete_comment(&pool, id).await?;
    info!(comment_id = id, "comment deleted");
    Ok(StatusCode::NO_CONTENT)
}
