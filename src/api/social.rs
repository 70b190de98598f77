use axum::extract::{Path, State};
use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;

use super::{require_activity, require_user};
use crate::{auth::AuthUser, db, error::AppError, models::user::UserSummary};

#[derive(Serialize)]
pub struct LikeState {
    pub like_count: i64,
    pub user_liked: bool,
}

#[derive(Serialize)]
pub struct FollowState {
    pub following: bool,
    pub follower_count: i64,
}

pub fn routes() -> Router<PgPool> {
    Router::new()
        .route("/activities/:id/like", post(like_activity))
        .route("/activities/:id/unlike", delete(unlike_activity))
        .route("/activities/:id/likes", get(list_likes))
        .route("/users/:id/follow", post(follow_user))
        .route("/users/:id/unfollow", delete(unfollow_user))
        .route("/users/:id/followers", get(list_followers))
        .route("/users/:id/following", get(list_following))
}

pub async fn like_activity(
    State(pool): State<PgPool>,
    caller: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<LikeState>, AppError> {
    require_activity(&pool, id).await?;
    db::social::like(&pool, caller.id(), id).await?;

    Ok(Json(LikeState {
        like_count: db::social::like_count(&pool, id).await?,
        user_liked: true,
    }))
}

pub async fn unlike_activity(
    State(pool): State<PgPool>,
    caller: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<LikeState>, AppError> {
    require_activity(&pool, id).await?;
    db::social::unlike(&pool, caller.id(), id).await?;

    Ok(Json(LikeState {
        like_count: db::social::like_count(&pool, id).await?,
        user_liked: false,
    }))
}

pub async fn list_likes(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    require_activity(&pool, id).await?;
    Ok(Json(db::social::likers(&pool, id).await?))
}

pub async fn follow_user(
    State(pool): State<PgPool>,
    caller: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<FollowState>, AppError> {
    if caller.id() == id {
        return Err(AppError::bad_request("You cannot follow yourself"));
    }
    require_user(&pool, id).await?;

    db::social::follow(&pool, caller.id(), id).await?;
    info!(follower = caller.id(), followed = id, "user followed");

    Ok(Json(FollowState {
        following: true,
        follower_count: db::social::follower_count(&pool, id).await?,
    }))
}

pub async fn unfollow_user(
    State(pool): State<PgPool>,
    caller: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<FollowState>, AppError> {
    require_user(&pool, id).await?;

    db::social::unfollow(&pool, caller.id(), id).await?;
    info!(follower = caller.id(), followed = id, "user unfollowed");

    Ok(Json(FollowState {
        following: false,
        follower_count: db::social::follower_count(&pool, id).await?,
    }))
}

pub async fn list_followers(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    require_user(&pool, id).await?;
    Ok(Json(db::social::followers(&pool, id).await?))
}

pub async fn list_following(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    require_user(&pool, id).await?;
    Ok(Json(db::social::following(&pool, id).await?))
}
