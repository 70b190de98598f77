use axum::extract::{Path, Query, State};
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use crate::{
    auth::{AuthUser, MaybeAuthUser},
    db,
    error::AppError,
    models::user::{UpdateUser, User, UserProfile, UserSearchResult, UserSummary},
};

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

pub fn routes() -> Router<PgPool> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/search", get(search_users))
        .route("/users/:id", get(get_user).patch(update_user))
}

pub async fn list_users(State(pool): State<PgPool>) -> Result<Json<Vec<UserSummary>>, AppError> {
    Ok(Json(db::users::list_users(&pool).await?))
}

pub async fn search_users(
    State(pool): State<PgPool>,
    viewer: MaybeAuthUser,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<UserSearchResult>>, AppError> {
    let term = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::bad_request("Missing search term"))?;

    Ok(Json(db::users::search_users(&pool, term, viewer.id()).await?))
}

pub async fn get_user(
    State(pool): State<PgPool>,
    viewer: MaybeAuthUser,
    Path(id): Path<i32>,
) -> Result<Json<UserProfile>, AppError> {
    let user = db::users::find_user(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let activities = db::activities::list_for_user(&pool, id, viewer.id()).await?;
    let comments = db::comments::list_for_user(&pool, id).await?;
    let followers = db::social::followers(&pool, id).await?;
    let following = db::social::following(&pool, id).await?;

    Ok(Json(UserProfile {
        user,
        activities,
        comments,
        followers,
        following,
    }))
}

pub async fn update_user(
    State(pool): State<PgPool>,
    caller: AuthUser,
    Path(id): Path<i32>,
    Json(patch): Json<UpdateUser>,
) -> Result<Json<User>, AppError> {
    if caller.id() != id {
        return Err(AppError::forbidden("You can only edit your own profile"));
    }

    let updated = db::users::update_user(&pool, &patch.apply(&caller.user)?).await?;
    info!(user_id = id, "profile updated");

    Ok(Json(updated))
}
