use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use super::photos::normalize;
use crate::{
    auth::{AuthUser, MaybeAuthUser},
    db,
    error::AppError,
    models::activity::{
        Activity, ActivityView, FeedQuery, NewActivity, UpdateActivity, ACTIVITY_TYPES,
    },
};

pub fn routes() -> Router<PgPool> {
    Router::new()
        .route("/activities", get(list_activities).post(create_activity))
        .route(
            "/activities/:id",
            get(get_activity)
                .patch(update_activity)
                .delete(delete_activity),
        )
        .route("/activity-types", get(activity_types))
}

pub async fn list_activities(
    State(pool): State<PgPool>,
    viewer: MaybeAuthUser,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<ActivityView>>, AppError> {
    if query.following && viewer.id().is_none() {
        return Err(AppError::unauthorized("Log in to see activities you follow"));
    }

    Ok(Json(db::activities::list_feed(&pool, viewer.id(), &query).await?))
}

pub async fn create_activity(
    State(pool): State<PgPool>,
    caller: AuthUser,
    Json(req): Json<NewActivity>,
) -> Result<(StatusCode, Json<ActivityView>), AppError> {
    let mut draft = req.into_draft(Utc::now())?;
    draft.photos = normalize(draft.photos).await?;

    let id = db::activities::create_activity(&pool, caller.id(), &draft).await?;
    info!(
        activity_id = id,
        user_id = caller.id(),
        activity_type = %draft.activity_type,
        "activity created"
    );

    let view = db::activities::find_view(&pool, id, Some(caller.id()))
        .await?
        .ok_or_else(|| AppError::not_found("Activity"))?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_activity(
    State(pool): State<PgPool>,
    viewer: MaybeAuthUser,
    Path(id): Path<i32>,
) -> Result<Json<ActivityView>, AppError> {
    db::activities::find_view(&pool, id, viewer.id())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Activity"))
}

/// Loads an activity and checks that the caller owns it.
async fn owned_activity(
    pool: &PgPool,
    caller: &AuthUser,
    id: i32,
) -> Result<Activity, AppError> {
    let activity = db::activities::find_activity(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Activity"))?;

    if activity.user_id != caller.id() {
        return Err(AppError::forbidden("You can only change your own activities"));
    }
    Ok(activity)
}

pub async fn update_activity(
    State(pool): State<PgPool>,
    caller: AuthUser,
    Path(id): Path<i32>,
    Json(patch): Json<UpdateActivity>,
) -> Result<Json<ActivityView>, AppError> {
    let current = owned_activity(&pool, &caller, id).await?;

    let photos_changed = patch.photos.is_some();
    let mut draft = patch.apply(&current)?;
    if photos_changed {
        draft.photos = normalize(draft.photos).await?;
    }

    db::activities::update_activity(&pool, id, &draft).await?;
    info!(activity_id = id, "activity updated");

    let view = db::activities::find_view(&pool, id, Some(caller.id()))
        .await?
        .ok_or_else(|| AppError::not_found("Activity"))?;
    Ok(Json(view))
}

pub async fn delete_activity(
    State(pool): State<PgPool>,
    caller: AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    owned_activity(&pool, &caller, id).await?;
    db::activities::delete_activity(&pool, id).await?;
    info!(activity_id = id, "activity deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn activity_types() -> Json<&'static [&'static str]> {
    Json(ACTIVITY_TYPES)
}
