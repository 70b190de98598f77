use axum::extract::{Path, State};
use axum::{routing::get, Json, Router};
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use super::require_user;
use crate::{
    badges::{self, Badge, BadgeStats, BadgeStatus, SocialCounts, BADGES},
    db,
    error::AppError,
    stats::{self, ActivityStats},
};

pub fn routes() -> Router<PgPool> {
    Router::new()
        .route("/badges", get(list_badges))
        .route("/users/:id/stats", get(user_stats))
        .route("/users/:id/badges", get(user_badges))
}

pub async fn list_badges() -> Json<&'static [Badge]> {
    Json(BADGES)
}

pub async fn user_stats(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
) -> Result<Json<ActivityStats>, AppError> {
    require_user(&pool, id).await?;
    let activities = db::activities::all_for_user(&pool, id).await?;

    Ok(Json(stats::activity_stats(
        &activities,
        Utc::now().date_naive(),
    )))
}

pub async fn user_badges(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<BadgeStatus>>, AppError> {
    require_user(&pool, id).await?;

    let activities = db::activities::all_for_user(&pool, id).await?;
    let social = SocialCounts {
        following: db::social::following_count(&pool, id).await?,
        followers: db::social::follower_count(&pool, id).await?,
        comments: db::comments::count_by_user(&pool, id).await?,
    };
    let badge_stats = BadgeStats::collect(&activities, social, Utc::now().date_naive());

    let mut earned = db::badges::earned_badges(&pool, id).await?;
    let fresh = badges::newly_earned(&badge_stats, &earned);
    if !fresh.is_empty() {
        let recorded = db::badges::record_badges(&pool, id, &fresh).await?;
        info!(user_id = id, badges = ?fresh, recorded, "badges earned");

        // Stored dates, including rows a concurrent request inserted
        earned = db::badges::earned_badges(&pool, id).await?;
    }

    Ok(Json(badges::user_badges(&badge_stats, &earned)))
}
