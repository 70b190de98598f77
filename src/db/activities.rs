use std::collections::HashMap;

use sqlx::PgPool;

use crate::models::{
    activity::{Activity, ActivityDraft, ActivityFeedRow, ActivityView, FeedQuery},
    user::UserSummary,
};

const LIKE_USERS_SHOWN: usize = 5;

const ACTIVITY_COLUMNS: &str = "id, user_id, title, activity_type, description, datetime, \
     duration_seconds, location_name, latitude, longitude, weather, song, photos, \
     created_at, updated_at";

/// Optional filters shared by every feed query. `None` means "no filter".
#[derive(Debug, Default)]
struct FeedFilter {
    viewer: Option<i32>,
    author: Option<i32>,
    followed_by: Option<i32>,
    activity: Option<i32>,
    limit: Option<i64>,
    offset: i64,
}

#[derive(sqlx::FromRow)]
struct LikeUserRow {
    activity_id: i32,
    id: i32,
    username: String,
    email: String,
    image: String,
}

async fn fetch_views(pool: &PgPool, filter: FeedFilter) -> Result<Vec<ActivityView>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ActivityFeedRow>(
        "SELECT a.id, a.user_id, a.title, a.activity_type, a.description, a.datetime,
                a.duration_seconds, a.location_name, a.latitude, a.longitude, a.weather,
                a.song, a.photos, a.created_at, a.updated_at,
                u.username AS author_username,
                u.email AS author_email,
                u.image AS author_image,
                (SELECT COUNT(*) FROM likes l WHERE l.activity_id = a.id) AS like_count,
                (SELECT COUNT(*) FROM comments c WHERE c.activity_id = a.id) AS comment_count,
                EXISTS (
                    SELECT 1 FROM likes l WHERE l.activity_id = a.id AND l.user_id = $1
                ) AS user_liked
         FROM activities a
         JOIN users u ON u.id = a.user_id
         WHERE ($2::INT IS NULL OR a.user_id = $2)
           AND ($3::INT IS NULL
                OR a.user_id = $3
                OR a.user_id IN (SELECT followed_id FROM follows WHERE follower_id = $3))
           AND ($4::INT IS NULL OR a.id = $4)
         ORDER BY a.datetime DESC, a.id DESC
         LIMIT $5 OFFSET $6",
    )
    .bind(filter.viewer)
    .bind(filter.author)
    .bind(filter.followed_by)
    .bind(filter.activity)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
    let mut like_users = recent_likers(pool, ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let likers = like_users.remove(&row.id).unwrap_or_default();
            row.into_view(likers)
        })
        .collect())
}

// Most recent likers per activity, capped for the avatar strip
async fn recent_likers(
    pool: &PgPool,
    ids: Vec<i32>,
) -> Result<HashMap<i32, Vec<UserSummary>>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, LikeUserRow>(
        "SELECT l.activity_id, u.id, u.username, u.email, u.image
         FROM likes l
         JOIN users u ON u.id = l.user_id
         WHERE l.activity_id = ANY($1)
         ORDER BY l.created_at DESC, u.id",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<i32, Vec<UserSummary>> = HashMap::new();
    for row in rows {
        let likers = grouped.entry(row.activity_id).or_default();
        if likers.len() < LIKE_USERS_SHOWN {
            likers.push(UserSummary {
                id: row.id,
                username: row.username,
                email: row.email,
                image: row.image,
            });
        }
    }
    Ok(grouped)
}

pub async fn list_feed(
    pool: &PgPool,
    viewer: Option<i32>,
    query: &FeedQuery,
) -> Result<Vec<ActivityView>, sqlx::Error> {
    fetch_views(pool, FeedFilter {
        viewer,
        author: query.user_id,
        followed_by: if query.following { viewer } else { None },
        limit: Some(query.limit()),
        offset: query.offset(),
        ..Default::default()
    })
    .await
}

pub async fn list_for_user(
    pool: &PgPool,
    user_id: i32,
    viewer: Option<i32>,
) -> Result<Vec<ActivityView>, sqlx::Error> {
    fetch_views(pool, FeedFilter {
        viewer,
        author: Some(user_id),
        ..Default::default()
    })
    .await
}

pub async fn find_view(
    pool: &PgPool,
    id: i32,
    viewer: Option<i32>,
) -> Result<Option<ActivityView>, sqlx::Error> {
    let mut views = fetch_views(pool, FeedFilter {
        viewer,
        activity: Some(id),
        limit: Some(1),
        ..Default::default()
    })
    .await?;
    Ok(views.pop())
}

pub async fn find_activity(pool: &PgPool, id: i32) -> Result<Option<Activity>, sqlx::Error> {
    sqlx::query_as::<_, Activity>(&format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// All of a user's activities, oldest first, for stats and badges.
pub async fn all_for_user(pool: &PgPool, user_id: i32) -> Result<Vec<Activity>, sqlx::Error> {
    sqlx::query_as::<_, Activity>(&format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE user_id = $1 ORDER BY datetime"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn create_activity(
    pool: &PgPool,
    user_id: i32,
    draft: &ActivityDraft,
) -> Result<i32, sqlx::Error> {
    let row: (i32,) = sqlx::query_as(
        "INSERT INTO activities
            (user_id, title, activity_type, description, datetime, duration_seconds,
             location_name, latitude, longitude, weather, song, photos)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING id",
    )
    .bind(user_id)
    .bind(&draft.title)
    .bind(&draft.activity_type)
    .bind(&draft.description)
    .bind(draft.datetime)
    .bind(draft.duration_seconds)
    .bind(&draft.location_name)
    .bind(draft.latitude)
    .bind(draft.longitude)
    .bind(&draft.weather)
    .bind(&draft.song)
    .bind(&draft.photos)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn update_activity(
    pool: &PgPool,
    id: i32,
    draft: &ActivityDraft,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE activities
         SET title = $2, activity_type = $3, description = $4, datetime = $5,
             duration_seconds = $6, location_name = $7, latitude = $8, longitude = $9,
             weather = $10, song = $11, photos = $12, updated_at = NOW()
         WHERE id = $1",
    )
    .bind(id)
    .bind(&draft.title)
    .bind(&draft.activity_type)
    .bind(&draft.description)
    .bind(draft.datetime)
    .bind(draft.duration_seconds)
    .bind(&draft.location_name)
    .bind(draft.latitude)
    .bind(draft.longitude)
    .bind(&draft.weather)
    .bind(&draft.song)
    .bind(&draft.photos)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_activity(pool: &PgPool, id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM activities WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn activity_exists(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM activities WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
