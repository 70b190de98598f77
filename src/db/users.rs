use sqlx::PgPool;

use super::like_pattern;
use crate::models::user::{Credentials, User, UserSearchResult, UserSummary};

const USER_COLUMNS: &str =
    "id, username, email, image, bio, location, website, twitter, instagram, created_at";

const SEARCH_LIMIT: i64 = 20;

pub async fn list_users(pool: &PgPool) -> Result<Vec<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>(
        "SELECT id, username, email, image FROM users ORDER BY username",
    )
    .fetch_all(pool)
    .await
}

// Case-insensitive match on username or email
pub async fn search_users(
    pool: &PgPool,
    term: &str,
    viewer: Option<i32>,
) -> Result<Vec<UserSearchResult>, sqlx::Error> {
    sqlx::query_as::<_, UserSearchResult>(
        "SELECT u.id, u.username, u.email, u.image,
                EXISTS (
                    SELECT 1 FROM follows f
                    WHERE f.follower_id = $2 AND f.followed_id = u.id
                ) AS is_following
         FROM users u
         WHERE u.username ILIKE $1 OR u.email ILIKE $1
         ORDER BY u.username
         LIMIT $3",
    )
    .bind(like_pattern(term))
    .bind(viewer)
    .bind(SEARCH_LIMIT)
    .fetch_all(pool)
    .await
}

pub async fn find_user(pool: &PgPool, id: i32) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn user_exists(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    image: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, email, image, password_hash)
         VALUES ($1, $2, $3, $4)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(username)
    .bind(email)
    .bind(image)
    .bind(password_hash)
    .fetch_one(pool)
    .await
}

// Login accepts either the username or the email
pub async fn find_credentials(
    pool: &PgPool,
    login: &str,
) -> Result<Option<Credentials>, sqlx::Error> {
    sqlx::query_as::<_, Credentials>(
        "SELECT id, password_hash FROM users WHERE username = $1 OR email = LOWER($1)",
    )
    .bind(login.trim())
    .fetch_optional(pool)
    .await
}

pub async fn find_user_id_by_email(pool: &PgPool, email: &str) -> Result<Option<i32>, sqlx::Error> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT id FROM users WHERE email = LOWER($1)")
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.0))
}

pub async fn update_user(pool: &PgPool, user: &User) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users
         SET username = $2, email = $3, image = $4, bio = $5, location = $6,
             website = $7, twitter = $8, instagram = $9
         WHERE id = $1
         RETURNING {USER_COLUMNS}"
    ))
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.image)
    .bind(&user.bio)
    .bind(&user.location)
    .bind(&user.website)
    .bind(&user.twitter)
    .bind(&user.instagram)
    .fetch_one(pool)
    .await
}
