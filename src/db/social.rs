use sqlx::PgPool;

use crate::models::user::UserSummary;

// Likes

pub async fn like(pool: &PgPool, user_id: i32, activity_id: i32) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO likes (user_id, activity_id) VALUES ($1, $2)
         ON CONFLICT (user_id, activity_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(activity_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn unlike(pool: &PgPool, user_id: i32, activity_id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM likes WHERE user_id = $1 AND activity_id = $2")
        .bind(user_id)
        .bind(activity_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn like_count(pool: &PgPool, activity_id: i32) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM likes WHERE activity_id = $1")
        .bind(activity_id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn likers(pool: &PgPool, activity_id: i32) -> Result<Vec<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>(
        "SELECT u.id, u.username, u.email, u.image
         FROM likes l JOIN users u ON u.id = l.user_id
         WHERE l.activity_id = $1
         ORDER BY l.created_at DESC, u.id",
    )
    .bind(activity_id)
    .fetch_all(pool)
    .await
}

// Follows

pub async fn follow(pool: &PgPool, follower_id: i32, followed_id: i32) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO follows (follower_id, followed_id) VALUES ($1, $2)
         ON CONFLICT (follower_id, followed_id) DO NOTHING",
    )
    .bind(follower_id)
    .bind(followed_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn unfollow(
    pool: &PgPool,
    follower_id: i32,
    followed_id: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
        .bind(follower_id)
        .bind(followed_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn follower_count(pool: &PgPool, user_id: i32) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE followed_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn following_count(pool: &PgPool, user_id: i32) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn followers(pool: &PgPool, user_id: i32) -> Result<Vec<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>(
        "SELECT u.id, u.username, u.email, u.image
         FROM follows f JOIN users u ON u.id = f.follower_id
         WHERE f.followed_id = $1
         ORDER BY f.created_at DESC, u.id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn following(pool: &PgPool, user_id: i32) -> Result<Vec<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>(
        "SELECT u.id, u.username, u.email, u.image
         FROM follows f JOIN users u ON u.id = f.followed_id
         WHERE f.follower_id = $1
         ORDER BY f.created_at DESC, u.id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{activity, at, user};

    #[sqlx::test(migrations = "./migrations")]
    async fn likes_are_idempotent(pool: PgPool) {
        let heron = user(&pool, "heron").await;
        let otter = user(&pool, "otter").await;
        let id = activity(&pool, heron, "estuary", at(6, 18)).await;

        like(&pool, otter, id).await.unwrap();
        like(&pool, otter, id).await.unwrap();
        assert_eq!(like_count(&pool, id).await.unwrap(), 1);
        assert_eq!(likers(&pool, id).await.unwrap()[0].id, otter);

        unlike(&pool, otter, id).await.unwrap();
        unlike(&pool, otter, id).await.unwrap();
        assert_eq!(like_count(&pool, id).await.unwrap(), 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn follows_are_idempotent(pool: PgPool) {
        let cedar = user(&pool, "cedar").await;
        let brook = user(&pool, "brook").await;

        follow(&pool, cedar, brook).await.unwrap();
        follow(&pool, cedar, brook).await.unwrap();
        assert_eq!(follower_count(&pool, brook).await.unwrap(), 1);
        assert_eq!(following_count(&pool, cedar).await.unwrap(), 1);
        assert_eq!(following(&pool, cedar).await.unwrap()[0].id, brook);
        assert_eq!(followers(&pool, brook).await.unwrap()[0].id, cedar);

        unfollow(&pool, cedar, brook).await.unwrap();
        unfollow(&pool, cedar, brook).await.unwrap();
        assert_eq!(follower_count(&pool, brook).await.unwrap(), 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn self_follow_violates_the_check(pool: PgPool) {
        let sparrow = user(&pool, "sparrow").await;
        let err = follow(&pool, sparrow, sparrow).await.unwrap_err();
        assert!(matches!(err, sqlx::Error::Database(_)));
        assert_eq!(follower_count(&pool, sparrow).await.unwrap(), 0);
    }
}
