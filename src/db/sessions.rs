use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::User;

pub async fn create_session(
    pool: &PgPool,
    user_id: i32,
    token_digest: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO sessions (token_hash, user_id) VALUES ($1, $2)")
        .bind(token_digest)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn find_user_by_token(
    pool: &PgPool,
    token_digest: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT u.id, u.username, u.email, u.image, u.bio, u.location, u.website,
                u.twitter, u.instagram, u.created_at
         FROM sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.token_hash = $1",
    )
    .bind(token_digest)
    .fetch_optional(pool)
    .await
}

pub async fn delete_session(pool: &PgPool, token_digest: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
        .bind(token_digest)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn create_password_reset(
    pool: &PgPool,
    user_id: i32,
    ttl_minutes: i64,
) -> Result<Uuid, sqlx::Error> {
    let token = Uuid::new_v4();
    let expires_at = Utc::now() + Duration::minutes(ttl_minutes);

    sqlx::query("INSERT INTO password_resets (token, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;
    Ok(token)
}

/// Spends the reset token, sets the new password and signs the user out
/// everywhere. Returns `None` when the token is unknown, used or expired.
pub async fn reset_password(
    pool: &PgPool,
    token: Uuid,
    password_hash: &str,
) -> Result<Option<i32>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let user_id: Option<(i32,)> = sqlx::query_as(
        "UPDATE password_resets
         SET used = TRUE
         WHERE token = $1 AND NOT used AND expires_at > NOW()
         RETURNING user_id",
    )
    .bind(token)
    .fetch_optional(&mut tx)
    .await?;

    let Some((user_id,)) = user_id else {
        tx.rollback().await?;
        return Ok(None);
    };

    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut tx)
        .await?;

    sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut tx)
        .await?;

    tx.commit().await?;
    Ok(Some(user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth, db::{tests::user, users}};

    #[sqlx::test(migrations = "./migrations")]
    async fn reset_token_is_single_use_and_signs_out(pool: PgPool) {
        let juniper = user(&pool, "juniper").await;
        create_session(&pool, juniper, "digest-a").await.unwrap();
        create_session(&pool, juniper, "digest-b").await.unwrap();

        let token = create_password_reset(&pool, juniper, 60).await.unwrap();
        let hash = auth::hash_password("newpassword");
        assert_eq!(reset_password(&pool, token, &hash).await.unwrap(), Some(juniper));

        assert!(find_user_by_token(&pool, "digest-a").await.unwrap().is_none());
        assert!(find_user_by_token(&pool, "digest-b").await.unwrap().is_none());

        let creds = users::find_credentials(&pool, "juniper").await.unwrap().unwrap();
        assert!(auth::verify_password("newpassword", &creds.password_hash));

        let again = auth::hash_password("another");
        assert_eq!(reset_password(&pool, token, &again).await.unwrap(), None);
        let creds = users::find_credentials(&pool, "juniper").await.unwrap().unwrap();
        assert!(auth::verify_password("newpassword", &creds.password_hash));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn expired_reset_token_is_refused(pool: PgPool) {
        let wren = user(&pool, "wren").await;
        create_session(&pool, wren, "still-valid").await.unwrap();

        let token = create_password_reset(&pool, wren, -1).await.unwrap();
        let hash = auth::hash_password("newpassword");
        assert_eq!(reset_password(&pool, token, &hash).await.unwrap(), None);
        assert_eq!(reset_password(&pool, Uuid::new_v4(), &hash).await.unwrap(), None);

        let session = find_user_by_token(&pool, "still-valid").await.unwrap();
        assert_eq!(session.map(|u| u.id), Some(wren));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn logout_drops_only_that_session(pool: PgPool) {
        let fern = user(&pool, "fern").await;
        create_session(&pool, fern, "phone").await.unwrap();
        create_session(&pool, fern, "laptop").await.unwrap();

        delete_session(&pool, "phone").await.unwrap();
        assert!(find_user_by_token(&pool, "phone").await.unwrap().is_none());
        assert!(find_user_by_token(&pool, "laptop").await.unwrap().is_some());
    }
}
