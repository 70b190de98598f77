use sqlx::PgPool;

use crate::badges::EarnedBadge;

pub async fn earned_badges(pool: &PgPool, user_id: i32) -> Result<Vec<EarnedBadge>, sqlx::Error> {
    sqlx::query_as::<_, EarnedBadge>(
        "SELECT badge_id, earned_date FROM user_badges WHERE user_id = $1 ORDER BY earned_date",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

// Earned badges are never revoked, so re-recording one is a no-op
pub async fn record_badges(
    pool: &PgPool,
    user_id: i32,
    badge_ids: &[&str],
) -> Result<u64, sqlx::Error> {
    if badge_ids.is_empty() {
        return Ok(0);
    }

    let ids: Vec<String> = badge_ids.iter().map(|id| id.to_string()).collect();
    let result = sqlx::query(
        "INSERT INTO user_badges (user_id, badge_id)
         SELECT $1, UNNEST($2::TEXT[])
         ON CONFLICT (user_id, badge_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(ids)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
