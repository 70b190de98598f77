use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use crate::{auth, db, models::activity::{ActivityDraft, ACTIVITY_TYPES}};

const USER_COUNT: usize = 10;
const ACTIVITY_COUNT: usize = 20;
const COMMENT_COUNT: usize = 30;
const SEED_PASSWORD: &str = "password123";

const NAMES: &[&str] = &[
    "fern", "moss", "heron", "lichen", "otter", "sparrow", "cedar", "brook", "wren", "juniper",
];

const SENTENCES: &[&str] = &[
    "The light was soft and the wind barely moved.",
    "Found a quiet spot away from the trail.",
    "Stayed until the last of the colour left the sky.",
    "Nothing to hurry for today.",
    "Heard a woodpecker somewhere behind the ridge.",
    "The tide pulled back further than I expected.",
    "Brought a thermos and forgot the cups.",
    "Counted more than I could remember afterwards.",
];

const REPLIES: &[&str] = &[
    "This looks so peaceful!",
    "Adding this spot to my list.",
    "Love this, thanks for sharing.",
    "I need to try this soon.",
    "What a great way to spend the afternoon.",
    "Beautiful.",
];

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub async fn run(pool: &PgPool) -> Result<(), SeedError> {
    info!("Starting seed");
    db::init_db(pool).await?;

    let mut rng = StdRng::from_entropy();
    let now = Utc::now();

    info!("Deleting existing data");
    sqlx::query(
        "TRUNCATE user_badges, follows, likes, comments, activities, password_resets, sessions, users
         RESTART IDENTITY CASCADE",
    )
    .execute(pool)
    .await?;

    info!("Creating users");
    let password_hash = auth::hash_password(SEED_PASSWORD);
    let mut user_ids = Vec::with_capacity(USER_COUNT);
    for (i, name) in NAMES.iter().cycle().take(USER_COUNT).enumerate() {
        let username = format!("{name}{i}");
        let image = format!("https://i.pravatar.cc/150?u={username}");
        let user = db::users::create_user(
            pool,
            &username,
            &format!("{username}@example.com"),
            &image,
            &password_hash,
        )
        .await?;
        user_ids.push(user.id);
    }

    info!("Creating activities");
    let mut activity_ids = Vec::with_capacity(ACTIVITY_COUNT);
    for _ in 0..ACTIVITY_COUNT {
        let draft = random_activity(&mut rng, now);
        let user_id = pick(&mut rng, &user_ids);
        activity_ids.push(db::activities::create_activity(pool, user_id, &draft).await?);
    }

    info!("Creating comments");
    for _ in 0..COMMENT_COUNT {
        let posted_at = time_this_year(&mut rng, now);
        sqlx::query(
            "INSERT INTO comments (content, activity_id, user_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $4)",
        )
        .bind(pick(&mut rng, REPLIES))
        .bind(pick(&mut rng, &activity_ids))
        .bind(pick(&mut rng, &user_ids))
        .bind(posted_at)
        .execute(pool)
        .await?;
    }

    info!(
        users = USER_COUNT,
        activities = ACTIVITY_COUNT,
        comments = COMMENT_COUNT,
        "Seeding complete"
    );
    Ok(())
}

fn pick<T: Copy>(rng: &mut impl Rng, items: &[T]) -> T {
    *items.choose(rng).unwrap_or(&items[0])
}

fn random_activity(rng: &mut impl Rng, now: DateTime<Utc>) -> ActivityDraft {
    let description = SENTENCES
        .choose_multiple(rng, 3)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    ActivityDraft {
        title: pick(rng, ACTIVITY_TYPES).to_string(),
        activity_type: pick(rng, ACTIVITY_TYPES).to_string(),
        description: Some(description),
        datetime: time_this_year(rng, now),
        duration_seconds: Some(rng.gen_range(10..=240) * 60),
        location_name: None,
        latitude: None,
        longitude: None,
        weather: None,
        song: None,
        photos: String::new(),
    }
}

/// A uniformly random instant between January 1st of `now`'s year and `now`.
fn time_this_year(rng: &mut impl Rng, now: DateTime<Utc>) -> DateTime<Utc> {
    let start = NaiveDate::from_ymd_opt(now.year(), 1, 1)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now);
    let span = (now - start).num_seconds().max(0);
    start + Duration::seconds(rng.gen_range(0..=span))
}
