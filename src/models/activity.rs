use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{double_option, optional_text, required_text, user::UserSummary, ValidationError};
use crate::photos;

pub const MAX_PHOTOS: usize = 10;
pub const MAX_TITLE_LEN: usize = 120;
pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Slow outdoor activities offered in the activity-type picker.
pub const ACTIVITY_TYPES: &[&str] = &[
    "Hammocking",
    "Rockhounding",
    "Sunset Watching",
    "Sunrise Watching",
    "Camping",
    "Foraging",
    "Stargazing",
    "Bird Watching",
    "Wood carving",
    "Seashell Collecting",
    "Fossil Hunting",
    "Fishing",
    "Picnicking",
    "Mycology Walk",
    "Outdoor Reading",
    "Campfire",
    "Bioblitzing",
    "Catching fireflies",
    "Tidepooling",
    "Building a sandcastle",
    "Building a snowman",
    "Skipping stones",
    "Catching amphibians and reptiles",
    "Gardening",
];

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Activity {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub activity_type: String,
    pub description: Option<String>,
    pub datetime: DateTime<Utc>,
    pub duration_seconds: Option<i32>,
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub weather: Option<String>,
    pub song: Option<String>,
    pub photos: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An activity as the feed renders it.
#[derive(Debug, Serialize)]
pub struct ActivityView {
    #[serde(flatten)]
    pub activity: Activity,
    pub user: UserSummary,
    pub like_count: i64,
    pub user_liked: bool,
    pub like_users: Vec<UserSummary>,
    pub comment_count: i64,
}

/// One feed row: activity columns, author columns and aggregate counts.
#[derive(Debug, sqlx::FromRow)]
pub struct ActivityFeedRow {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub activity_type: String,
    pub description: Option<String>,
    pub datetime: DateTime<Utc>,
    pub duration_seconds: Option<i32>,
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub weather: Option<String>,
    pub song: Option<String>,
    pub photos: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_username: String,
    pub author_email: String,
    pub author_image: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub user_liked: bool,
}

impl ActivityFeedRow {
    pub fn into_view(self, like_users: Vec<UserSummary>) -> ActivityView {
        ActivityView {
            user: UserSummary {
                id: self.user_id,
                username: self.author_username,
                email: self.author_email,
                image: self.author_image,
            },
            like_count: self.like_count,
            user_liked: self.user_liked,
            comment_count: self.comment_count,
            like_users,
            activity: Activity {
                id: self.id,
                user_id: self.user_id,
                title: self.title,
                activity_type: self.activity_type,
                description: self.description,
                datetime: self.datetime,
                duration_seconds: self.duration_seconds,
                location_name: self.location_name,
                latitude: self.latitude,
                longitude: self.longitude,
                weather: self.weather,
                song: self.song,
                photos: self.photos,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        }
    }
}

/// The writable columns of an activity after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityDraft {
    pub title: String,
    pub activity_type: String,
    pub description: Option<String>,
    pub datetime: DateTime<Utc>,
    pub duration_seconds: Option<i32>,
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub weather: Option<String>,
    pub song: Option<String>,
    pub photos: String,
}

impl ActivityDraft {
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.title = required_text("title", &self.title, MAX_TITLE_LEN)?;
        self.activity_type = required_text("activity_type", &self.activity_type, 60)?;
        self.description = optional_text("description", self.description, 5000)?;
        self.location_name = optional_text("location_name", self.location_name, 200)?;
        self.weather = optional_text("weather", self.weather, 60)?;
        self.song = optional_text("song", self.song, 200)?;

        if matches!(self.duration_seconds, Some(d) if d < 0) {
            return Err(ValidationError::NegativeDuration);
        }

        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => {
                check_range("latitude", lat, 90.0)?;
                check_range("longitude", lng, 180.0)?;
            }
            (None, None) => {}
            _ => return Err(ValidationError::IncompleteCoordinates),
        }

        let entries = photos::split_submitted(&self.photos);
        if entries.len() > MAX_PHOTOS {
            return Err(ValidationError::TooManyPhotos(MAX_PHOTOS));
        }
        self.photos = photos::join_photos(&entries);

        Ok(self)
    }
}

fn check_range(field: &'static str, value: f64, bound: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < -bound || value > bound {
        return Err(ValidationError::OutOfRange {
            field,
            min: -bound,
            max: bound,
        });
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct NewActivity {
    pub title: String,
    pub activity_type: String,
    pub description: Option<String>,
    pub datetime: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i32>,
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub weather: Option<String>,
    pub song: Option<String>,
    pub photos: Option<String>,
}

impl NewActivity {
    pub fn into_draft(self, now: DateTime<Utc>) -> Result<ActivityDraft, ValidationError> {
        ActivityDraft {
            title: self.title,
            activity_type: self.activity_type,
            description: self.description,
            datetime: self.datetime.unwrap_or(now),
            duration_seconds: self.duration_seconds,
            location_name: self.location_name,
            latitude: self.latitude,
            longitude: self.longitude,
            weather: self.weather,
            song: self.song,
            photos: self.photos.unwrap_or_default(),
        }
        .validate()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateActivity {
    pub title: Option<String>,
    pub activity_type: Option<String>,
    pub datetime: Option<DateTime<Utc>>,
    pub photos: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub duration_seconds: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub latitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub longitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub weather: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub song: Option<Option<String>>,
}

impl UpdateActivity {
    pub fn apply(self, current: &Activity) -> Result<ActivityDraft, ValidationError> {
        ActivityDraft {
            title: self.title.unwrap_or_else(|| current.title.clone()),
            activity_type: self
                .activity_type
                .unwrap_or_else(|| current.activity_type.clone()),
            description: self
                .description
                .unwrap_or_else(|| current.description.clone()),
            datetime: self.datetime.unwrap_or(current.datetime),
            duration_seconds: self.duration_seconds.unwrap_or(current.duration_seconds),
            location_name: self
                .location_name
                .unwrap_or_else(|| current.location_name.clone()),
            latitude: self.latitude.unwrap_or(current.latitude),
            longitude: self.longitude.unwrap_or(current.longitude),
            weather: self.weather.unwrap_or_else(|| current.weather.clone()),
            song: self.song.unwrap_or_else(|| current.song.clone()),
            photos: self.photos.unwrap_or_else(|| current.photos.clone()),
        }
        .validate()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub user_id: Option<i32>,
    #[serde(default)]
    pub following: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl FeedQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
