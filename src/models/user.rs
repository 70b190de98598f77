use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    activity::ActivityView, comment::CommentView, double_option, optional_text, ValidationError,
};

pub const DEFAULT_AVATAR: &str = "/default-avatar.png";
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub image: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub image: String,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserSearchResult {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub image: String,
    pub is_following: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Credentials {
    pub id: i32,
    pub password_hash: String,
}

#[derive(Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub activities: Vec<ActivityView>,
    pub comments: Vec<CommentView>,
    pub followers: Vec<UserSummary>,
    pub following: Vec<UserSummary>,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub image: Option<String>,
}

/// Fields a user may change on their own profile.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub website: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub twitter: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub instagram: Option<Option<String>>,
}

impl UpdateUser {
    /// Merges the patch onto `current` and validates the result.
    pub fn apply(self, current: &User) -> Result<User, ValidationError> {
        let mut next = current.clone();

        if let Some(username) = self.username {
            next.username = validate_username(&username)?;
        }
        if let Some(email) = self.email {
            next.email = validate_email(&email)?;
        }
        if let Some(image) = self.image {
            next.image = normalize_image(Some(image));
        }

        let profile_field = |field, patch: Option<Option<String>>, old: Option<String>| match patch {
            None => Ok(old),
            Some(value) => optional_text(field, value, 500),
        };
        next.bio = profile_field("bio", self.bio, next.bio)?;
        next.location = profile_field("location", self.location, next.location)?;
        next.website = profile_field("website", self.website, next.website)?;
        next.twitter = profile_field("twitter", self.twitter, next.twitter)?
            .map(|handle| handle.trim_start_matches('@').to_string());
        next.instagram = profile_field("instagram", self.instagram, next.instagram)?
            .map(|handle| handle.trim_start_matches('@').to_string());

        Ok(next)
    }
}

pub fn validate_username(raw: &str) -> Result<String, ValidationError> {
    let username = raw.trim();
    let len = username.chars().count();
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-');

    if !(3..=30).contains(&len) || !username.chars().all(allowed) {
        return Err(ValidationError::InvalidUsername);
    }
    Ok(username.to_string())
}

pub fn validate_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@').ok_or(ValidationError::InvalidEmail)?;

    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@');
    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN));
    }
    Ok(())
}

pub fn normalize_image(image: Option<String>) -> String {
    match image.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_AVATAR.to_string(),
        Some(url) => url.to_string(),
    }
}
