pub mod activity;
pub mod comment;
pub mod user;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} must not be blank")]
    Blank(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Username must be 3-30 characters of letters, digits, '_', '.' or '-'")]
    InvalidUsername,

    #[error("Email address is not valid")]
    InvalidEmail,

    #[error("Password must be at least {0} characters long")]
    PasswordTooShort(usize),

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("latitude and longitude must be provided together")]
    IncompleteCoordinates,

    #[error("duration_seconds must not be negative")]
    NegativeDuration,

    #[error("An activity can have at most {0} photos")]
    TooManyPhotos(usize),
}

/// Distinguishes an absent PATCH field (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

/// Trims a required text field and enforces its length.
pub fn required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// Trims an optional text field; blank becomes `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        Some(text) => Ok(Some(text.to_string())),
    }
}
