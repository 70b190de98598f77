use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::{config::CONFIG, error::AppError, photos};

#[derive(Deserialize)]
struct PhotoUpload {
    data_url: String,
    file_name: Option<String>,
}

#[derive(Serialize)]
struct PhotoResponse {
    data_url: String,
    width: u32,
    height: u32,
}

pub fn routes() -> Router<PgPool> {
    Router::new().route("/photos", post(upload_photo))
}

async fn upload_photo(Json(req): Json<PhotoUpload>) -> Result<Json<PhotoResponse>, AppError> {
    let limits = CONFIG.photo;
    let photo = tokio::task::spawn_blocking(move || {
        photos::compress(&req.data_url, req.file_name.as_deref(), limits)
    })
    .await
    .map_err(|_| AppError::internal("Photo processing failed"))??;

    Ok(Json(PhotoResponse {
        data_url: photo.data_url,
        width: photo.width,
        height: photo.height,
    }))
}

/// Runs the photo pipeline over a stored photo string off the async runtime.
pub async fn normalize(stored: String) -> Result<String, AppError> {
    let limits = CONFIG.photo;
    let normalized = tokio::task::spawn_blocking(move || photos::normalize_photos(&stored, limits))
        .await
        .map_err(|_| AppError::internal("Photo processing failed"))??;
    Ok(normalized)
}
