use axum::extract::State;
use axum::http::StatusCode;
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{self, AuthUser},
    config::CONFIG,
    db,
    error::AppError,
    models::user::{
        normalize_image, validate_email, validate_password, validate_username, SignupRequest,
        User,
    },
};

const RESET_REQUESTED: &str = "If an account exists for that email, a reset link has been sent.";
const RESET_DONE: &str = "Password has been reset.";
const BAD_RESET_TOKEN: &str = "Invalid or expired reset token";

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct ResetRequest {
    email: String,
}

#[derive(Deserialize)]
struct ResetPasswordRequest {
    token: String,
    password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

pub fn routes() -> Router<PgPool> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
        .route("/request-password-reset", post(request_password_reset))
        .route("/reset-password", post(reset_password))
}

async fn start_session(pool: &PgPool, user: User) -> Result<SessionResponse, AppError> {
    let token = auth::generate_token();
    db::sessions::create_session(pool, user.id, &auth::token_digest(&token)).await?;
    Ok(SessionResponse { token, user })
}

pub async fn signup(
    State(pool): State<PgPool>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let username = validate_username(&req.username)?;
    let email = validate_email(&req.email)?;
    validate_password(&req.password)?;

    let user = db::users::create_user(
        &pool,
        &username,
        &email,
        &normalize_image(req.image),
        &auth::hash_password(&req.password),
    )
    .await?;
    info!(user_id = user.id, %username, "user signed up");

    Ok((StatusCode::CREATED, Json(start_session(&pool, user).await?)))
}

pub async fn login(
    State(pool): State<PgPool>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let invalid = || AppError::unauthorized("Invalid username or password");

    let credentials = db::users::find_credentials(&pool, &req.username)
        .await?
        .ok_or_else(invalid)?;
    if !auth::verify_password(&req.password, &credentials.password_hash) {
        return Err(invalid());
    }

    let user = db::users::find_user(&pool, credentials.id)
        .await?
        .ok_or_else(invalid)?;
    info!(user_id = user.id, "user logged in");

    Ok(Json(start_session(&pool, user).await?))
}

pub async fn me(caller: AuthUser) -> Json<User> {
    Json(caller.user)
}

pub async fn logout(State(pool): State<PgPool>, caller: AuthUser) -> Result<StatusCode, AppError> {
    db::sessions::delete_session(&pool, &auth::token_digest(&caller.token)).await?;
    info!(user_id = caller.id(), "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

// Same reply whether or not the address is registered
pub async fn request_password_reset(
    State(pool): State<PgPool>,
    Json(req): Json<ResetRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Ok(email) = validate_email(&req.email) {
        if let Some(user_id) = db::users::find_user_id_by_email(&pool, &email).await? {
            let ttl = CONFIG.reset_token_ttl_minutes;
            let token = db::sessions::create_password_reset(&pool, user_id, ttl).await?;
            let reset_link = format!("/reset-password?token={token}");
            info!(user_id, %reset_link, "password reset issued");
        }
    }

    Ok(Json(json!({ "message": RESET_REQUESTED })))
}

pub async fn reset_password(
    State(pool): State<PgPool>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = Uuid::parse_str(req.token.trim())
        .map_err(|_| AppError::bad_request(BAD_RESET_TOKEN))?;
    validate_password(&req.password).map_err(|e| AppError::bad_request(e.to_string()))?;

    let password_hash = auth::hash_password(&req.password);
    let user_id = db::sessions::reset_password(&pool, token, &password_hash)
        .await?
        .ok_or_else(|| AppError::bad_request(BAD_RESET_TOKEN))?;
    info!(user_id, "password reset completed");

    Ok(Json(json!({ "message": RESET_DONE })))
}
