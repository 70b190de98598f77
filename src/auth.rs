//! Password hashing, session tokens and the bearer-token extractors.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use subtle::ConstantTimeEq;

use crate::{db, error::AppError, models::user::User};

const TOKEN_LENGTH: usize = 64;
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;
const HASH_ROUNDS: u32 = 100_000;
const SCHEME: &str = "pbkdf2-sha256";

/// Hashes a password as `pbkdf2-sha256$<rounds>$<salt>$<hash>` with a fresh salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill(&mut salt);
    hash_with(password, &salt, HASH_ROUNDS)
}

pub(crate) fn hash_with(password: &str, salt: &[u8], rounds: u32) -> String {
    format!(
        "{SCHEME}${rounds}${}${}",
        STANDARD.encode(salt),
        STANDARD.encode(derive_key(password, salt, rounds))
    )
}

fn derive_key(password: &str, salt: &[u8], rounds: u32) -> [u8; HASH_LENGTH] {
    let mut key = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut key);
    key
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(rounds), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    let (Ok(rounds), Ok(salt), Ok(expected)) = (
        rounds.parse::<u32>(),
        STANDARD.decode(salt),
        STANDARD.decode(expected),
    ) else {
        return false;
    };
    if rounds == 0 {
        return false;
    }

    derive_key(password, &salt, rounds)
        .as_slice()
        .ct_eq(&expected)
        .into()
}

pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Sessions are stored by digest so a leaked table does not leak live tokens.
pub fn token_digest(token: &str) -> String {
    STANDARD.encode(Sha256::digest(token.as_bytes()))
}

pub fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The caller, resolved from `Authorization: Bearer <token>`.
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.user.id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::unauthorized("Missing bearer token"))?
            .to_string();

        let pool = PgPool::from_ref(state);
        let user = db::sessions::find_user_by_token(&pool, &token_digest(&token))
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired token"))?;

        Ok(AuthUser { user, token })
    }
}

/// Like [`AuthUser`], but anonymous requests are allowed.
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn id(&self) -> Option<i32> {
        self.0.as_ref().map(AuthUser::id)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(MaybeAuthUser(None));
        }
        AuthUser::from_request_parts(parts, state)
            .await
            .map(|user| MaybeAuthUser(Some(user)))
    }
}
