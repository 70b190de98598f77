use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::{env, fmt::Display, str::FromStr};
use tracing::{info, warn};

pub static CONFIG: Lazy<Config> = Lazy::new(Config::load);

pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub cors_origin: String,
    pub db_max_connections: u32,
    pub max_body_bytes: usize,
    pub reset_token_ttl_minutes: i64,
    pub photo: PhotoLimits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoLimits {
    pub max_width: u32,
    pub max_height: u32,
    pub jpeg_quality: u8,
}

impl Default for PhotoLimits {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 600,
            jpeg_quality: 80,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        load_env();

        Self {
            bind_addr: try_load("BIND_ADDR", "0.0.0.0"),
            port: try_load("PORT", "5555"),
            cors_origin: try_load("CORS_ORIGIN", "http://localhost:3000"),
            db_max_connections: try_load("DB_MAX_CONNECTIONS", "5"),
            max_body_bytes: try_load("MAX_BODY_BYTES", "16777216"),
            reset_token_ttl_minutes: try_load("RESET_TOKEN_TTL_MINUTES", "60"),
            photo: PhotoLimits {
                max_width: try_load("PHOTO_MAX_WIDTH", "800"),
                max_height: try_load("PHOTO_MAX_HEIGHT", "600"),
                jpeg_quality: try_load("PHOTO_JPEG_QUALITY", "80"),
            },
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

pub fn load_env() {
    if dotenv().is_ok() {
        info!("Loaded .env file");
    }
}

pub fn get_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("Missing env var: {key}"))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    parse_or(key, env::var(key).ok(), default)
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: &str) -> T
where
    T::Err: Display,
{
    let raw = value.unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    match raw.trim().parse() {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
                .parse()
                .unwrap_or_else(|_| panic!("Default for {key} must parse"))
        }
    }
}
