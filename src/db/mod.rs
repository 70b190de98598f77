pub mod activities;
pub mod badges;
pub mod comments;
pub mod sessions;
pub mod social;
pub mod users;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::{get_env, CONFIG};

/// Builds the shared pool. Connections open on first use.
pub fn connect_pool() -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(CONFIG.db_max_connections)
        .connect_lazy(&get_env("DATABASE_URL"))
}

pub async fn init_db(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await
}

/// Escapes `LIKE` wildcards and wraps the term for a substring match.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
