mod api;
mod auth;
mod badges;
mod config;
mod db;
mod error;
mod models;
mod photos;
mod seed;
mod stats;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
};
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::CONFIG;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Run the HTTP API (the default)
    Serve,
    /// Wipe the database and load demo data
    Seed,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    config::load_env();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("still_strava=info,tower_http=info")),
        )
        .init();

    let pool = match db::connect_pool() {
        Ok(pool) => pool,
        Err(e) => {
            error!("Invalid DATABASE_URL: {e}");
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Seed => {
            if let Err(e) = seed::run(&pool).await {
                error!("Seeding failed: {e}");
                std::process::exit(1);
            }
        }
        Command::Serve => serve(pool).await,
    }
}

async fn serve(pool: PgPool) {
    if let Err(e) = db::init_db(&pool).await {
        error!("Database migration failed: {e}");
        std::process::exit(1);
    }

    let origin = match CONFIG.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(e) => {
            error!("Invalid CORS_ORIGIN {:?}: {e}", CONFIG.cors_origin);
            std::process::exit(1);
        }
    };

    // Exact origin, since credentials are allowed
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    let app = api::router(pool)
        .layer(DefaultBodyLimit::max(CONFIG.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = CONFIG.listen_addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!("Server running at http://{addr}");

    if let Err(e) = axum::serve(listener, app.into_make_service()).await {
        error!("Server error: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["still-strava"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn subcommands_are_parsed() {
        let seed = Cli::try_parse_from(["still-strava", "seed"]).unwrap();
        assert_eq!(seed.command, Some(Command::Seed));

        let serve = Cli::try_parse_from(["still-strava", "serve"]).unwrap();
        assert_eq!(serve.command, Some(Command::Serve));
    }

    #[test]
    fn unknown_arguments_are_rejected() {
        let err = Cli::try_parse_from(["still-strava", "sed"]).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::InvalidSubcommand | ErrorKind::UnknownArgument
        ));

        let help = Cli::try_parse_from(["still-strava", "--help"]).unwrap_err();
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);
    }
}
