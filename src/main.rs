#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod config;
mod cors;
mod db;
mod env;
mod error;
mod models;
mod telemetry;
mod validation;
#[cfg(test)]
mod test;

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use api::{
    api_all_questions, api_delete_tags, api_get_tags, api_insert_question, api_insert_submission,
    api_login, api_logout, api_questions_count, api_signup, api_submissions_by_slug,
    api_submissions_for_day, api_submissions_page, api_upsert_tags, api_validate, health,
    preflight,
};
use auth::{
    bad_request, default_catcher, internal_error, not_found, unauthorized_api, unprocessable,
    AuthService,
};
use config::{AppConfig, ConfigError};
use cors::CorsFairing;
use once_cell::sync::Lazy;
use rocket::{Build, Rocket};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use telemetry::{init_tracing, OtelGuard, TelemetryFairing, TelemetryShutdown};
use thiserror::Error;
use tracing::{error, info};

pub static TELEMETRY_GUARD: Lazy<Mutex<Option<OtelGuard>>> = Lazy::new(|| Mutex::new(None));

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Environment error: {0}")]
    Env(#[from] dotenvy::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Server error: {0}")]
    Rocket(#[from] rocket::Error),
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    let env_files = env::load_environment()?;
    let config = AppConfig::load()?;

    init_tracing(&config)?;
    env_files.iter().for_each(env::EnvFile::log);

    let pool = connect(&config.database_url).await?;

    info!("Running database migrations...");
    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed successfully");

    let _rocket = init_rocket(pool, config).await.launch().await?;

    Ok(())
}

async fn connect(database_url: &str) -> Result<Pool<Sqlite>, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

pub async fn init_rocket(pool: Pool<Sqlite>, config: AppConfig) -> Rocket<Build> {
    info!("Starting reviser");

    let auth = AuthService::new(Arc::new(pool.clone()), &config);
    let cors = CorsFairing::new(config.allowed_origins.clone());

    rocket::build()
        .manage(pool)
        .manage(auth)
        .manage(config)
        .mount("/", routes![health, preflight])
        .mount(
            "/auth",
            routes![api_signup, api_login, api_validate, api_logout],
        )
        .mount(
            "/api/content",
            routes![
                api_questions_count,
                api_all_questions,
                api_submissions_by_slug,
                api_submissions_for_day,
                api_submissions_page,
                api_get_tags,
                api_upsert_tags,
                api_delete_tags,
            ],
        )
        .mount(
            "/api/cron",
            routes![api_insert_question, api_insert_submission],
        )
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized_api,
                not_found,
                unprocessable,
                internal_error,
                default_catcher
            ],
        )
        .attach(TelemetryFairing)
        .attach(cors)
        .attach(TelemetryShutdown)
}
