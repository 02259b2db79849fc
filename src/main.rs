use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod database;
mod keys;
mod rate_limit;
mod routes;
mod weather;

use config::Config;
use database::Database;
use keys::ApiKeyStore;
use rate_limit::RateLimiter;
use routes::{create_router, AppState};
use weather::openweather::OpenWeatherClient;
use weather::service::WeatherService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_api_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:./weather_api.db?mode=rwc".to_string());
    let pool = sqlx::SqlitePool::connect(&database_url).await?;
    let database = Arc::new(Database::new(pool));
    database.init_tables().await?;

    // Admission-control components
    let key_store = Arc::new(ApiKeyStore::new(config.seed_api_keys.clone()));
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_max_requests));
    let _reset_task = rate_limit::spawn_reset_task(
        rate_limiter.clone(),
        Duration::from_secs(config.rate_limit_window_secs),
    );

    // Upstream client and request pipeline
    let upstream = Arc::new(OpenWeatherClient::new(config.clone()));
    let weather_service = Arc::new(WeatherService::new(
        database,
        key_store.clone(),
        rate_limiter,
        upstream,
    ));

    // Create application state
    let state = AppState {
        key_store,
        weather_service,
    };

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("Server starting on http://0.0.0.0:8080");

    axum::serve(listener, app).await?;

    Ok(())
}
