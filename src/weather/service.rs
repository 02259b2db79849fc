use super::openweather::{OpenWeatherClient, UpstreamError};
use crate::database::{Database, DatabaseError};
use crate::keys::ApiKeyStore;
use crate::rate_limit::RateLimiter;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Invalid API key")]
    InvalidKey,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Failed to fetch weather data: {0}")]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Orchestrates one weather request across the key store, the rate limiter,
/// the cache and the upstream client. Owns none of their state; only
/// sequences the calls.
pub struct WeatherService {
    database: Arc<Database>,
    key_store: Arc<ApiKeyStore>,
    rate_limiter: Arc<RateLimiter>,
    upstream: Arc<OpenWeatherClient>,
}

impl WeatherService {
    pub fn new(
        database: Arc<Database>,
        key_store: Arc<ApiKeyStore>,
        rate_limiter: Arc<RateLimiter>,
        upstream: Arc<OpenWeatherClient>,
    ) -> Self {
        Self {
            database,
            key_store,
            rate_limiter,
            upstream,
        }
    }

    /// Admission pipeline for one request, terminal at the first failure:
    /// key check, quota, then cache-aside retrieval. A failed key check
    /// consumes no quota; a rejected quota never reaches cache or upstream.
    pub async fn get_weather(
        &self,
        city: &str,
        country: &str,
        api_key: &str,
    ) -> Result<String, WeatherError> {
        if !self.key_store.is_valid(api_key).await {
            tracing::warn!("Invalid API key used: {}", api_key);
            return Err(WeatherError::InvalidKey);
        }

        self.rate_limiter
            .consume(api_key)
            .await
            .map_err(|_| WeatherError::RateLimited)?;

        self.get_or_fetch(city, country, api_key).await
    }

    /// Cache-aside: a stored record wins regardless of its age; only a miss
    /// goes upstream, and the fetched description is written back before it
    /// is returned.
    async fn get_or_fetch(
        &self,
        city: &str,
        country: &str,
        api_key: &str,
    ) -> Result<String, WeatherError> {
        if let Some(record) = self.database.find_by_city_and_country(city, country).await? {
            tracing::info!(
                "Returning cached weather data for city: {}, country: {}",
                city,
                country
            );
            return Ok(record.description);
        }

        tracing::info!(
            "No cached data found, fetching weather for city: {}, country: {}",
            city,
            country
        );
        let description = self.upstream.current_weather(city, country, api_key).await?;
        self.database
            .insert_report(city, country, &description)
            .await?;
        Ok(description)
    }

    /// Converts any persistence failure into `false` rather than propagating.
    pub async fn is_database_healthy(&self) -> bool {
        match self.database.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Database health check failed: {}", e);
                false
            }
        }
    }
}
