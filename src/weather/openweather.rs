use super::types::CurrentWeatherResponse;
use crate::config::Config;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("no weather data found for city: {city}, country: {country}")]
    NoData { city: String, country: String },
}

pub struct OpenWeatherClient {
    client: Client,
    config: Config,
}

impl OpenWeatherClient {
    pub fn new(config: Config) -> Self {
        let client = Client::builder()
            .user_agent("WeatherApiServer/1.0")
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Fetches the current weather description for a city/country pair.
    ///
    /// One GET, no retries; the client timeout bounds how long a request may
    /// hang. The caller's API key doubles as the OpenWeatherMap credential.
    pub async fn current_weather(
        &self,
        city: &str,
        country: &str,
        api_key: &str,
    ) -> Result<String, UpstreamError> {
        let url = format!(
            "{}{}",
            self.config.openweather_base_url, self.config.openweather_weather_path
        );
        let location = format!("{},{}", city, country);

        let response = self
            .client
            .get(&url)
            .query(&[("q", location.as_str()), ("appid", api_key)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: CurrentWeatherResponse = response.json().await?;
        match body.weather.first() {
            Some(condition) => Ok(condition.description.clone()),
            None => Err(UpstreamError::NoData {
                city: city.to_string(),
                country: country.to_string(),
            }),
        }
    }
}
