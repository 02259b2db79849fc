use serde::{Deserialize, Serialize};
use std::env;

// Placeholder keys for local development only. Override with SEED_API_KEYS in
// any real deployment.
const DEFAULT_SEED_KEYS: &str = "b2180c8ac8633b32549bb10ac4ca7730,\
e7dd890a480d1e9547cd9d92b2f803c7,\
5ceca6dbfe14418a07e12fc76ec7d1bb,\
147854e652b5b992ec688497963df829,\
bc6faa4243d1bf3acef6c4f5cd862c1f";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub openweather_base_url: String,
    pub openweather_weather_path: String,
    pub upstream_timeout_secs: u64,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
    pub seed_api_keys: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            openweather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
            openweather_weather_path: env::var("OPENWEATHER_WEATHER_PATH")
                .unwrap_or_else(|_| "/data/2.5/weather".to_string()),
            upstream_timeout_secs: env::var("UPSTREAM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("UPSTREAM_TIMEOUT_SECS must be an integer"))?,
            rate_limit_max_requests: env::var("RATE_LIMIT_MAX_REQUESTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_MAX_REQUESTS must be an integer"))?,
            rate_limit_window_secs: env::var("RATE_LIMIT_WINDOW_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_WINDOW_SECS must be an integer"))?,
            seed_api_keys: env::var("SEED_API_KEYS")
                .unwrap_or_else(|_| DEFAULT_SEED_KEYS.to_string())
                .split(',')
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
                .collect(),
        })
    }
}
