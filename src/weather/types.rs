use serde::{Deserialize, Serialize};

/// Shape of the OpenWeatherMap current-weather response, reduced to the
/// fields this service reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeatherResponse {
    // A missing array is treated the same as an empty one.
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub description: String,
}
