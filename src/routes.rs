use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    keys::{ApiKeyStore, KeyAdminError},
    weather::service::{WeatherError, WeatherService},
};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub key_store: Arc<ApiKeyStore>,
    pub weather_service: Arc<WeatherService>,
}

// Request/Response types
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WeatherQuery {
    pub city: String,
    pub country: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ApiKeyQuery {
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherResponse {
    pub description: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database_healthy: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidationResponse {
    pub is_valid: bool,
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

// Route handlers

/// Weather lookup gated by key validation and the per-key quota.
#[utoipa::path(
    get,
    path = "/api/weather/getWeather",
    tag = "weather",
    params(WeatherQuery),
    responses(
        (status = 200, description = "Weather description", body = WeatherResponse),
        (status = 400, description = "Missing or blank parameter", body = ErrorResponse),
        (status = 403, description = "Invalid API key", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 503, description = "External weather service unavailable", body = ErrorResponse),
    )
)]
pub async fn get_weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherQuery>,
) -> Result<Json<WeatherResponse>, (StatusCode, Json<ErrorResponse>)> {
    if params.city.trim().is_empty()
        || params.country.trim().is_empty()
        || params.api_key.trim().is_empty()
    {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "city, country and apiKey are required",
        ));
    }

    match state
        .weather_service
        .get_weather(&params.city, &params.country, &params.api_key)
        .await
    {
        Ok(description) => Ok(Json(WeatherResponse { description })),
        Err(WeatherError::InvalidKey) => {
            Err(error_response(StatusCode::FORBIDDEN, "Invalid API key"))
        }
        Err(WeatherError::RateLimited) => Err(error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded",
        )),
        Err(WeatherError::Upstream(e)) => {
            tracing::error!("Upstream weather fetch failed: {}", e);
            Err(error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "External service unavailable",
            ))
        }
        Err(WeatherError::Database(e)) => {
            tracing::error!("Database error while serving weather request: {}", e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ))
        }
    }
}

/// Service liveness plus a database probe; the probe never fails the request.
#[utoipa::path(
    get,
    path = "/api/weather/health",
    tag = "weather",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_healthy = state.weather_service.is_database_healthy().await;
    Json(HealthResponse {
        status: "OK".to_string(),
        database_healthy,
    })
}

#[utoipa::path(
    post,
    path = "/api/key/add",
    tag = "keys",
    params(ApiKeyQuery),
    responses(
        (status = 201, description = "API key added", body = MessageResponse),
        (status = 400, description = "API key is blank", body = ErrorResponse),
        (status = 409, description = "API key already exists", body = ErrorResponse),
    )
)]
pub async fn add_api_key(
    State(state): State<AppState>,
    Query(params): Query<ApiKeyQuery>,
) -> Result<(StatusCode, Json<MessageResponse>), (StatusCode, Json<ErrorResponse>)> {
    match state.key_store.add(&params.api_key).await {
        Ok(()) => Ok((
            StatusCode::CREATED,
            Json(MessageResponse {
                message: "API key added successfully".to_string(),
            }),
        )),
        Err(KeyAdminError::InvalidInput) => Err(error_response(
            StatusCode::BAD_REQUEST,
            "API key cannot be empty",
        )),
        Err(KeyAdminError::AlreadyExists) => Err(error_response(
            StatusCode::CONFLICT,
            "API key already exists",
        )),
        Err(KeyAdminError::NotFound) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
        )),
    }
}

#[utoipa::path(
    delete,
    path = "/api/key/delete",
    tag = "keys",
    params(ApiKeyQuery),
    responses(
        (status = 200, description = "API key deleted", body = MessageResponse),
        (status = 400, description = "API key is blank", body = ErrorResponse),
        (status = 404, description = "API key does not exist", body = ErrorResponse),
    )
)]
pub async fn delete_api_key(
    State(state): State<AppState>,
    Query(params): Query<ApiKeyQuery>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    if params.api_key.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "API key cannot be empty",
        ));
    }

    match state.key_store.delete(&params.api_key).await {
        Ok(()) => Ok(Json(MessageResponse {
            message: "API key deleted successfully".to_string(),
        })),
        Err(_) => Err(error_response(
            StatusCode::NOT_FOUND,
            "API key does not exist",
        )),
    }
}

#[utoipa::path(
    get,
    path = "/api/key/list",
    tag = "keys",
    responses(
        (status = 200, description = "All valid API keys", body = Vec<String>),
    )
)]
pub async fn list_api_keys(State(state): State<AppState>) -> Json<HashSet<String>> {
    Json(state.key_store.list().await)
}

#[utoipa::path(
    post,
    path = "/api/key/validate",
    tag = "keys",
    params(ApiKeyQuery),
    responses(
        (status = 200, description = "Validation result", body = ValidationResponse),
    )
)]
pub async fn validate_api_key(
    State(state): State<AppState>,
    Query(params): Query<ApiKeyQuery>,
) -> Json<ValidationResponse> {
    let is_valid = state.key_store.is_valid(&params.api_key).await;
    Json(ValidationResponse { is_valid })
}

#[derive(OpenApi)]
#[openapi(
    paths(
        get_weather,
        health,
        add_api_key,
        delete_api_key,
        list_api_keys,
        validate_api_key
    ),
    components(schemas(
        WeatherResponse,
        HealthResponse,
        ErrorResponse,
        MessageResponse,
        ValidationResponse
    )),
    tags(
        (name = "weather", description = "Weather data and health checks"),
        (name = "keys", description = "API key management")
    )
)]
pub struct ApiDoc;

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/weather/getWeather", get(get_weather))
        .route("/api/weather/health", get(health))
        .route("/api/key/add", post(add_api_key))
        .route("/api/key/delete", delete(delete_api_key))
        .route("/api/key/list", get(list_api_keys))
        .route("/api/key/validate", post(validate_api_key))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::database::Database;
    use crate::rate_limit::RateLimiter;
    use crate::weather::openweather::OpenWeatherClient;
    use sqlx::sqlite::SqlitePoolOptions;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_KEY: &str = "b2180c8ac8633b32549bb10ac4ca7730";

    async fn spawn_app(upstream_url: &str) -> String {
        let config = Config {
            openweather_base_url: upstream_url.to_string(),
            openweather_weather_path: "/data/2.5/weather".to_string(),
            upstream_timeout_secs: 2,
            rate_limit_max_requests: 5,
            rate_limit_window_secs: 3600,
            seed_api_keys: vec![VALID_KEY.to_string()],
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let database = Arc::new(Database::new(pool));
        database.init_tables().await.unwrap();

        let key_store = Arc::new(ApiKeyStore::new(config.seed_api_keys.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_max_requests));
        let weather_service = Arc::new(WeatherService::new(
            database,
            key_store.clone(),
            rate_limiter,
            Arc::new(OpenWeatherClient::new(config)),
        ));

        let state = AppState {
            key_store,
            weather_service,
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    async fn mount_clear_sky(mock_server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"weather": [{"description": "clear sky"}]}),
            ))
            .mount(mock_server)
            .await;
    }

    #[tokio::test]
    async fn test_get_weather_end_to_end() {
        let mock_server = MockServer::start().await;
        mount_clear_sky(&mock_server).await;
        let base = spawn_app(&mock_server.uri()).await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!(
                "{}/api/weather/getWeather?city=Tokyo&country=JP&apiKey={}",
                base, VALID_KEY
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["description"], "clear sky");
    }

    #[tokio::test]
    async fn test_get_weather_rejects_invalid_key() {
        let mock_server = MockServer::start().await;
        let base = spawn_app(&mock_server.uri()).await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!(
                "{}/api/weather/getWeather?city=Tokyo&country=JP&apiKey=unknown",
                base
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 403);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Invalid API key");
    }

    #[tokio::test]
    async fn test_get_weather_rejects_blank_city() {
        let mock_server = MockServer::start().await;
        let base = spawn_app(&mock_server.uri()).await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!(
                "{}/api/weather/getWeather?city=%20&country=JP&apiKey={}",
                base, VALID_KEY
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_sixth_request_returns_429() {
        let mock_server = MockServer::start().await;
        mount_clear_sky(&mock_server).await;
        let base = spawn_app(&mock_server.uri()).await;
        let client = reqwest::Client::new();

        for _ in 0..5 {
            let response = client
                .get(format!(
                    "{}/api/weather/getWeather?city=Tokyo&country=JP&apiKey={}",
                    base, VALID_KEY
                ))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 200);
        }

        // Different city, same key: the quota is per key, and the cached
        // Tokyo record does not help.
        let response = client
            .get(format!(
                "{}/api/weather/getWeather?city=Osaka&country=JP&apiKey={}",
                base, VALID_KEY
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 429);
    }

    #[tokio::test]
    async fn test_upstream_failure_returns_503() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;
        let base = spawn_app(&mock_server.uri()).await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!(
                "{}/api/weather/getWeather?city=Tokyo&country=JP&apiKey={}",
                base, VALID_KEY
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 503);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let mock_server = MockServer::start().await;
        let base = spawn_app(&mock_server.uri()).await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!("{}/api/weather/health", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "OK");
        assert_eq!(body["database_healthy"], true);
    }

    #[tokio::test]
    async fn test_key_admin_lifecycle() {
        let mock_server = MockServer::start().await;
        let base = spawn_app(&mock_server.uri()).await;
        let client = reqwest::Client::new();

        // add
        let response = client
            .post(format!("{}/api/key/add?apiKey=new-key", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);

        // duplicate add
        let response = client
            .post(format!("{}/api/key/add?apiKey=new-key", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 409);

        // blank add
        let response = client
            .post(format!("{}/api/key/add?apiKey=%20", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);

        // validate
        let response = client
            .post(format!("{}/api/key/validate?apiKey=new-key", base))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["is_valid"], true);

        // list
        let response = client
            .get(format!("{}/api/key/list", base))
            .send()
            .await
            .unwrap();
        let keys: HashSet<String> = response.json().await.unwrap();
        assert!(keys.contains("new-key"));
        assert!(keys.contains(VALID_KEY));

        // delete
        let response = client
            .delete(format!("{}/api/key/delete?apiKey=new-key", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        // delete again
        let response = client
            .delete(format!("{}/api/key/delete?apiKey=new-key", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let mock_server = MockServer::start().await;
        let base = spawn_app(&mock_server.uri()).await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!("{}/api-docs/openapi.json", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["paths"]["/api/weather/getWeather"].is_object());
    }
}
