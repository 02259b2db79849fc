use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),
}

/// A cached weather report for one (city, country) pair.
///
/// Records are insert-only: the pipeline never updates or deletes them, and
/// `created_at` is informational, not an expiry.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeatherRecord {
    pub id: Uuid,
    pub city: String,
    pub country: String,
    pub description: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_tables(&self) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS weather_data (
                id TEXT PRIMARY KEY,
                city TEXT NOT NULL,
                country TEXT NOT NULL,
                description TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Non-unique on purpose: racing fetches for the same pair may both
        // insert, and duplicate rows are acceptable.
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_weather_city_country ON weather_data(city, country)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Case-sensitive lookup on the (city, country) pair exactly as supplied.
    pub async fn find_by_city_and_country(
        &self,
        city: &str,
        country: &str,
    ) -> Result<Option<WeatherRecord>, DatabaseError> {
        let result = sqlx::query_as::<_, WeatherRecord>(
            "SELECT * FROM weather_data WHERE city = $1 AND country = $2 LIMIT 1",
        )
        .bind(city)
        .bind(country)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    pub async fn insert_report(
        &self,
        city: &str,
        country: &str,
        description: &str,
    ) -> Result<WeatherRecord, DatabaseError> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        let result = sqlx::query_as::<_, WeatherRecord>(
            r#"
            INSERT INTO weather_data (id, city, country, description, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(city)
        .bind(country)
        .bind(description)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
