use anyhow::{Context, Result, anyhow};
use sqlx::{Connection, PgConnection, Postgres, Transaction};
use tracing::{error, info, warn};

use crate::config::DatabaseConfig;
use crate::model::EnrichedObservation;

const CREATE_CITY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS city (
    city_id   SERIAL PRIMARY KEY,
    city      TEXT NOT NULL UNIQUE,
    latitude  DOUBLE PRECISION,
    longitude DOUBLE PRECISION
)
"#;

const CREATE_FACT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS weather_fact (
    fact_id                SERIAL PRIMARY KEY,
    city_id                INTEGER NOT NULL REFERENCES city (city_id),
    temperature            DOUBLE PRECISION,
    feels_like             DOUBLE PRECISION,
    "min_Temp"             DOUBLE PRECISION,
    "max_Temp"             DOUBLE PRECISION,
    humidity               DOUBLE PRECISION,
    pressure               DOUBLE PRECISION,
    wind_speed             DOUBLE PRECISION,
    visibility             DOUBLE PRECISION,
    temp_range             DOUBLE PRECISION,
    temp_deviation         DOUBLE PRECISION,
    altitude_pressure_diff DOUBLE PRECISION,
    humidity_category      TEXT,
    temperature_category   TEXT,
    pressure_category      TEXT
)
"#;

const UPSERT_CITY: &str = "
INSERT INTO city (city, latitude, longitude)
VALUES ($1, $2, $3)
ON CONFLICT (city) DO NOTHING
";

const SELECT_CITY_ID: &str = "SELECT city_id FROM city WHERE city = $1";

const INSERT_FACT: &str = r#"
INSERT INTO weather_fact (
    city_id, temperature, feels_like, "min_Temp", "max_Temp", humidity,
    pressure, wind_speed, visibility, temp_range, temp_deviation,
    altitude_pressure_diff, humidity_category, temperature_category,
    pressure_category
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
"#;

/// What a committed load did: facts written, plus rows skipped because
/// their city never resolved to a dimension key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub facts_inserted: usize,
    pub facts_skipped: usize,
}

/// Writes enriched batches into the star schema. Each call opens one
/// connection, upserts the city dimension and appends the facts inside a
/// single transaction: either every fact of the batch commits or none do.
#[derive(Debug, Clone)]
pub struct Loader {
    database_url: String,
}

impl Loader {
    pub fn new(database: &DatabaseConfig) -> Self {
        Self { database_url: database.url.clone() }
    }

    pub async fn load(&self, batch: &[EnrichedObservation]) -> Result<LoadSummary> {
        if self.database_url.is_empty() {
            return Err(anyhow!(
                "No warehouse configured.\n\
                 Hint: set `url` under [database] in the config file, or export DATABASE_URL."
            ));
        }

        let mut conn = PgConnection::connect(&self.database_url)
            .await
            .context("Failed to connect to the warehouse; nothing was written")?;

        ensure_schema(&mut conn).await?;

        let mut tx = conn.begin().await.context("Failed to open the load transaction")?;

        let summary = match insert_batch(&mut tx, batch).await {
            Ok(summary) => summary,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!("rollback after a failed load also failed: {rollback_err}");
                }
                return Err(err.context("Load failed; the batch was rolled back"));
            }
        };

        tx.commit().await.context("Failed to commit the load transaction")?;

        info!(
            "loaded {} weather facts ({} skipped) for a batch of {}",
            summary.facts_inserted,
            summary.facts_skipped,
            batch.len()
        );

        Ok(summary)
    }
}

/// Create the star schema when it does not exist yet. Safe to run on
/// every invocation.
async fn ensure_schema(conn: &mut PgConnection) -> Result<()> {
    sqlx::query(CREATE_CITY_TABLE)
        .execute(&mut *conn)
        .await
        .context("Failed to create the city dimension table")?;

    sqlx::query(CREATE_FACT_TABLE)
        .execute(&mut *conn)
        .await
        .context("Failed to create the weather fact table")?;

    Ok(())
}

async fn insert_batch(
    tx: &mut Transaction<'_, Postgres>,
    batch: &[EnrichedObservation],
) -> Result<LoadSummary> {
    // Dimension pass first, so facts later in the batch can resolve
    // cities introduced earlier in the same batch.
    for row in batch {
        sqlx::query(UPSERT_CITY)
            .bind(&row.city)
            .bind(row.latitude)
            .bind(row.longitude)
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to upsert the city dimension for {}", row.city))?;
    }

    let mut summary = LoadSummary::default();

    for row in batch {
        let city_id: Option<i32> = sqlx::query_scalar(SELECT_CITY_ID)
            .bind(&row.city)
            .fetch_optional(&mut **tx)
            .await
            .with_context(|| format!("Failed to resolve the dimension key for {}", row.city))?;

        let Some(city_id) = city_id else {
            warn!("no city dimension row for {}; skipping its fact", row.city);
            summary.facts_skipped += 1;
            continue;
        };

        sqlx::query(INSERT_FACT)
            .bind(city_id)
            .bind(row.temperature)
            .bind(row.feels_like)
            .bind(row.min_temp)
            .bind(row.max_temp)
            .bind(row.humidity)
            .bind(row.pressure)
            .bind(row.wind_speed)
            .bind(row.visibility)
            .bind(row.temp_range)
            .bind(row.temp_deviation)
            .bind(row.altitude_pressure_diff)
            .bind(row.humidity_category.map(|c| c.as_str()))
            .bind(row.temperature_category.map(|c| c.as_str()))
            .bind(row.pressure_category.map(|c| c.as_str()))
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to insert the weather fact for {}", row.city))?;

        summary.facts_inserted += 1;
    }

    Ok(summary)
}
