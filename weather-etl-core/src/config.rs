use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Provider API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Current-weather endpoint.
    #[serde(default = "default_api_url")]
    pub url: String,

    /// API key; may be left empty in the file and supplied via the
    /// `OPENWEATHER_API_KEY` environment variable instead.
    #[serde(default)]
    pub key: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Warehouse connection settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string; may be left empty in the file and
    /// supplied via the `DATABASE_URL` environment variable instead.
    #[serde(default)]
    pub url: String,
}

/// Raw-batch CSV snapshot settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_snapshot_path")]
    pub path: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { path: default_snapshot_path() }
    }
}

/// Top-level configuration loaded once per invocation.
///
/// Example TOML:
/// ```toml
/// cities = ["Chennai", "Mumbai", "Delhi"]
///
/// [api]
/// key = "..."
///
/// [database]
/// url = "postgres://etl@localhost/weather"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct EtlConfig {
    /// Cities fetched each run, in this order.
    pub cities: Vec<String>,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

impl EtlConfig {
    /// Load configuration from a TOML file, then overlay the secret-bearing
    /// environment variables.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut cfg: EtlConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.merge_env(env::var("OPENWEATHER_API_KEY").ok(), env::var("DATABASE_URL").ok());

        Ok(cfg)
    }

    /// Environment variables win over file values; empty variables are
    /// treated as unset.
    fn merge_env(&mut self, api_key: Option<String>, database_url: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            self.api.key = key;
        }

        if let Some(url) = database_url.filter(|u| !u.is_empty()) {
            self.database.url = url;
        }
    }
}

fn default_api_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("city_weather_snapshot.csv")
}
