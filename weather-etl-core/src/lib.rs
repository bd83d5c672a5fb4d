//! Core library for the city weather ETL.
//!
//! This crate defines:
//! - Configuration handling (city list, provider API, warehouse)
//! - The extract stage: provider client and flat observation records
//! - The transform stage: cleaning, scale conversion, derived features
//! - The load stage: dimension upserts and fact appends in one transaction
//!
//! It is used by `weather-etl-cli`, but can also be driven by any other
//! scheduler that moves batches between the stages.

pub mod config;
pub mod fetch;
pub mod load;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod transform;
pub mod units;

pub use config::{ApiConfig, DatabaseConfig, EtlConfig, SnapshotConfig};
pub use fetch::Fetcher;
pub use load::{LoadSummary, Loader};
pub use model::{
    EnrichedObservation, HumidityCategory, PressureCategory, RawObservation, TemperatureCategory,
};
pub use pipeline::EtlPipeline;
pub use provider::{CurrentWeather, FetchError, WeatherProvider};
