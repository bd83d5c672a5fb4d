use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::model::RawObservation;
use crate::provider::{CurrentWeather, WeatherProvider};
use crate::units::{mps_to_kmh, round2};

/// Walks the configured city list in order and produces one flat
/// observation per city the provider answered for.
#[derive(Debug)]
pub struct Fetcher {
    provider: Box<dyn WeatherProvider>,
    cities: Vec<String>,
    snapshot_path: PathBuf,
}

impl Fetcher {
    pub fn new(
        provider: Box<dyn WeatherProvider>,
        cities: Vec<String>,
        snapshot_path: PathBuf,
    ) -> Self {
        Self { provider, cities, snapshot_path }
    }

    /// Fetch every configured city, one request at a time. A city that
    /// fails is logged and left out of the batch; the remaining cities
    /// are still fetched. The raw batch is written to the CSV snapshot
    /// before it is handed on.
    pub async fn extract(&self) -> Result<Vec<RawObservation>> {
        let mut batch = Vec::with_capacity(self.cities.len());

        for city in &self.cities {
            match self.provider.current_weather(city).await {
                Ok(payload) => {
                    batch.push(normalize(city, self.provider.tag(), payload, Utc::now()));
                }
                Err(err) => warn!("unable to fetch weather for {city}: {err}"),
            }
        }

        write_snapshot(&self.snapshot_path, &batch)?;

        info!(
            "extracted {} of {} cities (snapshot: {})",
            batch.len(),
            self.cities.len(),
            self.snapshot_path.display()
        );

        Ok(batch)
    }
}

/// Flatten a provider payload into an observation row. Wind speed changes
/// from m/s to km/h here, rounded to two decimals; every other reading
/// passes through on its provider scale.
pub fn normalize(
    city: &str,
    source: &str,
    payload: CurrentWeather,
    captured_at: DateTime<Utc>,
) -> RawObservation {
    RawObservation {
        city: city.to_string(),
        latitude: payload.coord.lat,
        longitude: payload.coord.lon,
        temperature: payload.main.temp,
        feels_like: payload.main.feels_like,
        min_temp: payload.main.temp_min,
        max_temp: payload.main.temp_max,
        pressure: payload.main.pressure,
        humidity: payload.main.humidity,
        visibility: payload.visibility,
        wind_speed: payload.wind.speed.map(|mps| round2(mps_to_kmh(mps))),
        wind_deg: payload.wind.deg,
        sea_level: payload.main.sea_level,
        grnd_level: payload.main.grnd_level,
        time_stamp: captured_at,
        data_source: source.to_string(),
    }
}

fn write_snapshot(path: &Path, batch: &[RawObservation]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create snapshot directory: {}", parent.display())
            })?;
        }
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create snapshot file: {}", path.display()))?;

    for row in batch {
        writer.serialize(row).context("Failed to write an observation to the snapshot")?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush snapshot file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Coord, MainReadings, Wind};
    use chrono::TimeZone;

    fn capture_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn chennai_payload() -> CurrentWeather {
        CurrentWeather {
            coord: Coord { lon: Some(80.2785), lat: Some(13.0878) },
            main: MainReadings {
                temp: Some(30.55),
                feels_like: Some(37.5),
                temp_min: Some(29.0),
                temp_max: Some(31.2),
                pressure: Some(1008.0),
                humidity: Some(79.0),
                sea_level: Some(1008.0),
                grnd_level: Some(1007.0),
            },
            wind: Wind { speed: Some(3.4), deg: Some(180.0) },
            visibility: Some(6000.0),
        }
    }

    #[test]
    fn normalization_converts_only_wind_speed() {
        let row = normalize("Chennai", "OpenWeatherMap", chennai_payload(), capture_time());

        assert_eq!(row.city, "Chennai");
        assert_eq!(row.latitude, Some(13.0878));
        assert_eq!(row.longitude, Some(80.2785));
        assert_eq!(row.temperature, Some(30.55), "temperature passes through unrounded");
        assert_eq!(row.wind_speed, Some(12.24), "3.4 m/s is 12.24 km/h");
        assert_eq!(row.min_temp, Some(29.0));
        assert_eq!(row.max_temp, Some(31.2));
        assert_eq!(row.time_stamp, capture_time());
        assert_eq!(row.data_source, "OpenWeatherMap");
    }

    #[test]
    fn absent_readings_stay_missing() {
        let row = normalize("Chennai", "OpenWeatherMap", CurrentWeather::default(), capture_time());

        assert_eq!(row.wind_speed, None);
        assert_eq!(row.temperature, None);
        assert_eq!(row.latitude, None);
        assert_eq!(row.visibility, None);
    }

    #[test]
    fn snapshot_has_wire_headers_and_one_line_per_row() {
        let dir = tempfile::tempdir().expect("tempdir must exist");
        let path = dir.path().join("snapshot.csv");

        let batch = vec![
            normalize("Chennai", "OpenWeatherMap", chennai_payload(), capture_time()),
            normalize("Delhi", "OpenWeatherMap", CurrentWeather::default(), capture_time()),
        ];

        write_snapshot(&path, &batch).expect("snapshot must write");

        let contents = fs::read_to_string(&path).expect("snapshot must read back");
        let mut lines = contents.lines();

        let header = lines.next().expect("snapshot must have a header");
        assert!(header.starts_with(
            "city,latitude,longitude,temperature,feels_like,minTemp,maxTemp,pressure"
        ));
        assert_eq!(lines.count(), 2);
    }
}
