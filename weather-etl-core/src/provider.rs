use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt::Debug;
use thiserror::Error;

pub mod openweather;

/// Why a single city's fetch failed. One city failing never aborts a
/// batch; the fetcher records the failure and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS or timeout trouble before a full response arrived.
    #[error("request to the weather provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status code.
    #[error("weather provider returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// A body arrived but did not decode as a current-weather payload.
    #[error("could not decode the weather payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Current-weather payload: nested `coord`, `main` and `wind` objects.
/// Any reading, or a whole nested object, may be absent; absence never
/// fails the decode.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CurrentWeather {
    #[serde(default)]
    pub coord: Coord,
    #[serde(default)]
    pub main: MainReadings,
    #[serde(default)]
    pub wind: Wind,
    /// Visibility in metres.
    pub visibility: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Coord {
    pub lon: Option<f64>,
    pub lat: Option<f64>,
}

/// Main sensor block, all in metric scales (°C, hPa, percent).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MainReadings {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub sea_level: Option<f64>,
    pub grnd_level: Option<f64>,
}

/// Wind block; `speed` is in m/s on the wire.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Wind {
    pub speed: Option<f64>,
    pub deg: Option<f64>,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Fetch the current weather for one city by name.
    async fn current_weather(&self, city: &str) -> Result<CurrentWeather, FetchError>;

    /// Tag written into `data_source` on every observation this provider
    /// produces.
    fn tag(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_full_payload() {
        let body = r#"{
            "coord": {"lon": 80.2785, "lat": 13.0878},
            "weather": [{"id": 721, "main": "Haze", "description": "haze"}],
            "main": {
                "temp": 30.5,
                "feels_like": 37.5,
                "temp_min": 29.0,
                "temp_max": 31.2,
                "pressure": 1008,
                "humidity": 79,
                "sea_level": 1008,
                "grnd_level": 1007
            },
            "visibility": 6000,
            "wind": {"speed": 3.09, "deg": 180},
            "name": "Chennai"
        }"#;

        let payload: CurrentWeather = serde_json::from_str(body).expect("payload must decode");

        assert_eq!(payload.coord.lat, Some(13.0878));
        assert_eq!(payload.main.temp, Some(30.5));
        assert_eq!(payload.main.pressure, Some(1008.0));
        assert_eq!(payload.main.grnd_level, Some(1007.0));
        assert_eq!(payload.wind.speed, Some(3.09));
        assert_eq!(payload.visibility, Some(6000.0));
    }

    #[test]
    fn decodes_a_bare_payload_as_all_missing() {
        let payload: CurrentWeather = serde_json::from_str("{}").expect("payload must decode");

        assert_eq!(payload.coord.lat, None);
        assert_eq!(payload.main.temp, None);
        assert_eq!(payload.main.sea_level, None);
        assert_eq!(payload.wind.speed, None);
        assert_eq!(payload.visibility, None);
    }

    #[test]
    fn status_errors_carry_the_code() {
        let err = FetchError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: r#"{"cod":401,"message":"Invalid API key"}"#.to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("Invalid API key"));
    }
}
