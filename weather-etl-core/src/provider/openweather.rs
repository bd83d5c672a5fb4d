use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::ApiConfig;

use super::{CurrentWeather, FetchError, WeatherProvider};

/// OpenWeatherMap current-weather client. Requests metric units so the
/// normalization step only has to convert wind speed.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    url: String,
    api_key: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        if api.key.is_empty() {
            return Err(anyhow!(
                "No API key configured for the weather provider.\n\
                 Hint: set `key` under [api] in the config file, or export OPENWEATHER_API_KEY."
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .context("Failed to build the HTTP client")?;

        Ok(Self { url: api.url.clone(), api_key: api.key.clone(), http })
    }

    fn current_request(&self, city: &str) -> reqwest::RequestBuilder {
        self.http.get(&self.url).query(&[
            ("q", city),
            ("appid", self.api_key.as_str()),
            ("units", "metric"),
        ])
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_weather(&self, city: &str) -> Result<CurrentWeather, FetchError> {
        let res = self.current_request(city).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status { status, body: truncate_body(&body) });
        }

        Ok(serde_json::from_str(&body)?)
    }

    fn tag(&self) -> &'static str {
        "OpenWeatherMap"
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }

    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &body[..end])
}
