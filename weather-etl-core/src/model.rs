use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One flat record per successfully fetched city, in capture order.
///
/// Numeric fields are `None` when the provider omitted them or sent
/// something non-numeric. `wind_speed` is already in km/h; everything
/// else keeps the provider's metric scales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub city: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    /// Air temperature in °C.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature: Option<f64>,
    /// Apparent temperature in °C.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub feels_like: Option<f64>,
    #[serde(rename = "minTemp", default, deserialize_with = "lenient_f64")]
    pub min_temp: Option<f64>,
    #[serde(rename = "maxTemp", default, deserialize_with = "lenient_f64")]
    pub max_temp: Option<f64>,
    /// Station pressure in hPa.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pressure: Option<f64>,
    /// Relative humidity in percent.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub humidity: Option<f64>,
    /// Visibility in metres.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub visibility: Option<f64>,
    /// Wind speed in km/h, converted at capture time.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub wind_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub wind_deg: Option<f64>,
    /// Sea-level pressure in hPa.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sea_level: Option<f64>,
    /// Ground-level pressure in hPa.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub grnd_level: Option<f64>,
    /// Capture time, not the provider's observation time.
    pub time_stamp: DateTime<Utc>,
    pub data_source: String,
}

impl RawObservation {
    // The two accessors below expose the numeric columns in declaration
    // order and must stay in sync with each other.
    pub(crate) fn numeric_values(&self) -> [Option<f64>; 13] {
        [
            self.latitude,
            self.longitude,
            self.temperature,
            self.feels_like,
            self.min_temp,
            self.max_temp,
            self.pressure,
            self.humidity,
            self.visibility,
            self.wind_speed,
            self.wind_deg,
            self.sea_level,
            self.grnd_level,
        ]
    }

    pub(crate) fn numeric_fields_mut(&mut self) -> [&mut Option<f64>; 13] {
        [
            &mut self.latitude,
            &mut self.longitude,
            &mut self.temperature,
            &mut self.feels_like,
            &mut self.min_temp,
            &mut self.max_temp,
            &mut self.pressure,
            &mut self.humidity,
            &mut self.visibility,
            &mut self.wind_speed,
            &mut self.wind_deg,
            &mut self.sea_level,
            &mut self.grnd_level,
        ]
    }
}

/// A cleaned and feature-complete record, ready for the warehouse.
///
/// `temperature`, `min_temp` and `max_temp` are in °F, `pressure` in
/// atmospheres. `feels_like` stays in °C, so `temp_deviation` spans both
/// temperature scales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedObservation {
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Air temperature in °F.
    pub temperature: Option<f64>,
    /// Apparent temperature, still in °C.
    pub feels_like: Option<f64>,
    #[serde(rename = "min_Temp")]
    pub min_temp: Option<f64>,
    #[serde(rename = "max_Temp")]
    pub max_temp: Option<f64>,
    /// Station pressure in atmospheres.
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub visibility: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_deg: Option<f64>,
    pub sea_level: Option<f64>,
    pub grnd_level: Option<f64>,
    pub time_stamp: DateTime<Utc>,
    pub data_source: String,
    /// max_temp - min_temp, in °F.
    pub temp_range: Option<f64>,
    pub humidity_category: Option<HumidityCategory>,
    /// temperature (°F) minus feels_like (°C).
    pub temp_deviation: Option<f64>,
    /// sea_level - grnd_level, in hPa.
    pub altitude_pressure_diff: Option<f64>,
    pub temperature_category: Option<TemperatureCategory>,
    pub pressure_category: Option<PressureCategory>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HumidityCategory {
    Dry,
    Moderate,
    Humid,
}

impl HumidityCategory {
    /// Bucket a relative humidity percentage: below 50 is Dry, 50 to 80
    /// inclusive is Moderate, above 80 is Humid.
    pub fn classify(humidity_pct: f64) -> Self {
        if humidity_pct > 80.0 {
            HumidityCategory::Humid
        } else if humidity_pct >= 50.0 {
            HumidityCategory::Moderate
        } else {
            HumidityCategory::Dry
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HumidityCategory::Dry => "Dry",
            HumidityCategory::Moderate => "Moderate",
            HumidityCategory::Humid => "Humid",
        }
    }
}

impl fmt::Display for HumidityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureCategory {
    Cold,
    Moderate,
    Hot,
}

impl TemperatureCategory {
    /// Bucket a temperature in °F: below 68 is Cold, 68 up to but not
    /// including 86 is Moderate, 86 and above is Hot.
    pub fn classify(fahrenheit: f64) -> Self {
        if fahrenheit < 68.0 {
            TemperatureCategory::Cold
        } else if fahrenheit < 86.0 {
            TemperatureCategory::Moderate
        } else {
            TemperatureCategory::Hot
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureCategory::Cold => "Cold",
            TemperatureCategory::Moderate => "Moderate",
            TemperatureCategory::Hot => "Hot",
        }
    }
}

impl fmt::Display for TemperatureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressureCategory {
    Low,
    Normal,
    High,
}

impl PressureCategory {
    /// Bucket a pressure in atmospheres: below 0.98 is Low, 0.98 to 1.02
    /// inclusive is Normal, above 1.02 is High.
    pub fn classify(atm: f64) -> Self {
        if atm < 0.98 {
            PressureCategory::Low
        } else if atm <= 1.02 {
            PressureCategory::Normal
        } else {
            PressureCategory::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PressureCategory::Low => "Low",
            PressureCategory::Normal => "Normal",
            PressureCategory::High => "High",
        }
    }
}

impl fmt::Display for PressureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts JSON numbers, numeric strings and nulls. Anything non-numeric
/// becomes `None` instead of failing the whole record.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientF64Visitor;

    impl<'de> Visitor<'de> for LenientF64Visitor {
        type Value = Option<f64>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number, a numeric string, or null")
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value as f64))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value as f64))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.trim().parse::<f64>().ok())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(LenientF64Visitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn capture_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn humidity_buckets() {
        assert_eq!(HumidityCategory::classify(49.99), HumidityCategory::Dry);
        assert_eq!(HumidityCategory::classify(50.0), HumidityCategory::Moderate);
        assert_eq!(HumidityCategory::classify(80.0), HumidityCategory::Moderate);
        assert_eq!(HumidityCategory::classify(80.01), HumidityCategory::Humid);
    }

    #[test]
    fn temperature_buckets() {
        assert_eq!(TemperatureCategory::classify(67.99), TemperatureCategory::Cold);
        assert_eq!(TemperatureCategory::classify(68.0), TemperatureCategory::Moderate);
        assert_eq!(TemperatureCategory::classify(85.99), TemperatureCategory::Moderate);
        assert_eq!(TemperatureCategory::classify(86.0), TemperatureCategory::Hot);
    }

    #[test]
    fn pressure_buckets() {
        assert_eq!(PressureCategory::classify(0.979), PressureCategory::Low);
        assert_eq!(PressureCategory::classify(0.98), PressureCategory::Normal);
        assert_eq!(PressureCategory::classify(1.02), PressureCategory::Normal);
        assert_eq!(PressureCategory::classify(1.021), PressureCategory::High);
    }

    #[test]
    fn category_labels() {
        assert_eq!(HumidityCategory::Humid.as_str(), "Humid");
        assert_eq!(TemperatureCategory::Cold.to_string(), "Cold");
        assert_eq!(PressureCategory::Normal.as_str(), "Normal");
    }

    #[test]
    fn lenient_numerics_coerce_or_go_missing() {
        let json = r#"{
            "city": "Chennai",
            "latitude": 13.08,
            "longitude": "80.27",
            "temperature": 31,
            "feels_like": null,
            "minTemp": "not a number",
            "pressure": " 1008.5 ",
            "time_stamp": "2024-05-01T12:00:00Z",
            "data_source": "OpenWeatherMap"
        }"#;

        let row: RawObservation = serde_json::from_str(json).unwrap();

        assert_eq!(row.latitude, Some(13.08));
        assert_eq!(row.longitude, Some(80.27));
        assert_eq!(row.temperature, Some(31.0));
        assert_eq!(row.feels_like, None);
        assert_eq!(row.min_temp, None);
        assert_eq!(row.max_temp, None, "absent key is missing");
        assert_eq!(row.pressure, Some(1008.5));
    }

    #[test]
    fn wire_names_keep_the_camel_case_bounds() {
        let row = RawObservation {
            city: "Chennai".to_string(),
            latitude: None,
            longitude: None,
            temperature: None,
            feels_like: None,
            min_temp: Some(24.0),
            max_temp: Some(33.0),
            pressure: None,
            humidity: None,
            visibility: None,
            wind_speed: None,
            wind_deg: None,
            sea_level: None,
            grnd_level: None,
            time_stamp: capture_time(),
            data_source: "OpenWeatherMap".to_string(),
        };

        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains(r#""minTemp":24.0"#));
        assert!(json.contains(r#""maxTemp":33.0"#));

        let back: RawObservation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn enriched_wire_names_and_category_labels() {
        let row = EnrichedObservation {
            city: "Chennai".to_string(),
            latitude: None,
            longitude: None,
            temperature: Some(87.8),
            feels_like: Some(34.0),
            min_temp: Some(75.2),
            max_temp: Some(91.4),
            pressure: Some(0.99),
            humidity: Some(84.0),
            visibility: None,
            wind_speed: None,
            wind_deg: None,
            sea_level: None,
            grnd_level: None,
            time_stamp: capture_time(),
            data_source: "OpenWeatherMap".to_string(),
            temp_range: Some(16.2),
            humidity_category: Some(HumidityCategory::Humid),
            temp_deviation: Some(53.8),
            altitude_pressure_diff: None,
            temperature_category: Some(TemperatureCategory::Hot),
            pressure_category: Some(PressureCategory::Normal),
        };

        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains(r#""min_Temp":75.2"#));
        assert!(json.contains(r#""max_Temp":91.4"#));
        assert!(json.contains(r#""humidity_category":"Humid""#));
        assert!(json.contains(r#""pressure_category":"Normal""#));

        let back: EnrichedObservation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }
}
