//! Pure batch enrichment: no I/O, no clock, same input means same output.
//!
//! The steps run in a fixed order because later ones read what earlier
//! ones wrote: round every numeric column to two decimals, forward-fill
//! missing values from the previous row, then convert scales and derive
//! the feature columns from the filled values.

use crate::model::{
    EnrichedObservation, HumidityCategory, PressureCategory, RawObservation, TemperatureCategory,
};
use crate::units::{celsius_to_fahrenheit, hpa_to_atm, round2};

/// Turn a raw batch into warehouse-ready rows. Row order is preserved;
/// values that are still missing after forward-fill stay missing, and
/// their derived columns stay missing with them.
pub fn transform(batch: Vec<RawObservation>) -> Vec<EnrichedObservation> {
    let mut rows = batch;
    round_columns(&mut rows);
    forward_fill(&mut rows);
    rows.into_iter().map(enrich).collect()
}

fn round_columns(batch: &mut [RawObservation]) {
    for row in batch {
        for field in row.numeric_fields_mut() {
            if let Some(value) = field {
                *value = round2(*value);
            }
        }
    }
}

/// Fill each missing numeric value with the value from the row above.
/// The fill runs over the whole batch, so a leading missing value stays
/// missing and a fill can cross a city boundary.
fn forward_fill(batch: &mut [RawObservation]) {
    for i in 1..batch.len() {
        let previous = batch[i - 1].numeric_values();

        for (field, prev) in batch[i].numeric_fields_mut().into_iter().zip(previous) {
            if field.is_none() {
                *field = prev;
            }
        }
    }
}

fn enrich(row: RawObservation) -> EnrichedObservation {
    let temperature = row.temperature.map(celsius_to_fahrenheit);
    let min_temp = row.min_temp.map(celsius_to_fahrenheit);
    let max_temp = row.max_temp.map(celsius_to_fahrenheit);
    let pressure = row.pressure.map(hpa_to_atm);

    let temp_range = max_temp.zip(min_temp).map(|(max, min)| max - min);
    let humidity_category = row.humidity.map(HumidityCategory::classify);
    // feels_like stays in °C, so the deviation spans both scales.
    let temp_deviation = temperature.zip(row.feels_like).map(|(temp, feels)| temp - feels);
    let altitude_pressure_diff =
        row.sea_level.zip(row.grnd_level).map(|(sea, ground)| sea - ground);
    let temperature_category = temperature.map(TemperatureCategory::classify);
    let pressure_category = pressure.map(PressureCategory::classify);

    EnrichedObservation {
        city: row.city,
        latitude: row.latitude,
        longitude: row.longitude,
        temperature,
        feels_like: row.feels_like,
        min_temp,
        max_temp,
        pressure,
        humidity: row.humidity,
        visibility: row.visibility,
        wind_speed: row.wind_speed,
        wind_deg: row.wind_deg,
        sea_level: row.sea_level,
        grnd_level: row.grnd_level,
        time_stamp: row.time_stamp,
        data_source: row.data_source,
        temp_range,
        humidity_category,
        temp_deviation,
        altitude_pressure_diff,
        temperature_category,
        pressure_category,
    }
}
