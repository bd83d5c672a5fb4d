//! Scale conversions and numeric cleaning helpers shared by the pipeline
//! stages. Wind speed changes scale at capture time; temperatures and
//! pressure change scale during enrichment.

/// Hectopascals per standard atmosphere.
pub const HPA_PER_ATM: f64 = 1013.25;

pub fn mps_to_kmh(mps: f64) -> f64 {
    mps * 3.6
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

pub fn hpa_to_atm(hpa: f64) -> f64 {
    hpa / HPA_PER_ATM
}

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
