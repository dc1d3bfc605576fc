//! Lenient numeric conversion of controller-supplied decimal strings
//!
//! APIC reports every numeric attribute as a string. Malformed or absent values
//! become `0.0`; out-of-range health scores pass through unclamped.

use serde_json::Value;

use super::json_path;

/// Parse a decimal string, `0.0` when it does not parse
pub fn to_float(raw: &str) -> f64 {
    raw.parse::<f64>().unwrap_or(0.0)
}

/// Convert a 0-100 health score into a 0.0-1.0 ratio
pub fn to_ratio(raw: &str) -> f64 {
    to_float(raw) / 100.0
}

/// `to_float` of the attribute at `path`, absent attributes count as `0.0`
pub fn float_at(record: &Value, path: &str) -> f64 {
    json_path::lookup_str(record, path)
        .map(|raw| to_float(&raw))
        .unwrap_or(0.0)
}

/// `to_ratio` of the attribute at `path`, absent attributes count as `0.0`
pub fn ratio_at(record: &Value, path: &str) -> f64 {
    json_path::lookup_str(record, path)
        .map(|raw| to_ratio(&raw))
        .unwrap_or(0.0)
}
