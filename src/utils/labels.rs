//! Label extraction from APIC records

use serde_json::Value;

use super::json_path;
use super::metric_family::Labels;

/// Build a label set from `(label name, path)` pairs
///
/// Paths are relative to `record`. A missing attribute becomes an empty label
/// value so the sample is kept and the family keeps a uniform label key set.
pub fn extract_labels(record: &Value, paths: &[(&str, &str)]) -> Labels {
    paths
        .iter()
        .map(|(name, path)| {
            let value = json_path::lookup_str(record, path).unwrap_or_default();
            (name.to_string(), value)
        })
        .collect()
}
