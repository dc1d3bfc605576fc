//! Uniform metric model shared by the domain extractors and the exposition layer
//!
//! Every extractor hands back complete `MetricFamily` values: a descriptor
//! plus the ordered samples observed during one collection pass.

use std::collections::BTreeMap;
use std::fmt;

/// Label set of a single sample
///
/// A `BTreeMap` keeps label order stable so the rendered output is reproducible.
pub type Labels = BTreeMap<String, String>;

/// Kind of a metric family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Gauge,
    Counter,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static metadata for a metric family
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    /// Stable identifier without prefix or unit suffix (e.g. `node_health`)
    pub name: &'static str,
    /// Human readable description
    pub help: &'static str,
    pub metric_type: MetricType,
    /// Unit name, empty when the metric is unitless (e.g. `ratio`, `seconds`, `info`)
    pub unit: &'static str,
}

impl MetricDescriptor {
    pub const fn gauge(name: &'static str, help: &'static str, unit: &'static str) -> Self {
        MetricDescriptor {
            name,
            help,
            metric_type: MetricType::Gauge,
            unit,
        }
    }

    pub const fn counter(name: &'static str, help: &'static str, unit: &'static str) -> Self {
        MetricDescriptor {
            name,
            help,
            metric_type: MetricType::Counter,
            unit,
        }
    }
}

/// One observation within a metric family
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub labels: Labels,
    pub value: f64,
}

impl Sample {
    /// Sample with an empty label set
    pub fn unlabeled(value: f64) -> Self {
        Sample {
            labels: Labels::new(),
            value,
        }
    }

    pub fn new(labels: Labels, value: f64) -> Self {
        Sample { labels, value }
    }
}

/// Descriptor plus ordered samples
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub descriptor: MetricDescriptor,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    pub fn new(descriptor: MetricDescriptor, samples: Vec<Sample>) -> Self {
        MetricFamily {
            descriptor,
            samples,
        }
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    /// Whether every sample carries exactly the same label keys
    ///
    /// Exposition backends reject families with mixed label sets.
    pub fn has_uniform_label_keys(&self) -> bool {
        let mut samples = self.samples.iter();
        let Some(first) = samples.next() else {
            return true;
        };
        samples.all(|sample| sample.labels.keys().eq(first.labels.keys()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_DESCRIPTOR: MetricDescriptor =
        MetricDescriptor::gauge("test_metric", "Test metric", "ratio");

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_metric_type_strings() {
        assert_eq!(MetricType::Gauge.as_str(), "gauge");
        assert_eq!(MetricType::Counter.to_string(), "counter");
    }

    #[test]
    fn test_descriptor_constructors() {
        let counter = MetricDescriptor::counter("infra_node", "Info", "info");
        assert_eq!(counter.metric_type, MetricType::Counter);
        assert_eq!(counter.unit, "info");
        assert_eq!(TEST_DESCRIPTOR.metric_type, MetricType::Gauge);
    }

    #[test]
    fn test_uniform_label_keys() {
        let family = MetricFamily::new(
            TEST_DESCRIPTOR,
            vec![
                Sample::new(labels(&[("podid", "1")]), 0.9),
                Sample::new(labels(&[("podid", "2")]), 1.0),
            ],
        );
        assert!(family.has_uniform_label_keys());
    }

    #[test]
    fn test_mixed_label_keys_detected() {
        let family = MetricFamily::new(
            TEST_DESCRIPTOR,
            vec![
                Sample::new(labels(&[("podid", "1")]), 0.9),
                Sample::unlabeled(1.0),
            ],
        );
        assert!(!family.has_uniform_label_keys());
    }

    #[test]
    fn test_empty_family_is_uniform() {
        let family = MetricFamily::new(TEST_DESCRIPTOR, vec![]);
        assert!(family.has_uniform_label_keys());
        assert_eq!(family.name(), "test_metric");
    }
}
