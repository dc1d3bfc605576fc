//! Prometheus text exposition of collected metric families
//!
//! Names are built as `prefix + name`, with `_<unit>` appended when the
//! descriptor carries a unit. Every sample is tagged with the configured
//! fabric key and, for successful passes, the controller-reported fabric name.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::warn;

use crate::monitor::fabric_collector::Scrape;
use crate::utils::metric_family::{Labels, MetricDescriptor, MetricFamily, MetricType, Sample};

const UP: MetricDescriptor = MetricDescriptor::gauge(
    "up",
    "Whether the last scrape of the fabric could log in to a controller",
    "",
);

/// Trait for rendering metrics to Prometheus text format
pub trait PrometheusFormat {
    fn to_prometheus_format(&self) -> String;
}

/// Escape label values for Prometheus format
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(ch),
        }
    }
    result
}

/// Escape HELP text (backslash and newline only)
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else {
        value.to_string()
    }
}

/// Exposed metric name for a descriptor
pub fn full_name(prefix: &str, descriptor: &MetricDescriptor) -> String {
    if descriptor.unit.is_empty() {
        format!("{}{}", prefix, descriptor.name)
    } else {
        format!("{}{}_{}", prefix, descriptor.name, descriptor.unit)
    }
}

fn label_string(common_labels: &Labels, sample: &Sample) -> String {
    let mut merged = common_labels.clone();
    merged.extend(
        sample
            .labels
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );

    if merged.is_empty() {
        return String::new();
    }

    let pairs: Vec<String> = merged
        .iter()
        .map(|(k, v)| format!(r#"{}="{}""#, k, escape_label_value(v)))
        .collect();
    format!("{{{}}}", pairs.join(","))
}

fn sample_line(name: &str, common_labels: &Labels, sample: &Sample) -> String {
    format!(
        "{}{} {}\n",
        name,
        label_string(common_labels, sample),
        format_value(sample.value)
    )
}

fn push_header(output: &mut String, name: &str, help: &str, metric_type: MetricType) {
    output.push_str(&format!("# HELP {} {}\n", name, escape_help(help)));
    output.push_str(&format!("# TYPE {} {}\n", name, metric_type));
}

/// Samples gathered under one exposed name, possibly from several fabrics
struct Block {
    help: &'static str,
    metric_type: MetricType,
    samples: String,
}

/// Prometheus text for one or more fabric scrapes
///
/// Families sharing an exposed name are merged so every name gets a single
/// HELP/TYPE header, in order of first appearance. `up` always comes last
/// with one sample per fabric.
pub struct Exposition {
    prefix: String,
    order: Vec<String>,
    blocks: HashMap<String, Block>,
    up: String,
}

impl Exposition {
    pub fn new(prefix: &str) -> Self {
        Exposition {
            prefix: prefix.to_string(),
            order: Vec::new(),
            blocks: HashMap::new(),
            up: String::new(),
        }
    }

    /// Add one fabric's pass; a failed pass contributes only `up 0`
    pub fn add_scrape(&mut self, fabric: &str, scrape: &Scrape) {
        let mut fabric_labels = Labels::new();
        fabric_labels.insert("fabric".to_string(), fabric.to_string());

        if scrape.ok {
            let mut common = fabric_labels.clone();
            common.insert("aci".to_string(), scrape.fabric_name.clone());
            for family in &scrape.families {
                if !family.has_uniform_label_keys() {
                    warn!(fabric = %fabric, family = family.name(), "Samples carry mixed label sets");
                }
                self.add_family(family, &common);
            }
        }

        let up = Sample::unlabeled(if scrape.ok { 1.0 } else { 0.0 });
        let name = full_name(&self.prefix, &UP);
        self.up.push_str(&sample_line(&name, &fabric_labels, &up));
    }

    fn add_family(&mut self, family: &MetricFamily, common_labels: &Labels) {
        let name = full_name(&self.prefix, &family.descriptor);
        let block = match self.blocks.entry(name.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.order.push(name.clone());
                entry.insert(Block {
                    help: family.descriptor.help,
                    metric_type: family.descriptor.metric_type,
                    samples: String::new(),
                })
            }
        };

        for sample in &family.samples {
            block
                .samples
                .push_str(&sample_line(&name, common_labels, sample));
        }
    }
}

impl PrometheusFormat for Exposition {
    fn to_prometheus_format(&self) -> String {
        let mut output = String::new();

        for name in &self.order {
            let block = &self.blocks[name];
            push_header(&mut output, name, block.help, block.metric_type);
            output.push_str(&block.samples);
        }

        let up_name = full_name(&self.prefix, &UP);
        push_header(&mut output, &up_name, UP.help, UP.metric_type);
        output.push_str(&self.up);

        output
    }
}

/// Render the scrapes of several fabrics as one document
pub fn render_scrapes<'a>(
    prefix: &str,
    scrapes: impl IntoIterator<Item = (&'a str, &'a Scrape)>,
) -> String {
    let mut exposition = Exposition::new(prefix);
    for (fabric, scrape) in scrapes {
        exposition.add_scrape(fabric, scrape);
    }
    exposition.to_prometheus_format()
}
