//! Per-domain extractors turning APIC query results into metric families
//!
//! Each extractor is a pure function of one parsed query result. Fetching and
//! failure handling live in the collector; a domain whose query fails is
//! reported as `DomainResult::Absent` and never aborts the pass.

use serde_json::Value;

use super::queries::Query;
use crate::utils::converter::{float_at, ratio_at};
use crate::utils::json_path::{lookup, lookup_array, lookup_str};
use crate::utils::labels::extract_labels;
use crate::utils::metric_family::{Labels, MetricDescriptor, MetricFamily, Sample};
use crate::utils::pod_matcher::{classify_dn, HealthScope};

pub const FABRIC_HEALTH_OVERALL: MetricDescriptor = MetricDescriptor::gauge(
    "fabric_health_overall",
    "Returns the health score of the overall fabric",
    "ratio",
);
pub const POD_HEALTH: MetricDescriptor =
    MetricDescriptor::gauge("pod_health", "Returns the health score of a pod", "ratio");
pub const NODE_HEALTH: MetricDescriptor = MetricDescriptor::gauge(
    "node_health",
    "Returns the health score of a fabric node",
    "ratio",
);
pub const TENANT_HEALTH: MetricDescriptor = MetricDescriptor::gauge(
    "tenant_health",
    "Returns the health score of a tenant",
    "ratio",
);
pub const FAULTS: MetricDescriptor = MetricDescriptor::gauge(
    "faults",
    "Returns the total number of faults by type",
    "",
);
pub const FAULTS_ACKED: MetricDescriptor = MetricDescriptor::gauge(
    "faults_acked",
    "Returns the total number of acknowledged faults by type",
    "",
);
pub const INFRA_NODE: MetricDescriptor = MetricDescriptor::counter(
    "infra_node",
    "Returns the info of the infrastructure apic node",
    "info",
);
pub const SCRAPE_DURATION: MetricDescriptor = MetricDescriptor::gauge(
    "scrape_duration",
    "The duration, in seconds, of the last scrape of the fabric",
    "seconds",
);

const NODE_LABELS: [(&str, &str); 5] = [
    ("podid", "topSystem.attributes.podId"),
    ("state", "topSystem.attributes.state"),
    ("oobmgmtaddr", "topSystem.attributes.oobMgmtAddr"),
    ("nodeid", "topSystem.attributes.id"),
    ("name", "topSystem.attributes.name"),
];

const INFRA_NODE_LABELS: [(&str, &str); 8] = [
    ("name", "infraWiNode.attributes.nodeName"),
    ("address", "infraWiNode.attributes.addr"),
    ("health", "infraWiNode.attributes.health"),
    ("apicmode", "infraWiNode.attributes.apicMode"),
    ("adminstatus", "infraWiNode.attributes.adminSt"),
    ("operstatus", "infraWiNode.attributes.operSt"),
    ("failoverStatus", "infraWiNode.attributes.failoverStatus"),
    ("podid", "infraWiNode.attributes.podId"),
];

/// (severity label, raised counter, acknowledged counter)
const SEVERITIES: [(&str, &str, &str); 4] = [
    ("crit", "attributes.crit", "attributes.critAcked"),
    ("maj", "attributes.maj", "attributes.majAcked"),
    ("minor", "attributes.minor", "attributes.minorAcked"),
    ("warn", "attributes.warn", "attributes.warnAcked"),
];

const CONTROLLER_ROLE: &str = "controller";

/// Outcome of one domain in a collection pass
#[derive(Debug, Clone, PartialEq)]
pub enum DomainResult {
    /// The query succeeded; the families are complete
    Present(Vec<MetricFamily>),

    /// The query failed or is not supported by this controller
    Absent { query: Query, reason: String },
}

impl DomainResult {
    pub fn is_present(&self) -> bool {
        matches!(self, DomainResult::Present(_))
    }

    /// Families of a present domain, nothing for an absent one
    pub fn into_families(self) -> Vec<MetricFamily> {
        match self {
            DomainResult::Present(families) => families,
            DomainResult::Absent { .. } => Vec::new(),
        }
    }
}

/// Fabric-wide and per-pod health from `fabricHealthTotal` records
///
/// Both families are always returned, possibly empty.
pub fn fabric_health(doc: &Value) -> Vec<MetricFamily> {
    let mut overall = Vec::new();
    let mut pods = Vec::new();

    for record in lookup_array(doc, "imdata") {
        let dn = lookup_str(record, "fabricHealthTotal.attributes.dn").unwrap_or_default();
        let value = ratio_at(record, "fabricHealthTotal.attributes.cur");

        match classify_dn(&dn) {
            HealthScope::Fabric => overall.push(Sample::unlabeled(value)),
            HealthScope::Pod(id) => {
                let mut labels = Labels::new();
                labels.insert("podid".to_string(), id);
                pods.push(Sample::new(labels, value));
            }
        }
    }

    vec![
        MetricFamily::new(FABRIC_HEALTH_OVERALL, overall),
        MetricFamily::new(POD_HEALTH, pods),
    ]
}

/// Leaf and spine health from `topSystem` records; controllers are skipped
pub fn node_health(doc: &Value) -> MetricFamily {
    let samples = lookup_array(doc, "imdata")
        .iter()
        .filter_map(|record| {
            let role = lookup_str(record, "topSystem.attributes.role").unwrap_or_default();
            if role == CONTROLLER_ROLE {
                return None;
            }

            let mut labels = extract_labels(record, &NODE_LABELS);
            labels.insert("role".to_string(), role);
            let value = ratio_at(record, "topSystem.children.0.healthInst.attributes.cur");
            Some(Sample::new(labels, value))
        })
        .collect();

    MetricFamily::new(NODE_HEALTH, samples)
}

/// Tenant health from `fvTenant` records
pub fn tenant_health(doc: &Value) -> MetricFamily {
    let samples = lookup_array(doc, "imdata")
        .iter()
        .map(|record| {
            let labels = extract_labels(record, &[("domain", "fvTenant.attributes.name")]);
            let value = ratio_at(record, "fvTenant.children.0.healthInst.attributes.cur");
            Sample::new(labels, value)
        })
        .collect();

    MetricFamily::new(TENANT_HEALTH, samples)
}

/// Raised and acknowledged fault counts per fault type and severity
///
/// Records are taken from `imdata.0.faultCountsWithDetails.children[*].faultTypeCounts`
/// in source order; children without `faultTypeCounts` are ignored.
pub fn faults(doc: &Value) -> Vec<MetricFamily> {
    let type_counts: Vec<&Value> =
        lookup_array(doc, "imdata.0.faultCountsWithDetails.children")
            .iter()
            .filter_map(|child| lookup(child, "faultTypeCounts"))
            .collect();

    let mut raised = Vec::with_capacity(type_counts.len() * SEVERITIES.len());
    let mut acked = Vec::with_capacity(type_counts.len() * SEVERITIES.len());

    for record in type_counts {
        let fault_type = lookup_str(record, "attributes.type").unwrap_or_default();

        for (severity, raised_path, acked_path) in SEVERITIES {
            let mut labels = Labels::new();
            labels.insert("type".to_string(), fault_type.clone());
            labels.insert("severity".to_string(), severity.to_string());

            raised.push(Sample::new(labels.clone(), float_at(record, raised_path)));
            acked.push(Sample::new(labels, float_at(record, acked_path)));
        }
    }

    vec![
        MetricFamily::new(FAULTS, raised),
        MetricFamily::new(FAULTS_ACKED, acked),
    ]
}

/// One info sample per APIC controller from `infraWiNode` records
pub fn infra_node(doc: &Value) -> MetricFamily {
    let samples = lookup_array(doc, "imdata")
        .iter()
        .map(|record| Sample::new(extract_labels(record, &INFRA_NODE_LABELS), 1.0))
        .collect();

    MetricFamily::new(INFRA_NODE, samples)
}

/// Configured fabric domain name, empty when absent
pub fn fabric_name(doc: &Value) -> String {
    lookup_str(doc, "imdata.0.infraCont.attributes.fbDmNm").unwrap_or_default()
}

/// Single unlabeled sample holding the pass duration
pub fn scrape_duration(seconds: f64) -> MetricFamily {
    MetricFamily::new(SCRAPE_DURATION, vec![Sample::unlabeled(seconds)])
}
