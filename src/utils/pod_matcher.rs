//! Classifies health object distinguished names as fabric-wide or per-pod

use regex::Regex;
use std::sync::LazyLock;

static POD_HEALTH_DN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"topology/pod-(.*?)/health").expect("static regex is valid"));

/// Scope of a `fabricHealthTotal` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthScope {
    /// The record describes the whole fabric
    Fabric,
    /// The record describes the pod with the captured id
    Pod(String),
}

/// Match a distinguished name such as `topology/pod-1/health`
pub fn classify_dn(dn: &str) -> HealthScope {
    POD_HEALTH_DN
        .captures(dn)
        .and_then(|caps| caps.get(1))
        .map(|id| HealthScope::Pod(id.as_str().to_string()))
        .unwrap_or(HealthScope::Fabric)
}
