//! Logical APIC queries and the registry mapping them to API paths

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Logical query names understood by the domain extractors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    FabricHealth,
    NodeHealth,
    TenantHealth,
    Faults,
    InfraNodeHealth,
    FabricName,
}

impl Query {
    pub const ALL: [Query; 6] = [
        Query::FabricHealth,
        Query::NodeHealth,
        Query::TenantHealth,
        Query::Faults,
        Query::InfraNodeHealth,
        Query::FabricName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Query::FabricHealth => "fabric_health",
            Query::NodeHealth => "node_health",
            Query::TenantHealth => "tenant_health",
            Query::Faults => "faults",
            Query::InfraNodeHealth => "infra_node_health",
            Query::FabricName => "fabric_name",
        }
    }

    /// Built-in API path for this query
    pub fn default_path(&self) -> &'static str {
        match self {
            Query::FabricHealth => "/api/class/fabricHealthTotal.json",
            Query::NodeHealth => "/api/class/topSystem.json?rsp-subtree-include=health",
            Query::TenantHealth => "/api/class/fvTenant.json?rsp-subtree-include=health",
            Query::Faults => "/api/class/faultCountsWithDetails.json?rsp-subtree-include=count",
            Query::InfraNodeHealth => "/api/class/infraWiNode.json",
            Query::FabricName => "/api/mo/topology/pod-1/node-1/av.json",
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Query {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Query::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| anyhow!("unknown query name: {}", s))
    }
}

/// Maps every logical query to the API path that satisfies it
#[derive(Debug, Clone)]
pub struct QueryRegistry {
    paths: HashMap<Query, String>,
}

impl QueryRegistry {
    /// Registry with the built-in paths
    pub fn new() -> Self {
        QueryRegistry {
            paths: Query::ALL
                .into_iter()
                .map(|q| (q, q.default_path().to_string()))
                .collect(),
        }
    }

    /// Registry with the built-in paths, overridden by `overrides` (logical name -> path)
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Result<Self> {
        let mut registry = Self::new();
        for (name, path) in overrides {
            let query: Query = name.parse()?;
            if !path.starts_with('/') {
                return Err(anyhow!(
                    "query path for {} must start with '/', got {}",
                    query,
                    path
                ));
            }
            registry.paths.insert(query, path.clone());
        }
        Ok(registry)
    }

    pub fn path(&self, query: Query) -> &str {
        self.paths
            .get(&query)
            .map(String::as_str)
            .unwrap_or_else(|| query.default_path())
    }
}

impl Default for QueryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
