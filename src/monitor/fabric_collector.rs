//! Fabric collector - runs one collection pass against a fabric
//!
//! Responsibilities:
//! - Open the controller session and always close it again
//! - Resolve the fabric name
//! - Run every domain extractor in a fixed order, skipping failed domains
//! - Append the scrape duration of the whole pass

use anyhow::{anyhow, Result};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::aci_client::AciConnection;
use super::domains::{self, DomainResult};
use super::queries::Query;
use crate::utils::metric_family::MetricFamily;

/// Result of one collection pass
#[derive(Debug, Clone, PartialEq)]
pub struct Scrape {
    /// Controller-reported fabric name, empty when it could not be resolved
    pub fabric_name: String,
    /// Families in collection order, scrape duration last
    pub families: Vec<MetricFamily>,
    /// `false` only when no session could be opened
    pub ok: bool,
}

impl Scrape {
    /// A pass that could not log in
    pub fn failed() -> Self {
        Scrape {
            fabric_name: String::new(),
            families: Vec::new(),
            ok: false,
        }
    }
}

/// Collects one fabric over a single connection
///
/// `collect` consumes the collector: a connection serves exactly one pass.
pub struct FabricCollector<C: AciConnection> {
    fabric: String,
    connection: C,
}

impl<C: AciConnection> FabricCollector<C> {
    /// Create a new collector for the named fabric
    pub fn new(fabric: impl Into<String>, connection: C) -> Self {
        FabricCollector {
            fabric: fabric.into(),
            connection,
        }
    }

    /// Run a full collection pass
    ///
    /// The session is released before returning whether or not login succeeded.
    pub async fn collect(mut self) -> Scrape {
        let start = Instant::now();
        debug!(fabric = %self.fabric, "Starting fabric collection");

        let scrape = if self.connection.login().await {
            self.collect_domains(start).await
        } else {
            warn!(fabric = %self.fabric, "Login failed, skipping collection");
            Scrape::failed()
        };

        self.connection.logout().await;

        if scrape.ok {
            info!(
                fabric = %self.fabric,
                fabric_name = %scrape.fabric_name,
                families = scrape.families.len(),
                duration_ms = start.elapsed().as_millis(),
                "Fabric collection completed"
            );
        }

        scrape
    }

    /// Run the pass on its own task
    ///
    /// Dropping the returned future (a cancelled HTTP request) leaves the
    /// pass running, so logout still happens.
    pub async fn collect_detached(self) -> Scrape
    where
        C: 'static,
    {
        let fabric = self.fabric.clone();
        match tokio::spawn(self.collect()).await {
            Ok(scrape) => scrape,
            Err(e) => {
                error!(fabric = %fabric, error = %e, "Collection task failed");
                Scrape::failed()
            }
        }
    }

    async fn collect_domains(&self, start: Instant) -> Scrape {
        let fabric_name = self.fabric_name().await;

        let results = vec![
            self.query_domain(Query::FabricHealth, domains::fabric_health)
                .await,
            self.query_domain(Query::NodeHealth, |doc| vec![domains::node_health(doc)])
                .await,
            self.query_domain(Query::TenantHealth, |doc| {
                vec![domains::tenant_health(doc)]
            })
            .await,
            self.query_domain(Query::Faults, domains::faults).await,
            self.query_domain(Query::InfraNodeHealth, |doc| {
                vec![domains::infra_node(doc)]
            })
            .await,
        ];

        for result in &results {
            if let DomainResult::Absent { query, reason } = result {
                error!(fabric = %self.fabric, query = %query, error = %reason, "Query not supported, skipping domain");
            }
        }

        let absent = results.iter().filter(|r| !r.is_present()).count();
        if absent > 0 {
            debug!(fabric = %self.fabric, absent, "Some domains were skipped");
        }

        let mut families: Vec<MetricFamily> = results
            .into_iter()
            .flat_map(DomainResult::into_families)
            .collect();

        families.push(domains::scrape_duration(start.elapsed().as_secs_f64()));

        Scrape {
            fabric_name,
            families,
            ok: true,
        }
    }

    /// Fetch and parse one query result
    async fn fetch(&self, query: Query) -> Result<Value> {
        let raw = self.connection.get_by_query(query).await?;
        serde_json::from_str(&raw).map_err(|e| anyhow!("malformed {} response: {}", query, e))
    }

    async fn query_domain<F>(&self, query: Query, extract: F) -> DomainResult
    where
        F: FnOnce(&Value) -> Vec<MetricFamily>,
    {
        match self.fetch(query).await {
            Ok(doc) => DomainResult::Present(extract(&doc)),
            Err(e) => DomainResult::Absent {
                query,
                reason: e.to_string(),
            },
        }
    }

    async fn fabric_name(&self) -> String {
        match self.fetch(Query::FabricName).await {
            Ok(doc) => domains::fabric_name(&doc),
            Err(e) => {
                error!(fabric = %self.fabric, query = %Query::FabricName, error = %e, "Query not supported, fabric name unknown");
                String::new()
            }
        }
    }
}
