//! Application context and dependency injection
//!
//! Holds the parsed configuration and one long-lived APIC client per fabric.
//! Everything is created once during startup and shared by the HTTP handlers.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ExporterConfig;
use crate::monitor::aci_client::AciClient;
use crate::monitor::fabric_collector::FabricCollector;
use crate::monitor::queries::QueryRegistry;
use crate::utils::exposition::render_scrapes;

/// Application context holding all singleton instances
#[derive(Clone)]
pub struct AppContext {
    /// Metric name prefix
    prefix: Arc<str>,

    /// APIC clients by fabric name
    clients: Arc<BTreeMap<String, AciClient>>,
}

impl AppContext {
    /// Create a new application context from a validated configuration
    pub fn new(config: ExporterConfig) -> Result<Self> {
        info!("Initializing application context");

        let registry = Arc::new(QueryRegistry::with_overrides(&config.queries)?);
        debug!(?registry, "Query registry initialized");

        let mut clients = BTreeMap::new();
        for (name, fabric) in &config.fabrics {
            let client = AciClient::new(fabric.client_config(), Arc::clone(&registry))
                .with_context(|| format!("failed to create client for fabric {}", name))?;
            clients.insert(name.clone(), client);
            info!(fabric = %name, apic = ?fabric.apic, "APIC client initialized");
        }

        Ok(AppContext {
            prefix: Arc::from(config.prefix.as_str()),
            clients: Arc::new(clients),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Configured fabric names, sorted
    pub fn fabric_names(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    pub fn client(&self, fabric: &str) -> Option<&AciClient> {
        self.clients.get(fabric)
    }

    /// Collect one fabric and render it, `None` for an unknown fabric
    pub async fn scrape_fabric(&self, fabric: &str) -> Option<String> {
        let client = self.client(fabric)?;
        let scrape = FabricCollector::new(fabric, client.connection())
            .collect_detached()
            .await;
        Some(render_scrapes(&self.prefix, [(fabric, &scrape)]))
    }

    /// Collect every fabric concurrently, one isolated pass each, into a
    /// single exposition
    pub async fn scrape_all(&self) -> String {
        let futures: Vec<_> = self
            .clients
            .iter()
            .map(|(name, client)| async move {
                let scrape = FabricCollector::new(name.as_str(), client.connection())
                    .collect_detached()
                    .await;
                (name.as_str(), scrape)
            })
            .collect();

        let scrapes = futures::future::join_all(futures).await;
        render_scrapes(
            &self.prefix,
            scrapes.iter().map(|(name, scrape)| (*name, scrape)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn two_fabric_config(apic: &str) -> ExporterConfig {
        ExporterConfig::from_yaml(&format!(
            "fabrics:\n  dc1:\n    apic: [{apic}]\n    username: admin\n    password: secret\n  dc2:\n    apic: [{apic}]\n    username: admin\n    password: secret\n",
            apic = apic
        ))
        .unwrap()
    }

    fn config_for(apic: &str) -> ExporterConfig {
        ExporterConfig::from_yaml(&format!(
            "fabrics:\n  lab:\n    apic: [{}]\n    username: admin\n    password: secret\n    timeout_secs: 5\n",
            apic
        ))
        .unwrap()
    }

    #[test]
    fn test_app_context_creation() {
        let ctx = AppContext::new(config_for("https://apic1.lab")).unwrap();
        assert_eq!(ctx.prefix(), "aci_");
        assert_eq!(ctx.fabric_names().collect::<Vec<_>>(), vec!["lab"]);
        assert!(ctx.client("lab").is_some());
        assert!(ctx.client("other").is_none());
    }

    #[test]
    fn test_app_context_clone() {
        let ctx = AppContext::new(config_for("https://apic1.lab")).unwrap();
        let cloned = ctx.clone();

        // Both should reference the same client map (same Arc pointer)
        assert_eq!(Arc::as_ptr(&ctx.clients), Arc::as_ptr(&cloned.clients));
    }

    #[test]
    fn test_app_context_bad_query_override() {
        let mut config = config_for("https://apic1.lab");
        config
            .queries
            .insert("epg_health".to_string(), "/api/class/fvAEPg.json".to_string());
        assert!(AppContext::new(config).is_err());
    }

    #[tokio::test]
    async fn test_scrape_unknown_fabric() {
        let ctx = AppContext::new(config_for("https://apic1.lab")).unwrap();
        assert!(ctx.scrape_fabric("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_scrape_fabric_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/aaaLogin.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "imdata": [{"aaaLogin": {"attributes": {"token": "tok"}}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/mo/topology/pod-1/node-1/av.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "imdata": [{"infraCont": {"attributes": {"fbDmNm": "LAB1"}}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/class/fabricHealthTotal.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "imdata": [{"fabricHealthTotal": {"attributes": {"dn": "topology/health", "cur": "88"}}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/aaaLogout.json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = AppContext::new(config_for(&server.uri())).unwrap();
        let output = ctx.scrape_fabric("lab").await.unwrap();

        assert!(output.contains(r#"aci_fabric_health_overall_ratio{aci="LAB1",fabric="lab"} 0.88"#));
        assert!(output.contains("# TYPE aci_scrape_duration_seconds gauge"));
        assert!(!output.contains("aci_tenant_health_ratio"));
        assert!(output.contains(r#"aci_up{fabric="lab"} 1"#));
    }

    #[tokio::test]
    async fn test_scrape_all_reports_down_fabric() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/aaaLogin.json"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let ctx = AppContext::new(config_for(&server.uri())).unwrap();
        let output = ctx.scrape_all().await;

        assert!(output.contains(r#"aci_up{fabric="lab"} 0"#));
        assert!(!output.contains("scrape_duration"));
    }

    #[tokio::test]
    async fn test_scrape_all_single_header_per_metric() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/aaaLogin.json"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let ctx = AppContext::new(two_fabric_config(&server.uri())).unwrap();
        let output = ctx.scrape_all().await;

        assert_eq!(
            output.lines().filter(|l| *l == "# TYPE aci_up gauge").count(),
            1
        );
        assert_eq!(output.matches("# HELP aci_up ").count(), 1);
        assert!(output.ends_with("aci_up{fabric=\"dc1\"} 0\naci_up{fabric=\"dc2\"} 0\n"));
    }
}
