//! Exporter configuration
//!
//! Fabrics, credentials and query overrides are read from a YAML file;
//! listen address and log level come from the command line.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use crate::monitor::aci_client::AciClientConfig;

// HTTP endpoint paths
pub const METRICS_URL: &str = "/metrics";
pub const PROBE_URL: &str = "/probe";
pub const FABRICS_URL: &str = "/fabrics";

pub const DEFAULT_PREFIX: &str = "aci_";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Top-level configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    /// Prefix of every exposed metric name
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Fabrics by name; a `BTreeMap` keeps `/metrics` output ordered
    pub fabrics: BTreeMap<String, FabricConfig>,

    /// Logical query name -> API path overrides
    #[serde(default)]
    pub queries: HashMap<String, String>,
}

/// Connection settings for one fabric
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FabricConfig {
    /// Controller base URLs, e.g. `https://apic1.example.com`
    pub apic: Vec<String>,

    pub username: String,

    pub password: String,

    #[serde(default)]
    pub accept_invalid_certs: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for FabricConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FabricConfig")
            .field("apic", &self.apic)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl FabricConfig {
    /// Client configuration for this fabric
    pub fn client_config(&self) -> AciClientConfig {
        AciClientConfig::new(self.apic.clone(), &self.username, &self.password)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_accept_invalid_certs(self.accept_invalid_certs)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.apic.is_empty() {
            return Err(anyhow!("fabric {}: at least one apic URL is required", name));
        }
        if let Some(url) = self
            .apic
            .iter()
            .find(|url| !(url.starts_with("http://") || url.starts_with("https://")))
        {
            return Err(anyhow!(
                "fabric {}: apic URL must start with http:// or https://, got {}",
                name,
                url
            ));
        }
        if self.username.is_empty() || self.password.is_empty() {
            return Err(anyhow!("fabric {}: username and password are required", name));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("fabric {}: timeout_secs must be > 0", name));
        }
        Ok(())
    }
}

impl ExporterConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: ExporterConfig =
            serde_yaml::from_str(content).context("invalid configuration file")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the configuration file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.fabrics.is_empty() {
            return Err(anyhow!("at least one fabric must be configured"));
        }
        if !is_valid_prefix(&self.prefix) {
            return Err(anyhow!("invalid metric prefix: {:?}", self.prefix));
        }
        for (name, fabric) in &self.fabrics {
            fabric.validate(name)?;
        }
        Ok(())
    }
}

/// Prometheus metric names: `[a-zA-Z_:][a-zA-Z0-9_:]*`
fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        None => true,
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == ':' => chars
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':'),
        Some(_) => false,
    }
}
