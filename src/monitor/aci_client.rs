//! APIC REST client
//!
//! Provides the session and query capabilities the collector depends on.
//! `AciClient` is long-lived (one per fabric, shares the HTTP connection pool);
//! each collection pass takes a fresh `HttpConnection` that owns its own
//! session token.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::header::COOKIE;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::queries::{Query, QueryRegistry};
use crate::utils::json_path;

const LOGIN_PATH: &str = "/api/aaaLogin.json";
const LOGOUT_PATH: &str = "/api/aaaLogout.json";
const TOKEN_PATH: &str = "imdata.0.aaaLogin.attributes.token";
const SESSION_COOKIE: &str = "APIC-cookie";

/// Session and query capabilities of a controller connection
///
/// `logout` must be safe to call at any time, including before or after a
/// failed `login`, and more than once.
pub trait AciConnection: Send + Sync {
    /// Open a session, `false` when no controller accepted the credentials
    fn login(&mut self) -> impl Future<Output = bool> + Send;

    /// Close the session if one is open
    fn logout(&mut self) -> impl Future<Output = ()> + Send;

    /// Raw JSON text answering a logical query
    fn get_by_query(&self, query: Query) -> impl Future<Output = Result<String>> + Send;
}

/// Configuration for the APIC client
#[derive(Clone)]
pub struct AciClientConfig {
    /// Controller base URLs, tried in order at login
    pub apic: Vec<String>,

    pub username: String,

    pub password: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Accept self-signed controller certificates
    pub accept_invalid_certs: bool,
}

impl AciClientConfig {
    /// Create a new config with controllers and credentials
    pub fn new(
        apic: Vec<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        AciClientConfig {
            apic,
            username: username.into(),
            password: password.into(),
            timeout: Duration::from_secs(15),
            accept_invalid_certs: false,
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set whether invalid certificates are accepted
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

impl std::fmt::Debug for AciClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AciClientConfig")
            .field("apic", &self.apic)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// Long-lived per-fabric client
#[derive(Clone, Debug)]
pub struct AciClient {
    config: Arc<AciClientConfig>,
    registry: Arc<QueryRegistry>,
    http: reqwest::Client,
}

impl AciClient {
    /// Create a new client with the given configuration
    pub fn new(config: AciClientConfig, registry: Arc<QueryRegistry>) -> Result<Self> {
        if config.apic.is_empty() {
            return Err(anyhow!("at least one APIC URL is required"));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| anyhow!("failed to build HTTP client: {}", e))?;

        Ok(AciClient {
            config: Arc::new(config),
            registry,
            http,
        })
    }

    pub fn config(&self) -> &AciClientConfig {
        &self.config
    }

    /// A fresh, logged-out connection for one collection pass
    pub fn connection(&self) -> HttpConnection {
        HttpConnection {
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
            http: self.http.clone(),
            session: None,
        }
    }
}

#[derive(Debug)]
struct ActiveSession {
    apic: String,
    token: String,
}

/// HTTP implementation of `AciConnection`
#[derive(Debug)]
pub struct HttpConnection {
    config: Arc<AciClientConfig>,
    registry: Arc<QueryRegistry>,
    http: reqwest::Client,
    session: Option<ActiveSession>,
}

fn endpoint(apic: &str, path: &str) -> String {
    format!("{}{}", apic.trim_end_matches('/'), path)
}

impl HttpConnection {
    /// The controller the current session is bound to
    #[cfg(test)]
    pub fn active_apic(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.apic.as_str())
    }

    async fn try_login(&self, apic: &str) -> Result<String> {
        let url = endpoint(apic, LOGIN_PATH);
        let body = json!({
            "aaaUser": {
                "attributes": {
                    "name": self.config.username,
                    "pwd": self.config.password,
                }
            }
        });

        debug!(url = %url, "Sending APIC login request");
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("login request to {} failed: {}", url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("login to {} returned {}", url, status));
        }

        let doc: Value = response
            .json()
            .await
            .map_err(|e| anyhow!("invalid login response from {}: {}", url, e))?;

        json_path::lookup_str(&doc, TOKEN_PATH)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| anyhow!("no session token in login response from {}", url))
    }
}

impl AciConnection for HttpConnection {
    async fn login(&mut self) -> bool {
        let config = Arc::clone(&self.config);

        for apic in &config.apic {
            match self.try_login(apic).await {
                Ok(token) => {
                    info!(apic = %apic, "Logged in to APIC");
                    self.session = Some(ActiveSession {
                        apic: apic.clone(),
                        token,
                    });
                    return true;
                }
                Err(e) => {
                    warn!(apic = %apic, error = %e, "APIC login failed");
                }
            }
        }

        error!(
            controllers = config.apic.len(),
            "Login failed on every configured APIC"
        );
        false
    }

    async fn logout(&mut self) {
        let Some(session) = self.session.take() else {
            debug!("No active APIC session, skipping logout");
            return;
        };

        let url = endpoint(&session.apic, LOGOUT_PATH);
        let body = json!({
            "aaaUser": {
                "attributes": {
                    "name": self.config.username,
                }
            }
        });

        let result = self
            .http
            .post(&url)
            .header(COOKIE, format!("{}={}", SESSION_COOKIE, session.token))
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(apic = %session.apic, "Logged out from APIC");
            }
            Ok(response) => {
                warn!(apic = %session.apic, status = %response.status(), "APIC logout rejected");
            }
            Err(e) => {
                warn!(apic = %session.apic, error = %e, "APIC logout failed");
            }
        }
    }

    async fn get_by_query(&self, query: Query) -> Result<String> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| anyhow!("not logged in, cannot run query {}", query))?;

        let url = endpoint(&session.apic, self.registry.path(query));
        debug!(query = %query, url = %url, "Running APIC query");

        let response = self
            .http
            .get(&url)
            .header(COOKIE, format!("{}={}", SESSION_COOKIE, session.token))
            .send()
            .await
            .map_err(|e| anyhow!("query {} to {} failed: {}", query, url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("query {} to {} returned {}", query, url, status));
        }

        response
            .text()
            .await
            .map_err(|e| anyhow!("failed to read {} response: {}", query, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn login_response(token: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "totalCount": "1",
            "imdata": [{"aaaLogin": {"attributes": {"token": token}}}]
        }))
    }

    fn client_for(apic: Vec<String>) -> AciClient {
        let config = AciClientConfig::new(apic, "admin", "secret")
            .with_timeout(Duration::from_secs(5));
        AciClient::new(config, Arc::new(QueryRegistry::default())).unwrap()
    }

    async fn mount_login(server: &MockServer, token: &str) {
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(body_json(json!({
                "aaaUser": {"attributes": {"name": "admin", "pwd": "secret"}}
            })))
            .respond_with(login_response(token))
            .mount(server)
            .await;
    }

    #[test]
    fn test_client_config_builder() {
        let config = AciClientConfig::new(vec!["https://apic1".to_string()], "u", "p")
            .with_timeout(Duration::from_secs(30))
            .with_accept_invalid_certs(true);

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.accept_invalid_certs);
    }

    #[test]
    fn test_client_config_debug_redacts_password() {
        let config = AciClientConfig::new(vec![], "admin", "hunter2");
        let debug = format!("{:?}", config);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_client_requires_apic() {
        let config = AciClientConfig::new(vec![], "admin", "secret");
        assert!(AciClient::new(config, Arc::new(QueryRegistry::default())).is_err());
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        assert_eq!(
            endpoint("https://apic1/", "/api/aaaLogin.json"),
            "https://apic1/api/aaaLogin.json"
        );
    }

    #[tokio::test]
    async fn test_login_and_query_with_session_cookie() {
        let server = MockServer::start().await;
        mount_login(&server, "tok-1").await;

        Mock::given(method("GET"))
            .and(path("/api/class/fvTenant.json"))
            .and(query_param("rsp-subtree-include", "health"))
            .and(header("cookie", "APIC-cookie=tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"imdata":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(vec![server.uri()]);
        let mut connection = client.connection();

        assert!(connection.login().await);
        assert_eq!(connection.active_apic(), Some(server.uri().as_str()));

        let body = connection.get_by_query(Query::TenantHealth).await.unwrap();
        assert_eq!(body, r#"{"imdata":[]}"#);
    }

    #[tokio::test]
    async fn test_login_fails_over_to_next_apic() {
        let rejecting = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&rejecting)
            .await;

        let accepting = MockServer::start().await;
        mount_login(&accepting, "tok-2").await;

        let client = client_for(vec![rejecting.uri(), accepting.uri()]);
        let mut connection = client.connection();

        assert!(connection.login().await);
        assert_eq!(connection.active_apic(), Some(accepting.uri().as_str()));
    }

    #[tokio::test]
    async fn test_login_fails_when_every_apic_rejects() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = client_for(vec![server.uri()]);
        let mut connection = client.connection();

        assert!(!connection.login().await);
        assert!(connection.active_apic().is_none());
        assert!(connection.get_by_query(Query::Faults).await.is_err());
    }

    #[tokio::test]
    async fn test_login_without_token_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"imdata": []})))
            .mount(&server)
            .await;

        let client = client_for(vec![server.uri()]);
        let mut connection = client.connection();
        assert!(!connection.login().await);
    }

    #[tokio::test]
    async fn test_query_error_status() {
        let server = MockServer::start().await;
        mount_login(&server, "tok-3").await;

        Mock::given(method("GET"))
            .and(path("/api/class/infraWiNode.json"))
            .respond_with(ResponseTemplate::new(400).set_body_string("unknown class"))
            .mount(&server)
            .await;

        let client = client_for(vec![server.uri()]);
        let mut connection = client.connection();
        assert!(connection.login().await);

        let err = connection
            .get_by_query(Query::InfraNodeHealth)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("infra_node_health"));
    }

    #[tokio::test]
    async fn test_logout_is_sent_once() {
        let server = MockServer::start().await;
        mount_login(&server, "tok-4").await;

        Mock::given(method("POST"))
            .and(path(LOGOUT_PATH))
            .and(header("cookie", "APIC-cookie=tok-4"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(vec![server.uri()]);
        let mut connection = client.connection();
        assert!(connection.login().await);

        connection.logout().await;
        connection.logout().await;
        assert!(connection.active_apic().is_none());
    }

    #[tokio::test]
    async fn test_logout_without_login_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGOUT_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(vec![server.uri()]);
        let mut connection = client.connection();
        connection.logout().await;
    }
}
