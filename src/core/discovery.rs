//! OIDC Discovery
//!
//! OpenID Connect Discovery (RFC 8414) endpoint resolution.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::core::transport::{HttpMethod, HttpRequest, HttpTransport};
use crate::error::{ConfigurationError, OAuth2Error, OAuth2Result};
use crate::types::{DiscoveryDocument, OAuth2Config};

/// Discovery client interface (for dependency injection).
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// Fetch the discovery document at `url`.
    async fn fetch(&self, url: &str) -> OAuth2Result<DiscoveryDocument>;
}

/// Default discovery client implementation.
pub struct DefaultDiscoveryClient<T: HttpTransport> {
    transport: Arc<T>,
}

impl<T: HttpTransport> DefaultDiscoveryClient<T> {
    /// Create new discovery client.
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: HttpTransport> DiscoveryClient for DefaultDiscoveryClient<T> {
    async fn fetch(&self, url: &str) -> OAuth2Result<DiscoveryDocument> {
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: [("accept".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            body: None,
            timeout: None,
        };

        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(ConfigurationError::DiscoveryFailed {
                message: format!(
                    "discovery request to {} failed with status {}",
                    url, response.status
                ),
            }
            .into());
        }

        serde_json::from_str(&response.body).map_err(|e| {
            ConfigurationError::DiscoveryFailed {
                message: format!("invalid discovery document: {}", e),
            }
            .into()
        })
    }
}

/// Resolve unset endpoints of `config` from the provider's discovery document.
///
/// Endpoints configured explicitly are kept. Without an issuer or discovery
/// URL this is a no-op.
pub async fn discover_endpoints<D>(config: &mut OAuth2Config, client: &D) -> OAuth2Result<()>
where
    D: DiscoveryClient + ?Sized,
{
    let Some(url) = config.provider.discovery_url() else {
        return Ok(());
    };

    tracing::debug!(url = %url, "fetching discovery document");
    let document = client.fetch(&url).await.map_err(|e| match e {
        OAuth2Error::Configuration(_) => e,
        other => ConfigurationError::DiscoveryFailed {
            message: other.to_string(),
        }
        .into(),
    })?;

    config.apply_discovery(&document);
    Ok(())
}

/// Mock discovery client for testing.
#[derive(Default)]
pub struct MockDiscoveryClient {
    documents: Mutex<HashMap<String, DiscoveryDocument>>,
    fetch_history: Mutex<Vec<String>>,
}

impl MockDiscoveryClient {
    /// Create new mock discovery client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set discovery document served at `url`.
    pub fn set_document(&self, url: &str, document: DiscoveryDocument) -> &Self {
        self.documents
            .lock()
            .unwrap()
            .insert(url.to_string(), document);
        self
    }

    /// Get fetch history.
    pub fn get_fetch_history(&self) -> Vec<String> {
        self.fetch_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiscoveryClient for MockDiscoveryClient {
    async fn fetch(&self, url: &str) -> OAuth2Result<DiscoveryDocument> {
        self.fetch_history.lock().unwrap().push(url.to_string());

        self.documents
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| {
                ConfigurationError::DiscoveryFailed {
                    message: format!("no mock document for {}", url),
                }
                .into()
            })
    }
}

/// Create mock discovery document for testing.
pub fn create_mock_discovery_document(issuer: &str) -> DiscoveryDocument {
    DiscoveryDocument {
        issuer: issuer.to_string(),
        authorization_endpoint: format!("{}/authorize", issuer),
        token_endpoint: format!("{}/token", issuer),
        device_authorization_endpoint: Some(format!("{}/device", issuer)),
        introspection_endpoint: Some(format!("{}/introspect", issuer)),
        pushed_authorization_request_endpoint: Some(format!("{}/par", issuer)),
    }
}
