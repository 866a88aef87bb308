//! Configuration Builder
//!
//! Fluent builder for OAuth2 configuration.

use std::time::Duration;
use url::Url;

use crate::error::{ConfigurationError, OAuth2Error};
use crate::types::{AuthMethod, ClientCredentials, OAuth2Config, ProviderConfig, DEFAULT_TIMEOUT_MS};
use secrecy::SecretString;

/// OAuth2 configuration builder.
#[derive(Default)]
pub struct OAuth2ConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    auth_method: Option<AuthMethod>,
    issuer: Option<String>,
    discovery_endpoint: Option<String>,
    authorization_endpoint: Option<String>,
    token_endpoint: Option<String>,
    device_authorization_endpoint: Option<String>,
    introspection_endpoint: Option<String>,
    pushed_authorization_request_endpoint: Option<String>,
    timeout: Option<Duration>,
    skip_tls_verify: bool,
}

impl OAuth2ConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set client secret. An empty secret is treated as absent.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        let secret = client_secret.into();
        self.client_secret = (!secret.is_empty()).then(|| SecretString::new(secret));
        self
    }

    /// Set client authentication method.
    pub fn auth_method(mut self, method: AuthMethod) -> Self {
        self.auth_method = Some(method);
        self
    }

    /// Set issuer.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = non_empty(issuer.into());
        self
    }

    /// Override the discovery document URL.
    pub fn discovery_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.discovery_endpoint = non_empty(endpoint.into());
        self
    }

    /// Set authorization endpoint.
    pub fn authorization_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.authorization_endpoint = non_empty(endpoint.into());
        self
    }

    /// Set token endpoint.
    pub fn token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = non_empty(endpoint.into());
        self
    }

    /// Set device authorization endpoint.
    pub fn device_authorization_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.device_authorization_endpoint = non_empty(endpoint.into());
        self
    }

    /// Set introspection endpoint.
    pub fn introspection_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.introspection_endpoint = non_empty(endpoint.into());
        self
    }

    /// Set pushed authorization request endpoint.
    pub fn pushed_authorization_request_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.pushed_authorization_request_endpoint = non_empty(endpoint.into());
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Accept invalid TLS certificates.
    pub fn skip_tls_verify(mut self, skip: bool) -> Self {
        self.skip_tls_verify = skip;
        self
    }

    /// Build the OAuth2 configuration.
    ///
    /// Either an issuer (or discovery URL) or an explicit token endpoint is
    /// required. Without an explicit auth method, clients with a secret use
    /// HTTP Basic and clients without one are public.
    pub fn build(self) -> Result<OAuth2Config, OAuth2Error> {
        let client_id = self
            .client_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ConfigurationError::MissingField {
                field: "client_id".to_string(),
            })?;

        if self.issuer.is_none() && self.discovery_endpoint.is_none() && self.token_endpoint.is_none()
        {
            return Err(ConfigurationError::MissingField {
                field: "issuer".to_string(),
            }
            .into());
        }

        let endpoints = [
            &self.issuer,
            &self.discovery_endpoint,
            &self.authorization_endpoint,
            &self.token_endpoint,
            &self.device_authorization_endpoint,
            &self.introspection_endpoint,
            &self.pushed_authorization_request_endpoint,
        ];
        for endpoint in endpoints.into_iter().flatten() {
            validate_url(endpoint)?;
        }

        let auth_method = self.auth_method.unwrap_or(if self.client_secret.is_some() {
            AuthMethod::Basic
        } else {
            AuthMethod::None
        });

        Ok(OAuth2Config {
            credentials: ClientCredentials {
                client_id,
                client_secret: self.client_secret,
                auth_method,
            },
            provider: ProviderConfig {
                issuer: self.issuer.unwrap_or_default(),
                discovery_endpoint: self.discovery_endpoint,
                authorization_endpoint: self.authorization_endpoint.unwrap_or_default(),
                token_endpoint: self.token_endpoint.unwrap_or_default(),
                device_authorization_endpoint: self.device_authorization_endpoint,
                introspection_endpoint: self.introspection_endpoint,
                pushed_authorization_request_endpoint: self.pushed_authorization_request_endpoint,
            },
            timeout: self
                .timeout
                .unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
            skip_tls_verify: self.skip_tls_verify,
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn validate_url(value: &str) -> Result<(), ConfigurationError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigurationError::InvalidEndpoint {
            url: value.to_string(),
            message: e.to_string(),
        })
}

/// Create a new OAuth2 configuration builder.
pub fn oauth2_config() -> OAuth2ConfigBuilder {
    OAuth2ConfigBuilder::new()
}
