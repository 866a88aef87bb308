//! Configuration Types
//!
//! OAuth2 client configuration types.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigurationError;

/// OAuth2 client configuration.
#[derive(Clone, Debug)]
pub struct OAuth2Config {
    /// Provider configuration.
    pub provider: ProviderConfig,
    /// Client credentials.
    pub credentials: ClientCredentials,
    /// HTTP timeout.
    pub timeout: Duration,
    /// Accept any TLS certificate presented by the provider.
    pub skip_tls_verify: bool,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            credentials: ClientCredentials::default(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            skip_tls_verify: false,
        }
    }
}

impl OAuth2Config {
    /// Fill endpoints that were not explicitly configured from a discovery
    /// document. Explicit endpoints always win.
    pub fn apply_discovery(&mut self, document: &DiscoveryDocument) {
        let provider = &mut self.provider;
        fill(&mut provider.authorization_endpoint, &document.authorization_endpoint);
        fill(&mut provider.token_endpoint, &document.token_endpoint);
        fill_opt(
            &mut provider.device_authorization_endpoint,
            &document.device_authorization_endpoint,
        );
        fill_opt(&mut provider.introspection_endpoint, &document.introspection_endpoint);
        fill_opt(
            &mut provider.pushed_authorization_request_endpoint,
            &document.pushed_authorization_request_endpoint,
        );
    }
}

fn fill(target: &mut String, discovered: &str) {
    if target.is_empty() {
        *target = discovered.to_string();
    }
}

fn fill_opt(target: &mut Option<String>, discovered: &Option<String>) {
    if target.as_deref().map_or(true, str::is_empty) {
        *target = discovered.clone();
    }
}

/// OAuth2 provider endpoint configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Issuer identifier.
    #[serde(default)]
    pub issuer: String,
    /// Explicit discovery document URL (overrides the issuer well-known URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_endpoint: Option<String>,
    /// Authorization endpoint URL.
    #[serde(default)]
    pub authorization_endpoint: String,
    /// Token endpoint URL.
    #[serde(default)]
    pub token_endpoint: String,
    /// Device authorization endpoint (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_authorization_endpoint: Option<String>,
    /// Token introspection endpoint (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introspection_endpoint: Option<String>,
    /// Pushed authorization request endpoint (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushed_authorization_request_endpoint: Option<String>,
}

impl ProviderConfig {
    /// URL of the discovery document for this provider.
    pub fn discovery_url(&self) -> Option<String> {
        if let Some(url) = self.discovery_endpoint.as_ref().filter(|u| !u.is_empty()) {
            return Some(url.clone());
        }
        if self.issuer.is_empty() {
            return None;
        }
        Some(format!(
            "{}/.well-known/openid-configuration",
            self.issuer.trim_end_matches('/')
        ))
    }
}

/// Client credentials for OAuth2 authentication.
#[derive(Clone, Default)]
pub struct ClientCredentials {
    /// Client identifier.
    pub client_id: String,
    /// Client secret (for confidential clients).
    pub client_secret: Option<SecretString>,
    /// Client authentication method.
    pub auth_method: AuthMethod,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_method", &self.auth_method)
            .finish()
    }
}

/// How client credentials are presented to the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// HTTP Basic Authentication header.
    #[default]
    #[serde(rename = "client_secret_basic")]
    Basic,
    /// client_id and client_secret in request body.
    #[serde(rename = "client_secret_post")]
    Post,
    /// Public client: client_id in request body only.
    None,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "client_secret_basic",
            Self::Post => "client_secret_post",
            Self::None => "none",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client_secret_basic" => Ok(Self::Basic),
            "client_secret_post" => Ok(Self::Post),
            "none" => Ok(Self::None),
            other => Err(ConfigurationError::InvalidConfig {
                message: format!(
                    "invalid auth method {:?}, expected client_secret_basic, client_secret_post or none",
                    other
                ),
            }),
        }
    }
}

/// Grant type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantType {
    #[serde(rename = "authorization_code")]
    AuthorizationCode,
    #[serde(rename = "client_credentials")]
    ClientCredentials,
    #[serde(rename = "refresh_token")]
    RefreshToken,
    #[serde(rename = "urn:ietf:params:oauth:grant-type:device_code")]
    DeviceCode,
    #[serde(rename = "urn:ietf:params:oauth:grant-type:token-exchange")]
    TokenExchange,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
            Self::DeviceCode => "urn:ietf:params:oauth:grant-type:device_code",
            Self::TokenExchange => "urn:ietf:params:oauth:grant-type:token-exchange",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OIDC Discovery document (the subset this client consumes).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    /// Issuer identifier.
    #[serde(default)]
    pub issuer: String,
    /// Authorization endpoint URL.
    #[serde(default)]
    pub authorization_endpoint: String,
    /// Token endpoint URL.
    #[serde(default)]
    pub token_endpoint: String,
    /// Device authorization endpoint (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_authorization_endpoint: Option<String>,
    /// Introspection endpoint (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introspection_endpoint: Option<String>,
    /// Pushed authorization request endpoint (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushed_authorization_request_endpoint: Option<String>,
}

/// Default configuration values.
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_type_as_str() {
        assert_eq!(GrantType::AuthorizationCode.as_str(), "authorization_code");
        assert_eq!(GrantType::ClientCredentials.as_str(), "client_credentials");
        assert_eq!(GrantType::RefreshToken.as_str(), "refresh_token");
        assert_eq!(
            GrantType::DeviceCode.as_str(),
            "urn:ietf:params:oauth:grant-type:device_code"
        );
        assert_eq!(
            GrantType::TokenExchange.as_str(),
            "urn:ietf:params:oauth:grant-type:token-exchange"
        );
    }

    #[test]
    fn test_auth_method_from_str() {
        assert_eq!("client_secret_basic".parse::<AuthMethod>().unwrap(), AuthMethod::Basic);
        assert_eq!("client_secret_post".parse::<AuthMethod>().unwrap(), AuthMethod::Post);
        assert_eq!("none".parse::<AuthMethod>().unwrap(), AuthMethod::None);
        assert!("private_key_jwt".parse::<AuthMethod>().is_err());
    }

    #[test]
    fn test_apply_discovery_keeps_explicit_endpoints() {
        let mut config = OAuth2Config::default();
        config.provider.token_endpoint = "https://override.example.com/token".to_string();

        let document = DiscoveryDocument {
            issuer: "https://example.com".to_string(),
            authorization_endpoint: "https://example.com/authorize".to_string(),
            token_endpoint: "https://example.com/token".to_string(),
            device_authorization_endpoint: Some("https://example.com/device".to_string()),
            introspection_endpoint: None,
            pushed_authorization_request_endpoint: None,
        };
        config.apply_discovery(&document);

        assert_eq!(config.provider.authorization_endpoint, "https://example.com/authorize");
        assert_eq!(config.provider.token_endpoint, "https://override.example.com/token");
        assert_eq!(
            config.provider.device_authorization_endpoint.as_deref(),
            Some("https://example.com/device")
        );
        assert!(config.provider.introspection_endpoint.is_none());
    }

    #[test]
    fn test_discovery_url() {
        let mut provider = ProviderConfig {
            issuer: "https://example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            provider.discovery_url().as_deref(),
            Some("https://example.com/.well-known/openid-configuration")
        );

        provider.discovery_endpoint = Some("https://other.example.com/disco".to_string());
        assert_eq!(
            provider.discovery_url().as_deref(),
            Some("https://other.example.com/disco")
        );

        assert!(ProviderConfig::default().discovery_url().is_none());
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let credentials = ClientCredentials {
            client_id: "client".to_string(),
            client_secret: Some(SecretString::new("hunter2".to_string())),
            auth_method: AuthMethod::Post,
        };
        let rendered = format!("{:?}", credentials);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("hunter2"));
    }
}
