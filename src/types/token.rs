//! Token Types
//!
//! Token endpoint request and response types.

use secrecy::SecretString;
use std::collections::BTreeMap;
use std::fmt;

use super::{AuthMethod, ClientCredentials, GrantType};

/// Token endpoint response.
///
/// Returned to the caller verbatim; keys depend on the grant and provider.
pub type TokenResponse = serde_json::Map<String, serde_json::Value>;

/// A single token endpoint request.
///
/// Parameters live in a sorted map so the encoded body is identical for
/// identical inputs. Client credentials are not part of `params`; they are
/// applied by the auth method strategy when the request is sent.
#[derive(Clone)]
pub struct TokenRequest {
    /// Grant type.
    pub grant_type: GrantType,
    /// Client identifier.
    pub client_id: String,
    /// Client secret.
    pub client_secret: Option<SecretString>,
    /// Client authentication method.
    pub auth_method: AuthMethod,
    /// Grant-specific parameters, excluding `grant_type`.
    pub params: BTreeMap<String, String>,
}

impl TokenRequest {
    /// Create an empty request for a grant using the given credentials.
    pub fn new(grant_type: GrantType, credentials: &ClientCredentials) -> Self {
        Self {
            grant_type,
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            auth_method: credentials.auth_method,
            params: BTreeMap::new(),
        }
    }

    /// Get a parameter value.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Check whether a parameter is present.
    pub fn has_param(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_method", &self.auth_method)
            .field("params", &self.params.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Token exchange input (RFC 8693).
#[derive(Clone, Debug, Default)]
pub struct TokenExchangeInput {
    /// Token being exchanged.
    pub subject_token: String,
    /// Type of the subject token.
    pub subject_token_type: String,
    /// Target resource URI.
    pub resource: String,
    /// Target audience.
    pub audience: String,
    /// Requested scope.
    pub scope: String,
    /// Requested token type.
    pub requested_token_type: String,
    /// Token representing the acting party.
    pub actor_token: String,
    /// Type of the actor token.
    pub actor_token_type: String,
}

/// Default subject token type for token exchange.
pub const ACCESS_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:access_token";
