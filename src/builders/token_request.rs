//! Token Request Builders
//!
//! One constructor per grant. Required parameters are always set, optional
//! ones only when non-empty. Builders perform no validation or I/O.

use crate::types::{ClientCredentials, GrantType, TokenExchangeInput, TokenRequest};

/// Fluent builder for a single token request.
pub struct TokenRequestBuilder {
    request: TokenRequest,
}

impl TokenRequestBuilder {
    /// Start a request for `grant_type`.
    pub fn new(grant_type: GrantType, credentials: &ClientCredentials) -> Self {
        Self {
            request: TokenRequest::new(grant_type, credentials),
        }
    }

    /// Set a required parameter.
    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.request.params.insert(key.to_string(), value.into());
        self
    }

    /// Set a parameter only if `value` is non-empty.
    pub fn optional_param(self, key: &str, value: &str) -> Self {
        if value.is_empty() {
            self
        } else {
            self.param(key, value)
        }
    }

    pub fn build(self) -> TokenRequest {
        self.request
    }
}

/// Authorization code grant (RFC 6749 section 4.1.3).
pub fn authorization_code(
    credentials: &ClientCredentials,
    code: &str,
    redirect_uri: &str,
    code_verifier: &str,
) -> TokenRequest {
    TokenRequestBuilder::new(GrantType::AuthorizationCode, credentials)
        .param("code", code)
        .param("redirect_uri", redirect_uri)
        .optional_param("code_verifier", code_verifier)
        .build()
}

/// Refresh token grant (RFC 6749 section 6).
pub fn refresh_token(credentials: &ClientCredentials, refresh_token: &str, scope: &str) -> TokenRequest {
    TokenRequestBuilder::new(GrantType::RefreshToken, credentials)
        .param("refresh_token", refresh_token)
        .optional_param("scope", scope)
        .build()
}

/// Client credentials grant (RFC 6749 section 4.4).
pub fn client_credentials(credentials: &ClientCredentials, scope: &str) -> TokenRequest {
    TokenRequestBuilder::new(GrantType::ClientCredentials, credentials)
        .optional_param("scope", scope)
        .build()
}

/// Device code grant (RFC 8628 section 3.4).
pub fn device_code(credentials: &ClientCredentials, device_code: &str) -> TokenRequest {
    TokenRequestBuilder::new(GrantType::DeviceCode, credentials)
        .param("device_code", device_code)
        .build()
}

/// Token exchange grant (RFC 8693 section 2.1).
pub fn token_exchange(credentials: &ClientCredentials, input: &TokenExchangeInput) -> TokenRequest {
    TokenRequestBuilder::new(GrantType::TokenExchange, credentials)
        .param("subject_token", input.subject_token.as_str())
        .param("subject_token_type", input.subject_token_type.as_str())
        .optional_param("resource", &input.resource)
        .optional_param("audience", &input.audience)
        .optional_param("scope", &input.scope)
        .optional_param("requested_token_type", &input.requested_token_type)
        .optional_param("actor_token", &input.actor_token)
        .optional_param("actor_token_type", &input.actor_token_type)
        .build()
}
