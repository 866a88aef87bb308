//! Introspection Types
//!
//! Types for OAuth2 Token Introspection (RFC 7662).

use serde::{Deserialize, Serialize};

use super::CustomArgs;

/// Token introspection request.
#[derive(Clone, Debug, Default)]
pub struct IntrospectionRequest {
    /// Token to introspect.
    pub token: String,
    /// Token type hint (`access_token`, `refresh_token`, ...). Sent only if non-empty.
    pub token_type_hint: String,
    /// Bearer token authenticating the caller. When empty the client
    /// credentials are used instead.
    pub bearer_token: String,
    /// Custom `Accept` header value.
    pub accept: String,
    /// Extra body parameters.
    pub custom_args: CustomArgs,
}

/// Token type hint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTypeHint {
    AccessToken,
    RefreshToken,
}

impl TokenTypeHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }
}
