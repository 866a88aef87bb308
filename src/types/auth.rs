//! Authorization Types
//!
//! Types for the authorization code flow.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

/// Authorization request sent through the user's browser.
///
/// Every optional field is sent only when non-empty.
#[derive(Clone, Debug, Default)]
pub struct AuthorizationCodeRequest {
    /// Client identifier (required).
    pub client_id: String,
    /// Redirect URI.
    pub redirect_uri: String,
    /// Requested scope.
    pub scope: String,
    /// CSRF state. Empty disables state validation on the callback.
    pub state: String,
    /// Prompt behavior (`login`, `consent`, `select_account`, `none`).
    pub prompt: String,
    /// Requested authentication context class references.
    pub acr_values: String,
    /// Login hint for pre-filling user identity.
    pub login_hint: String,
    /// Maximum authentication age in seconds.
    pub max_age: String,
    /// Preferred UI locales.
    pub ui_locales: String,
    /// PKCE challenge method.
    pub code_challenge_method: String,
    /// PKCE challenge.
    pub code_challenge: String,
    /// Pushed authorization request handle.
    pub request_uri: String,
    /// Caller-supplied extension parameters, applied last.
    pub custom_args: CustomArgs,
}

impl AuthorizationCodeRequest {
    /// Query parameters for the authorization URL.
    pub fn to_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("response_type".to_string(), "code".to_string());
        params.insert("client_id".to_string(), self.client_id.clone());

        let optional = [
            ("state", &self.state),
            ("redirect_uri", &self.redirect_uri),
            ("scope", &self.scope),
            ("prompt", &self.prompt),
            ("acr_values", &self.acr_values),
            ("login_hint", &self.login_hint),
            ("max_age", &self.max_age),
            ("ui_locales", &self.ui_locales),
            ("code_challenge_method", &self.code_challenge_method),
            ("code_challenge", &self.code_challenge),
            ("request_uri", &self.request_uri),
        ];
        for (key, value) in optional {
            if !value.is_empty() {
                params.insert(key.to_string(), value.clone());
            }
        }

        for (key, value) in self.custom_args.iter() {
            params.insert(key.clone(), value.clone());
        }

        params
    }
}

/// Result of a validated authorization callback.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorizationCodeResponse {
    /// Authorization code.
    pub code: String,
    /// Echoed state; empty when the request carried none.
    pub state: String,
}

/// Extension parameters given as `key=value` strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CustomArgs(BTreeMap<String, String>);

impl CustomArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one `key=value` entry and add it. Later entries replace earlier
    /// ones with the same key.
    pub fn set(&mut self, arg: &str) -> Result<(), ConfigurationError> {
        let (key, value) = arg.split_once('=').ok_or_else(|| ConfigurationError::InvalidConfig {
            message: format!("invalid custom argument {:?}, expected key=value", arg),
        })?;
        if key.is_empty() {
            return Err(ConfigurationError::InvalidConfig {
                message: format!("invalid custom argument {:?}, key is empty", arg),
            });
        }
        self.0.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Add a parameter directly.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromStr for CustomArgs {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut args = Self::new();
        args.set(s)?;
        Ok(args)
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for CustomArgs {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// PKCE challenge method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PkceMethod {
    /// SHA-256 hash (recommended).
    #[default]
    S256,
    /// Plain text (not recommended).
    Plain,
}

impl PkceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

/// PKCE parameters.
#[derive(Clone)]
pub struct PkceParams {
    /// Code verifier (keep secret).
    pub code_verifier: String,
    /// Code challenge (sent in authorization URL).
    pub code_challenge: String,
    /// Challenge method used.
    pub code_challenge_method: PkceMethod,
}

impl fmt::Debug for PkceParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceParams")
            .field("code_verifier", &"[REDACTED]")
            .field("code_challenge", &self.code_challenge)
            .field("code_challenge_method", &self.code_challenge_method)
            .finish()
    }
}
