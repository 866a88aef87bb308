//! OAuth2 Error Types
//!
//! Error hierarchy for the token-acquisition engine. Every failure a flow can
//! hit maps to exactly one leaf variant; [`OAuth2Error::Context`] wraps a leaf
//! with the name of the step that produced it.

use std::time::Duration;
use thiserror::Error;

/// Root error type.
#[derive(Error, Debug)]
pub enum OAuth2Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("transport error: {0}")]
    Network(#[from] NetworkError),

    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Authorization(#[from] AuthorizationError),

    #[error("callback error: {0}")]
    Callback(#[from] CallbackError),

    #[error("dpop error: {0}")]
    Dpop(#[from] DpopError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<OAuth2Error>,
    },
}

impl OAuth2Error {
    /// Wrap this error with the name of the step that failed.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context wrappers.
    pub fn root(&self) -> &OAuth2Error {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Get error code for diagnostics.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "OAUTH2_CONFIG",
            Self::Network(_) => "OAUTH2_TRANSPORT",
            Self::Protocol(ProtocolError::OAuth { .. }) => "OAUTH2_PROTOCOL",
            Self::Protocol(ProtocolError::HttpFailure { .. }) => "OAUTH2_HTTP",
            Self::Protocol(_) => "OAUTH2_RESPONSE",
            Self::Authorization(_) => "OAUTH2_AUTH",
            Self::Callback(_) => "OAUTH2_CALLBACK",
            Self::Dpop(_) => "OAUTH2_DPOP",
            Self::Cancelled => "OAUTH2_CANCELLED",
            Self::Context { source, .. } => source.error_code(),
        }
    }

    /// Whether the flow was cancelled rather than failing.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }

    /// The OAuth2 `error` code carried by a protocol error, if any.
    pub fn oauth_error_code(&self) -> Option<&str> {
        match self.root() {
            Self::Protocol(ProtocolError::OAuth { error, .. }) => Some(error.as_str()),
            _ => None,
        }
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("invalid endpoint URL {url}: {message}")]
    InvalidEndpoint { url: String, message: String },

    #[error("discovery failed: {message}")]
    DiscoveryFailed { message: String },

    #[error("failed to read key material from {path}: {message}")]
    KeyMaterial { path: String, message: String },
}

/// Network/transport error. Raised before any HTTP response was received.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("failed to build HTTP client: {message}")]
    ClientBuild { message: String },

    #[error("failed to read response body: {message}")]
    BodyRead { message: String },
}

/// Response classification error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The server answered with a standard OAuth2 `error` body.
    #[error("oauth2 error: {error}{} (HTTP {status})", format_description(.error_description))]
    OAuth {
        error: String,
        error_description: Option<String>,
        status: u16,
        body: String,
    },

    /// Non-2xx status without a recognizable OAuth2 error body.
    #[error("http failure: status {status}, body: {body}")]
    HttpFailure { status: u16, body: String },

    #[error("failed to parse JSON response: {message}")]
    InvalidJson { message: String },

    #[error("response too large: {size} bytes")]
    ResponseTooLarge { size: usize },
}

fn format_description(description: &Option<String>) -> String {
    match description {
        Some(d) if !d.is_empty() => format!(": {}", d),
        _ => String::new(),
    }
}

/// Authorization-code flow error.
#[derive(Error, Debug)]
pub enum AuthorizationError {
    #[error("state mismatch: expected {expected:?} but got {received:?}")]
    StateMismatch { expected: String, received: String },

    #[error("authorization failed with error {error} and description {error_description}")]
    MissingAuthorizationCode {
        error: String,
        error_description: String,
    },

    #[error("invalid authorization request: {message}")]
    InvalidRequest { message: String },
}

/// Local callback listener error.
#[derive(Error, Debug)]
pub enum CallbackError {
    #[error("callback server failed to start: {message}")]
    Startup { message: String },

    #[error("no callback received within {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("callback listener failed: {message}")]
    Transport { message: String },
}

/// DPoP proof construction error.
#[derive(Error, Debug)]
pub enum DpopError {
    #[error("DPoP requested but no key material is configured")]
    NotConfigured,

    #[error("invalid DPoP key: {message}")]
    InvalidKey { message: String },

    #[error("failed to sign DPoP proof: {message}")]
    Signing { message: String },
}

/// Result type for OAuth2 operations.
pub type OAuth2Result<T> = Result<T, OAuth2Error>;

/// Extension for attaching step context to results.
pub trait ResultExt<T> {
    /// Wrap the error, if any, with the name of the failed step.
    fn context(self, context: &str) -> OAuth2Result<T>;
}

impl<T, E: Into<OAuth2Error>> ResultExt<T> for Result<T, E> {
    fn context(self, context: &str) -> OAuth2Result<T> {
        self.map_err(|e| e.into().context(context))
    }
}
