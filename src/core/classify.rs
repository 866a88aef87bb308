//! Response Classification
//!
//! Maps one HTTP exchange to exactly one outcome. The same policy applies to
//! token, device authorization, PAR and introspection responses.

use crate::core::transport::HttpResponse;
use crate::error::{OAuth2Error, OAuth2Result, ProtocolError};
use crate::types::TokenResponse;

/// Outcome of a single exchange with an authorization server endpoint.
#[derive(Debug)]
pub enum ClassifiedResponse {
    /// 2xx with a JSON object body.
    Success(TokenResponse),
    /// Non-2xx with a standard `error` field.
    OAuthError {
        error: String,
        error_description: Option<String>,
        status: u16,
        body: String,
    },
    /// Non-2xx without a recognizable OAuth2 error body.
    HttpFailure { status: u16, body: String },
    /// No response was received.
    Transport(OAuth2Error),
    /// The body was not a JSON object, whatever the status.
    JsonParsing { message: String, status: u16 },
}

impl ClassifiedResponse {
    /// Classify the outcome of a transport call.
    pub fn classify(outcome: Result<HttpResponse, OAuth2Error>) -> Self {
        match outcome {
            Ok(response) => Self::from_response(&response),
            Err(e) => Self::Transport(e),
        }
    }

    /// Classify a received response.
    pub fn from_response(response: &HttpResponse) -> Self {
        let decoded: TokenResponse = match serde_json::from_str(&response.body) {
            Ok(map) => map,
            Err(e) => {
                return Self::JsonParsing {
                    message: e.to_string(),
                    status: response.status,
                }
            }
        };

        if response.is_success() {
            return Self::Success(decoded);
        }

        match decoded.get("error").and_then(|v| v.as_str()) {
            Some(error) => Self::OAuthError {
                error: error.to_string(),
                error_description: decoded
                    .get("error_description")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                status: response.status,
                body: response.body.clone(),
            },
            None => Self::HttpFailure {
                status: response.status,
                body: response.body.clone(),
            },
        }
    }

    /// The OAuth2 `error` code, if this is a protocol error.
    pub fn oauth_error_code(&self) -> Option<&str> {
        match self {
            Self::OAuthError { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Convert into the decoded body or the matching error.
    pub fn into_result(self) -> OAuth2Result<TokenResponse> {
        match self {
            Self::Success(body) => Ok(body),
            Self::OAuthError {
                error,
                error_description,
                status,
                body,
            } => Err(ProtocolError::OAuth {
                error,
                error_description,
                status,
                body,
            }
            .into()),
            Self::HttpFailure { status, body } => {
                Err(ProtocolError::HttpFailure { status, body }.into())
            }
            Self::Transport(e) => Err(e),
            Self::JsonParsing { message, .. } => Err(ProtocolError::InvalidJson { message }.into()),
        }
    }
}
