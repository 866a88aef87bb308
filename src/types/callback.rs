//! Callback Types
//!
//! Types for handling authorization redirects.

use url::{form_urlencoded, Url};

/// Parameters delivered to the local redirect listener.
///
/// Missing parameters are empty strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackResponse {
    /// Authorization code (empty on error).
    pub code: String,
    /// State parameter.
    pub state: String,
    /// Error code.
    pub error: String,
    /// Error description.
    pub error_description: String,
}

impl CallbackResponse {
    /// Parse callback parameters from a raw query string.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "code" => params.code = value.into_owned(),
                "state" => params.state = value.into_owned(),
                "error" => params.error = value.into_owned(),
                "error_description" => params.error_description = value.into_owned(),
                _ => {}
            }
        }

        params
    }

    /// Parse callback parameters from URL.
    pub fn from_url(url: &Url) -> Self {
        Self::from_query(url.query().unwrap_or_default())
    }

    /// Check if callback contains an error.
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_from_url() {
        let url = Url::parse("http://localhost:9555/callback?code=abc123&state=xyz789").unwrap();
        let params = CallbackResponse::from_url(&url);

        assert_eq!(params.code, "abc123");
        assert_eq!(params.state, "xyz789");
        assert!(params.error.is_empty());
        assert!(!params.is_error());
    }

    #[test]
    fn test_callback_error() {
        let params = CallbackResponse::from_query(
            "error=access_denied&error_description=User%20denied&state=s",
        );

        assert!(params.code.is_empty());
        assert_eq!(params.error, "access_denied");
        assert_eq!(params.error_description, "User denied");
        assert!(params.is_error());
    }

    #[test]
    fn test_callback_without_query() {
        let url = Url::parse("http://localhost:9555/callback").unwrap();
        assert_eq!(CallbackResponse::from_url(&url), CallbackResponse::default());
    }
}
