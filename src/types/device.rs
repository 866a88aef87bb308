//! Device Authorization Types
//!
//! Types for OAuth2 Device Authorization Flow (RFC 8628).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default polling interval in seconds (RFC 8628 section 3.2).
pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 5;

/// Polling interval increase on `slow_down` (RFC 8628 section 3.5).
pub const SLOW_DOWN_INCREMENT_SECS: u64 = 5;

/// Device authorization request.
#[derive(Clone, Debug, Default)]
pub struct DeviceAuthorizationRequest {
    /// Client identifier.
    pub client_id: String,
    /// Requested scope.
    pub scope: String,
    /// PKCE challenge, for servers that accept it on this endpoint.
    pub code_challenge: String,
    /// PKCE challenge method.
    pub code_challenge_method: String,
}

/// Device authorization response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceAuthorizationResponse {
    /// Device verification code (not shown to user).
    pub device_code: String,
    /// User code to display.
    pub user_code: String,
    /// URI for user to visit.
    pub verification_uri: String,
    /// URI with code pre-filled (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_uri_complete: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: i64,
    /// Minimum polling interval in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
}

impl DeviceAuthorizationResponse {
    /// Initial polling interval. Absent, zero and negative values fall back
    /// to the RFC 8628 default.
    pub fn polling_interval(&self) -> Duration {
        match self.interval {
            Some(secs) if secs > 0 => Duration::from_secs(secs as u64),
            _ => Duration::from_secs(DEFAULT_POLLING_INTERVAL_SECS),
        }
    }

    /// The URI to present to the user, preferring the pre-filled variant.
    pub fn verification_target(&self) -> &str {
        match self.verification_uri_complete.as_deref() {
            Some(uri) if !uri.is_empty() => uri,
            _ => &self.verification_uri,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_authorization_response() {
        let json = r#"{
            "device_code": "dev123",
            "user_code": "ABCD-1234",
            "verification_uri": "https://example.com/device",
            "verification_uri_complete": "https://example.com/device?user_code=ABCD-1234",
            "expires_in": 1800,
            "interval": 7
        }"#;

        let response: DeviceAuthorizationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.device_code, "dev123");
        assert_eq!(response.user_code, "ABCD-1234");
        assert_eq!(response.expires_in, 1800);
        assert_eq!(response.polling_interval(), Duration::from_secs(7));
        assert_eq!(
            response.verification_target(),
            "https://example.com/device?user_code=ABCD-1234"
        );
    }

    #[test]
    fn test_device_authorization_response_defaults() {
        let json = r#"{
            "device_code": "dev123",
            "user_code": "ABCD-1234",
            "verification_uri": "https://example.com/device",
            "expires_in": 1800
        }"#;

        let response: DeviceAuthorizationResponse = serde_json::from_str(json).unwrap();
        assert!(response.verification_uri_complete.is_none());
        assert!(response.interval.is_none());
        assert_eq!(response.polling_interval(), Duration::from_secs(5));
        assert_eq!(response.verification_target(), "https://example.com/device");
    }

    #[test]
    fn test_non_positive_interval_defaults() {
        for interval in [0, -3] {
            let response = DeviceAuthorizationResponse {
                device_code: "d".to_string(),
                user_code: "u".to_string(),
                verification_uri: "https://example.com/device".to_string(),
                verification_uri_complete: None,
                expires_in: 600,
                interval: Some(interval),
            };
            assert_eq!(response.polling_interval(), Duration::from_secs(5));
        }
    }
}
