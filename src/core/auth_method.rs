//! Client Authentication
//!
//! Applies client credentials to an outgoing token endpoint request.

use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{BTreeMap, HashMap};

use crate::types::AuthMethod;

/// Inject client credentials into the request parameters or headers.
///
/// Basic never adds body credentials and Post/None never add an
/// `Authorization` header.
pub fn apply(
    auth_method: AuthMethod,
    client_id: &str,
    client_secret: Option<&SecretString>,
    params: &mut BTreeMap<String, String>,
    headers: &mut HashMap<String, String>,
) {
    match auth_method {
        AuthMethod::Basic => {
            let secret = client_secret.map(|s| s.expose_secret().as_str()).unwrap_or("");
            let credentials = format!("{}:{}", client_id, secret);
            let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
            headers.insert("authorization".to_string(), format!("Basic {}", encoded));
        }
        AuthMethod::Post => {
            params.insert("client_id".to_string(), client_id.to_string());
            if let Some(secret) = client_secret.filter(|s| !s.expose_secret().is_empty()) {
                params.insert("client_secret".to_string(), secret.expose_secret().clone());
            }
        }
        AuthMethod::None => {
            params.insert("client_id".to_string(), client_id.to_string());
        }
    }
}
