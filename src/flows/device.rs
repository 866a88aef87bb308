//! Device Authorization Flow
//!
//! RFC 8628 - OAuth 2.0 Device Authorization Grant.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{DevicePoller, Flow};
use crate::builders::token_request;
use crate::client::OidcClient;
use crate::core::{BrowserLauncher, HttpTransport, SystemBrowserLauncher};
use crate::error::{OAuth2Result, ResultExt};
use crate::types::{DeviceAuthorizationRequest, TokenResponse};

/// Device Authorization Flow settings.
#[derive(Debug, Clone)]
pub struct DeviceFlowConfig {
    /// Space separated scope.
    pub scope: String,
}

impl Default for DeviceFlowConfig {
    fn default() -> Self {
        Self {
            scope: "openid".to_string(),
        }
    }
}

/// Device Authorization Flow.
pub struct DeviceFlow<T: HttpTransport> {
    client: Arc<OidcClient<T>>,
    config: DeviceFlowConfig,
    browser: Arc<dyn BrowserLauncher>,
}

impl<T: HttpTransport> DeviceFlow<T> {
    /// Create new Device Authorization Flow.
    pub fn new(client: Arc<OidcClient<T>>, config: DeviceFlowConfig) -> Self {
        Self {
            client,
            config,
            browser: Arc::new(SystemBrowserLauncher),
        }
    }

    /// Replace the browser launcher.
    pub fn with_browser_launcher(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }
}

#[async_trait]
impl<T: HttpTransport> Flow for DeviceFlow<T> {
    async fn run(&self, cancel: CancellationToken) -> OAuth2Result<TokenResponse> {
        let config = self.client.config();
        let endpoint = config
            .provider
            .device_authorization_endpoint
            .as_deref()
            .unwrap_or_default();

        let request = DeviceAuthorizationRequest {
            client_id: config.credentials.client_id.clone(),
            scope: self.config.scope.clone(),
            ..Default::default()
        };
        let authorization = self
            .client
            .request_device_authorization(&cancel, endpoint, &request)
            .await
            .context("device authorization")?;

        match authorization.verification_uri_complete.as_deref() {
            Some(uri) if !uri.is_empty() => info!("device verification uri: {}", uri),
            _ => info!(
                "device verification uri: {}, verification code: {}",
                authorization.verification_uri, authorization.user_code
            ),
        }
        if let Err(e) = self.browser.open_url(authorization.verification_target()) {
            warn!(error = %e, "unable to open browser, visit the verification uri to continue");
        }

        let token_request =
            token_request::device_code(&config.credentials, &authorization.device_code);
        DevicePoller::new(
            &self.client,
            &config.provider.token_endpoint,
            &token_request,
            authorization.polling_interval(),
        )
        .poll(&cancel)
        .await
        .context("polling token request failed")
    }
}
