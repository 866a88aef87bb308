//! Device Polling
//!
//! Polls the token endpoint for a device code grant (RFC 8628 section 3.4).
//! Attempts are strictly sequential; the wait between them is cancellable.

use std::collections::HashMap;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::OidcClient;
use crate::core::{ClassifiedResponse, HttpTransport};
use crate::error::{OAuth2Error, OAuth2Result};
use crate::types::{TokenRequest, TokenResponse, SLOW_DOWN_INCREMENT_SECS};

/// What to do after one polling attempt.
#[derive(Debug)]
pub enum PollStep {
    /// The user approved; stop with the token response.
    Complete(TokenResponse),
    /// Keep polling after waiting this long.
    Retry(Duration),
    /// Stop with this error.
    Fatal(OAuth2Error),
}

impl PollStep {
    /// Decide the next step from an attempt's outcome and the current interval.
    ///
    /// `slow_down` raises the interval for this and every later wait.
    pub fn after(classified: ClassifiedResponse, interval: Duration) -> Self {
        match classified.oauth_error_code() {
            Some("authorization_pending") => return Self::Retry(interval),
            Some("slow_down") => {
                return Self::Retry(interval + Duration::from_secs(SLOW_DOWN_INCREMENT_SECS))
            }
            _ => {}
        }

        match classified.into_result() {
            Ok(token) => Self::Complete(token),
            Err(e) => Self::Fatal(e),
        }
    }
}

/// Drives the polling loop for one device code.
pub struct DevicePoller<'a, T: HttpTransport> {
    client: &'a OidcClient<T>,
    endpoint: &'a str,
    request: &'a TokenRequest,
    interval: Duration,
}

impl<'a, T: HttpTransport> DevicePoller<'a, T> {
    /// Poll `endpoint` with `request`, starting at `interval`.
    pub fn new(
        client: &'a OidcClient<T>,
        endpoint: &'a str,
        request: &'a TokenRequest,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            endpoint,
            request,
            interval,
        }
    }

    /// Poll until the grant completes, fails, or `cancel` fires.
    ///
    /// The first attempt is sent immediately.
    pub async fn poll(mut self, cancel: &CancellationToken) -> OAuth2Result<TokenResponse> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let classified = self
                .client
                .execute_token_request(cancel, self.endpoint, self.request, HashMap::new())
                .await?;

            match PollStep::after(classified, self.interval) {
                PollStep::Complete(token) => {
                    info!(attempt, "device authorization granted");
                    return Ok(token);
                }
                PollStep::Fatal(e) => return Err(e),
                PollStep::Retry(next) => {
                    if next != self.interval {
                        debug!(
                            from = self.interval.as_secs(),
                            to = next.as_secs(),
                            "server asked to slow down"
                        );
                    }
                    self.interval = next;
                    debug!(attempt, interval = self.interval.as_secs(), "authorization pending");

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(OAuth2Error::Cancelled),
                        _ = tokio::time::sleep(self.interval) => {}
                    }
                }
            }
        }
    }
}
