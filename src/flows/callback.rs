//! Callback Coordination
//!
//! Local redirect listener, authorization URL construction and callback
//! validation for the authorization code flow. Each capability is a trait
//! with a production implementation and a test double.

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::{BrowserLauncher, SystemBrowserLauncher};
use crate::error::{
    AuthorizationError, CallbackError, ConfigurationError, OAuth2Error, OAuth2Result,
};
use crate::types::{AuthorizationCodeRequest, AuthorizationCodeResponse, CallbackResponse};

/// Window in which the listener must report that it is bound.
pub const SERVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Default wait for the browser to hit the callback.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const MAX_REQUEST_HEAD: usize = 8192;
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

const SUCCESS_HTML: &str = "<html><body><h1>Authorization complete</h1><p>You may close this window and return to the terminal.</p></body></html>";
const ERROR_HTML: &str = "<html><body><h1>Authorization failed</h1><p>You may close this window and return to the terminal.</p></body></html>";
const NOT_FOUND_HTML: &str = "<html><body><h1>Not found</h1></body></html>";
const METHOD_NOT_ALLOWED_HTML: &str = "<html><body><h1>Method not allowed</h1></body></html>";
const BAD_REQUEST_HTML: &str = "<html><body><h1>Bad request</h1></body></html>";

type Delivery = Result<CallbackResponse, CallbackError>;

/// A bound callback listener that delivers at most one response.
///
/// Dropping the server stops the listener.
pub struct CallbackServer {
    local_addr: Option<SocketAddr>,
    path: String,
    receiver: oneshot::Receiver<Delivery>,
    shutdown: CancellationToken,
}

impl CallbackServer {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Path the listener answers on.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Lifecycle of the local callback listener.
#[async_trait]
pub trait CallbackServerManager: Send + Sync {
    /// Bind a listener for `callback` and wait until it is ready.
    async fn start_server(
        &self,
        cancel: &CancellationToken,
        callback: &str,
    ) -> OAuth2Result<CallbackServer>;

    /// Wait for the single callback request, then release the listener.
    async fn wait_for_callback(
        &self,
        cancel: &CancellationToken,
        server: CallbackServer,
    ) -> OAuth2Result<CallbackResponse>;
}

/// Listener on the host, port and path of the redirect URI.
#[derive(Debug, Clone)]
pub struct DefaultCallbackServerManager {
    wait_timeout: Duration,
}

impl DefaultCallbackServerManager {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_CALLBACK_TIMEOUT)
    }

    /// Give up waiting for the callback after `wait_timeout`.
    pub fn with_timeout(wait_timeout: Duration) -> Self {
        Self { wait_timeout }
    }
}

impl Default for DefaultCallbackServerManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallbackServerManager for DefaultCallbackServerManager {
    async fn start_server(
        &self,
        cancel: &CancellationToken,
        callback: &str,
    ) -> OAuth2Result<CallbackServer> {
        if callback.is_empty() {
            return Err(startup_error("callback URL is required").into());
        }
        if cancel.is_cancelled() {
            return Err(OAuth2Error::Cancelled);
        }

        let target = CallbackTarget::parse(callback)?;
        let shutdown = cancel.child_token();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (delivery_tx, delivery_rx) = oneshot::channel();

        tokio::spawn(run_listener(
            target.clone(),
            shutdown.clone(),
            ready_tx,
            delivery_tx,
        ));

        let ready = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                shutdown.cancel();
                return Err(OAuth2Error::Cancelled);
            }
            ready = tokio::time::timeout(SERVER_STARTUP_TIMEOUT, ready_rx) => ready,
        };

        let local_addr = match ready {
            Ok(Ok(Ok(addr))) => addr,
            Ok(Ok(Err(message))) => return Err(startup_error(message).into()),
            Ok(Err(_)) => {
                return Err(startup_error("listener exited before becoming ready").into())
            }
            Err(_) => {
                shutdown.cancel();
                return Err(startup_error(format!(
                    "server startup timed out after {:?}",
                    SERVER_STARTUP_TIMEOUT
                ))
                .into());
            }
        };

        info!(addr = %local_addr, path = %target.path, "callback server listening");

        Ok(CallbackServer {
            local_addr: Some(local_addr),
            path: target.path,
            receiver: delivery_rx,
            shutdown,
        })
    }

    async fn wait_for_callback(
        &self,
        cancel: &CancellationToken,
        mut server: CallbackServer,
    ) -> OAuth2Result<CallbackResponse> {
        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(OAuth2Error::Cancelled),
            received = tokio::time::timeout(self.wait_timeout, &mut server.receiver) => received,
        };

        match received {
            Ok(Ok(delivery)) => Ok(delivery?),
            Ok(Err(_)) => Err(CallbackError::Transport {
                message: "listener stopped without a callback".to_string(),
            }
            .into()),
            Err(_) => Err(CallbackError::Timeout {
                timeout: self.wait_timeout,
            }
            .into()),
        }
    }
}

fn startup_error(message: impl Into<String>) -> CallbackError {
    CallbackError::Startup {
        message: message.into(),
    }
}

#[derive(Debug, Clone)]
struct CallbackTarget {
    host: String,
    port: u16,
    path: String,
}

impl CallbackTarget {
    fn parse(callback: &str) -> Result<Self, CallbackError> {
        let url = Url::parse(callback)
            .map_err(|e| startup_error(format!("invalid callback URL {}: {}", callback, e)))?;
        if url.scheme() != "http" {
            return Err(startup_error(format!(
                "callback URL must use http, got {}",
                url.scheme()
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| startup_error(format!("callback URL {} has no host", callback)))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let path = match url.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };

        Ok(Self {
            host,
            port: url.port_or_known_default().unwrap_or(80),
            path,
        })
    }
}

async fn run_listener(
    target: CallbackTarget,
    shutdown: CancellationToken,
    ready: oneshot::Sender<Result<SocketAddr, String>>,
    mut delivery: oneshot::Sender<Delivery>,
) {
    let bound = match TcpListener::bind((target.host.as_str(), target.port)).await {
        Ok(listener) => listener.local_addr().map(|addr| (listener, addr)),
        Err(e) => Err(e),
    };
    let listener = match bound {
        Ok((listener, addr)) => {
            if ready.send(Ok(addr)).is_err() {
                return;
            }
            listener
        }
        Err(e) => {
            let _ = ready.send(Err(format!(
                "failed to listen on {}:{}: {}",
                target.host, target.port, e
            )));
            return;
        }
    };

    // One task per connection. The first matching request wins and
    // dropping the set aborts the rest.
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            _ = delivery.closed() => return,
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                match joined {
                    Ok((_, Ok(Some(response)))) => {
                        let _ = delivery.send(Ok(response));
                        return;
                    }
                    Ok((_, Ok(None))) => {}
                    Ok((peer, Err(e))) => {
                        debug!(%peer, error = %e, "callback connection failed")
                    }
                    Err(e) => debug!(error = %e, "callback connection task failed"),
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let path = target.path.clone();
                    connections.spawn(async move {
                        (peer, handle_connection(stream, &path).await)
                    });
                }
                Err(e) => {
                    let _ = delivery.send(Err(CallbackError::Transport {
                        message: e.to_string(),
                    }));
                    return;
                }
            },
        }
    }
}

/// Serve one connection. Returns the callback if the request hit `path`.
async fn handle_connection(
    mut stream: TcpStream,
    path: &str,
) -> io::Result<Option<CallbackResponse>> {
    let head = tokio::time::timeout(REQUEST_READ_TIMEOUT, read_request_head(&mut stream))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "request head not received"))??;

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default();
    let target = request_line.next().unwrap_or_default();

    if method != "GET" {
        write_response(&mut stream, "405 Method Not Allowed", METHOD_NOT_ALLOWED_HTML).await?;
        return Ok(None);
    }

    let url = match Url::parse(&format!("http://localhost{}", target)) {
        Ok(url) if target.starts_with('/') => url,
        _ => {
            write_response(&mut stream, "400 Bad Request", BAD_REQUEST_HTML).await?;
            return Ok(None);
        }
    };

    if url.path() != path {
        debug!(path = url.path(), "ignoring request to unknown path");
        write_response(&mut stream, "404 Not Found", NOT_FOUND_HTML).await?;
        return Ok(None);
    }

    let response = CallbackResponse::from_url(&url);
    let page = if response.code.is_empty() {
        ERROR_HTML
    } else {
        SUCCESS_HTML
    };
    // Delivery does not depend on the browser reading the page.
    if let Err(e) = write_response(&mut stream, "200 OK", page).await {
        debug!(error = %e, "failed to write callback page");
    }
    Ok(Some(response))
}

async fn read_request_head(stream: &mut TcpStream) -> io::Result<String> {
    let mut head = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&chunk[..n]);
        if head.windows(4).any(|w| w == b"\r\n\r\n") || head.len() >= MAX_REQUEST_HEAD {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&head).into_owned())
}

async fn write_response(stream: &mut TcpStream, status: &str, body: &str) -> io::Result<()> {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// Builds the URL the user is sent to.
pub trait AuthorizationUrlBuilder: Send + Sync {
    fn build_authorization_url(
        &self,
        endpoint: &str,
        request: &AuthorizationCodeRequest,
    ) -> OAuth2Result<String>;
}

/// Replaces the endpoint's query with the request parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAuthorizationUrlBuilder;

impl AuthorizationUrlBuilder for DefaultAuthorizationUrlBuilder {
    fn build_authorization_url(
        &self,
        endpoint: &str,
        request: &AuthorizationCodeRequest,
    ) -> OAuth2Result<String> {
        if request.client_id.is_empty() {
            return Err(AuthorizationError::InvalidRequest {
                message: "client_id is required".to_string(),
            }
            .into());
        }
        if endpoint.is_empty() {
            return Err(ConfigurationError::MissingField {
                field: "authorization_endpoint".to_string(),
            }
            .into());
        }

        let mut url = Url::parse(endpoint).map_err(|e| ConfigurationError::InvalidEndpoint {
            url: endpoint.to_string(),
            message: e.to_string(),
        })?;
        url.set_query(None);
        url.query_pairs_mut().extend_pairs(&request.to_params());
        Ok(url.to_string())
    }
}

/// Checks a callback against the request that produced it.
pub trait ResponseValidator: Send + Sync {
    fn validate_response(
        &self,
        request: &AuthorizationCodeRequest,
        response: &CallbackResponse,
    ) -> Result<AuthorizationCodeResponse, AuthorizationError>;
}

/// State must round-trip exactly when the request carried one. An empty
/// request state skips the comparison.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultResponseValidator;

impl ResponseValidator for DefaultResponseValidator {
    fn validate_response(
        &self,
        request: &AuthorizationCodeRequest,
        response: &CallbackResponse,
    ) -> Result<AuthorizationCodeResponse, AuthorizationError> {
        if !request.state.is_empty() && response.state != request.state {
            return Err(AuthorizationError::StateMismatch {
                expected: request.state.clone(),
                received: response.state.clone(),
            });
        }

        if response.code.is_empty() {
            return Err(AuthorizationError::MissingAuthorizationCode {
                error: response.error.clone(),
                error_description: response.error_description.clone(),
            });
        }

        Ok(AuthorizationCodeResponse {
            code: response.code.clone(),
            state: request.state.clone(),
        })
    }
}

/// Collaborators of the authorization code request.
#[derive(Clone)]
pub struct AuthFlowDependencies {
    pub server_manager: Arc<dyn CallbackServerManager>,
    pub url_builder: Arc<dyn AuthorizationUrlBuilder>,
    pub browser_launcher: Arc<dyn BrowserLauncher>,
    pub response_validator: Arc<dyn ResponseValidator>,
}

impl Default for AuthFlowDependencies {
    fn default() -> Self {
        Self {
            server_manager: Arc::new(DefaultCallbackServerManager::new()),
            url_builder: Arc::new(DefaultAuthorizationUrlBuilder),
            browser_launcher: Arc::new(SystemBrowserLauncher),
            response_validator: Arc::new(DefaultResponseValidator),
        }
    }
}

impl AuthFlowDependencies {
    /// Replace the browser launcher.
    pub fn with_browser_launcher(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.browser_launcher = launcher;
        self
    }

    /// Replace the callback server manager.
    pub fn with_server_manager(mut self, manager: Arc<dyn CallbackServerManager>) -> Self {
        self.server_manager = manager;
        self
    }

    /// Run the front-channel half of the authorization code grant.
    ///
    /// The listener is up before the browser opens. A browser failure is
    /// logged and the flow keeps waiting, since the URL is also logged.
    pub async fn execute_authorization_code_request(
        &self,
        cancel: &CancellationToken,
        endpoint: &str,
        callback: &str,
        request: &AuthorizationCodeRequest,
    ) -> OAuth2Result<AuthorizationCodeResponse> {
        let server = self.server_manager.start_server(cancel, callback).await?;

        let url = self.url_builder.build_authorization_url(endpoint, request)?;
        info!(url = %url, "authorization request");

        if let Err(e) = self.browser_launcher.open_url(&url) {
            warn!(error = %e, url = %url, "unable to open browser, visit the URL to continue");
        }

        let response = self
            .server_manager
            .wait_for_callback(cancel, server)
            .await
            .map_err(|e| if e.is_cancelled() { e } else { e.context("callback failed") })?;

        Ok(self.response_validator.validate_response(request, &response)?)
    }
}

/// Mock callback server manager for testing.
#[derive(Default)]
pub struct MockCallbackServerManager {
    response: Mutex<Option<Delivery>>,
    startup_error: Mutex<Option<String>>,
    started: Mutex<Vec<String>>,
}

impl MockCallbackServerManager {
    /// A manager that delivers `response` once waited on.
    pub fn new(response: CallbackResponse) -> Self {
        Self {
            response: Mutex::new(Some(Ok(response))),
            ..Self::default()
        }
    }

    /// A manager whose listener never starts.
    pub fn failing_startup(message: impl Into<String>) -> Self {
        Self {
            startup_error: Mutex::new(Some(message.into())),
            ..Self::default()
        }
    }

    /// A manager whose wait ends with `error`.
    pub fn failing_wait(error: CallbackError) -> Self {
        Self {
            response: Mutex::new(Some(Err(error))),
            ..Self::default()
        }
    }

    /// Callback URLs servers were started for.
    pub fn get_started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallbackServerManager for MockCallbackServerManager {
    async fn start_server(
        &self,
        _cancel: &CancellationToken,
        callback: &str,
    ) -> OAuth2Result<CallbackServer> {
        self.started.lock().unwrap().push(callback.to_string());
        if let Some(message) = self.startup_error.lock().unwrap().clone() {
            return Err(startup_error(message).into());
        }

        let (sender, receiver) = oneshot::channel();
        if let Some(delivery) = self.response.lock().unwrap().take() {
            let _ = sender.send(delivery);
        }
        Ok(CallbackServer {
            local_addr: None,
            path: callback.to_string(),
            receiver,
            shutdown: CancellationToken::new(),
        })
    }

    async fn wait_for_callback(
        &self,
        cancel: &CancellationToken,
        mut server: CallbackServer,
    ) -> OAuth2Result<CallbackResponse> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OAuth2Error::Cancelled),
            delivery = &mut server.receiver => match delivery {
                Ok(delivery) => Ok(delivery?),
                Err(_) => Err(CallbackError::Timeout { timeout: Duration::ZERO }.into()),
            },
        }
    }
}
