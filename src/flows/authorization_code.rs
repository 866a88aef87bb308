//! Authorization Code Flow
//!
//! RFC 6749 section 4.1 with optional PKCE (RFC 7636) and pushed
//! authorization requests (RFC 9126).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{AuthFlowDependencies, Flow};
use crate::builders::token_request;
use crate::client::OidcClient;
use crate::core::{DefaultPkceGenerator, HttpTransport, PkceGenerator};
use crate::error::{OAuth2Result, ResultExt};
use crate::types::{AuthorizationCodeRequest, CustomArgs, PkceMethod, TokenResponse};

/// Default local redirect listener.
pub const DEFAULT_CALLBACK_URI: &str = "http://localhost:9555/callback";

/// Authorization Code Flow settings.
#[derive(Debug, Clone)]
pub struct AuthorizationCodeFlowConfig {
    /// Space separated scopes.
    pub scopes: String,
    /// Where the local listener accepts the redirect.
    pub callback_uri: String,
    /// `redirect_uri` sent to the provider. Defaults to `callback_uri`.
    pub redirect_uri: String,
    pub prompt: String,
    pub acr_values: String,
    pub login_hint: String,
    pub max_age: String,
    pub ui_locales: String,
    /// CSRF state. Empty disables state validation.
    pub state: String,
    pub custom_args: CustomArgs,
    /// Use PKCE with S256.
    pub pkce: bool,
    /// Push the authorization parameters before redirecting.
    pub par: bool,
}

impl Default for AuthorizationCodeFlowConfig {
    fn default() -> Self {
        Self {
            scopes: "openid".to_string(),
            callback_uri: DEFAULT_CALLBACK_URI.to_string(),
            redirect_uri: String::new(),
            prompt: String::new(),
            acr_values: String::new(),
            login_hint: String::new(),
            max_age: String::new(),
            ui_locales: String::new(),
            state: String::new(),
            custom_args: CustomArgs::new(),
            pkce: false,
            par: false,
        }
    }
}

impl AuthorizationCodeFlowConfig {
    fn redirect_uri(&self) -> &str {
        if self.redirect_uri.is_empty() {
            &self.callback_uri
        } else {
            &self.redirect_uri
        }
    }
}

/// Authorization Code Flow.
pub struct AuthorizationCodeFlow<T: HttpTransport> {
    client: Arc<OidcClient<T>>,
    config: AuthorizationCodeFlowConfig,
    deps: AuthFlowDependencies,
    pkce: Arc<dyn PkceGenerator>,
}

impl<T: HttpTransport> AuthorizationCodeFlow<T> {
    /// Create new Authorization Code Flow.
    pub fn new(client: Arc<OidcClient<T>>, config: AuthorizationCodeFlowConfig) -> Self {
        Self {
            client,
            config,
            deps: AuthFlowDependencies::default(),
            pkce: Arc::new(DefaultPkceGenerator::new()),
        }
    }

    /// Replace the callback collaborators.
    pub fn with_dependencies(mut self, deps: AuthFlowDependencies) -> Self {
        self.deps = deps;
        self
    }

    /// Replace the PKCE generator.
    pub fn with_pkce_generator(mut self, pkce: Arc<dyn PkceGenerator>) -> Self {
        self.pkce = pkce;
        self
    }

    fn authorization_request(&self) -> AuthorizationCodeRequest {
        AuthorizationCodeRequest {
            client_id: self.client.config().credentials.client_id.clone(),
            redirect_uri: self.config.redirect_uri().to_string(),
            scope: self.config.scopes.clone(),
            state: self.config.state.clone(),
            prompt: self.config.prompt.clone(),
            acr_values: self.config.acr_values.clone(),
            login_hint: self.config.login_hint.clone(),
            max_age: self.config.max_age.clone(),
            ui_locales: self.config.ui_locales.clone(),
            custom_args: self.config.custom_args.clone(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl<T: HttpTransport> Flow for AuthorizationCodeFlow<T> {
    async fn run(&self, cancel: CancellationToken) -> OAuth2Result<TokenResponse> {
        let config = self.client.config();
        let mut request = self.authorization_request();

        let verifier = if self.config.pkce {
            let pkce = self.pkce.generate(PkceMethod::S256);
            request.code_challenge = pkce.code_challenge;
            request.code_challenge_method = pkce.code_challenge_method.as_str().to_string();
            pkce.code_verifier
        } else {
            String::new()
        };

        if self.config.par {
            let endpoint = config
                .provider
                .pushed_authorization_request_endpoint
                .as_deref()
                .unwrap_or_default();
            let request_uri = self
                .client
                .push_authorization_request(&cancel, endpoint, &request)
                .await
                .context("pushed authorization request failed")?;
            debug!(request_uri = %request_uri, "authorization request pushed");

            // State stays on the front channel so the callback can be checked.
            request = AuthorizationCodeRequest {
                client_id: request.client_id,
                state: request.state,
                request_uri,
                ..Default::default()
            };
        }

        let authorization = self
            .deps
            .execute_authorization_code_request(
                &cancel,
                &config.provider.authorization_endpoint,
                &self.config.callback_uri,
                &request,
            )
            .await?;

        let token_request = token_request::authorization_code(
            &config.credentials,
            &authorization.code,
            self.config.redirect_uri(),
            &verifier,
        );
        self.client
            .execute_token_request(
                &cancel,
                &config.provider.token_endpoint,
                &token_request,
                HashMap::new(),
            )
            .await
            .context("token request failed")?
            .into_result()
            .context("token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::oauth2_config;
    use crate::core::{compute_challenge, MockBrowserLauncher, MockDpopProver, MockHttpTransport};
    use crate::error::{AuthorizationError, OAuth2Error};
    use crate::flows::MockCallbackServerManager;
    use crate::types::{AuthMethod, CallbackResponse, OAuth2Config};
    use pretty_assertions::assert_eq;
    use url::Url;

    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const TOKEN_URL: &str = "https://idp.example.com/token";
    const PAR_URL: &str = "https://idp.example.com/par";

    fn config(secret: Option<&str>) -> OAuth2Config {
        let mut builder = oauth2_config()
            .client_id("cli")
            .issuer("https://idp.example.com")
            .authorization_endpoint("https://idp.example.com/authorize")
            .token_endpoint(TOKEN_URL)
            .pushed_authorization_request_endpoint(PAR_URL);
        match secret {
            Some(secret) => builder = builder.client_secret(secret),
            None => builder = builder.auth_method(AuthMethod::None),
        }
        builder.build().unwrap()
    }

    fn callback(query: &str) -> CallbackResponse {
        CallbackResponse::from_query(query)
    }

    fn flow(
        client: OidcClient<MockHttpTransport>,
        flow_config: AuthorizationCodeFlowConfig,
        server: Arc<MockCallbackServerManager>,
        browser: Arc<MockBrowserLauncher>,
    ) -> AuthorizationCodeFlow<MockHttpTransport> {
        AuthorizationCodeFlow::new(Arc::new(client), flow_config)
            .with_dependencies(
                AuthFlowDependencies::default()
                    .with_server_manager(server)
                    .with_browser_launcher(browser),
            )
            .with_pkce_generator(Arc::new(crate::core::MockPkceGenerator::new(VERIFIER)))
    }

    fn query_param(url: &str, key: &str) -> Option<String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[tokio::test]
    async fn test_code_exchange_with_pkce() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_body(200, r#"{"access_token":"at","id_token":"idt","token_type":"Bearer"}"#);
        let server = Arc::new(MockCallbackServerManager::new(callback("code=ABC&state=S1")));
        let browser = Arc::new(MockBrowserLauncher::new());

        let flow_config = AuthorizationCodeFlowConfig {
            state: "S1".to_string(),
            pkce: true,
            ..Default::default()
        };
        let response = flow(
            OidcClient::with_transport(config(None), transport.clone()),
            flow_config,
            server.clone(),
            browser.clone(),
        )
        .run(CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(response["access_token"], "at");
        assert_eq!(server.get_started(), vec![DEFAULT_CALLBACK_URI.to_string()]);

        let opened = browser.get_opened();
        assert_eq!(opened.len(), 1);
        assert_eq!(query_param(&opened[0], "response_type").as_deref(), Some("code"));
        assert_eq!(query_param(&opened[0], "scope").as_deref(), Some("openid"));
        assert_eq!(
            query_param(&opened[0], "redirect_uri").as_deref(),
            Some(DEFAULT_CALLBACK_URI)
        );
        assert_eq!(query_param(&opened[0], "code_challenge_method").as_deref(), Some("S256"));
        assert_eq!(
            query_param(&opened[0], "code_challenge"),
            Some(compute_challenge(VERIFIER, PkceMethod::S256))
        );

        let token = transport.get_last_request().unwrap();
        assert_eq!(token.url, TOKEN_URL);
        assert_eq!(
            token.form_params(),
            vec![
                ("client_id".to_string(), "cli".to_string()),
                ("code".to_string(), "ABC".to_string()),
                ("code_verifier".to_string(), VERIFIER.to_string()),
                ("grant_type".to_string(), "authorization_code".to_string()),
                ("redirect_uri".to_string(), DEFAULT_CALLBACK_URI.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_explicit_redirect_uri_used_for_both_legs() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_body(200, r#"{"access_token":"at"}"#);
        let server = Arc::new(MockCallbackServerManager::new(callback("code=ABC")));
        let browser = Arc::new(MockBrowserLauncher::new());

        let flow_config = AuthorizationCodeFlowConfig {
            redirect_uri: "https://app.example.com/cb".to_string(),
            ..Default::default()
        };
        flow(
            OidcClient::with_transport(config(Some("secret")), transport.clone()),
            flow_config,
            server.clone(),
            browser.clone(),
        )
        .run(CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(server.get_started(), vec![DEFAULT_CALLBACK_URI.to_string()]);
        assert_eq!(
            query_param(&browser.get_opened()[0], "redirect_uri").as_deref(),
            Some("https://app.example.com/cb")
        );
        let token = transport.get_last_request().unwrap();
        assert!(token
            .form_params()
            .contains(&("redirect_uri".to_string(), "https://app.example.com/cb".to_string())));
        assert!(!token.form_params().iter().any(|(k, _)| k == "code_verifier"));
        assert!(token.header("authorization").unwrap().starts_with("Basic "));
    }

    #[tokio::test]
    async fn test_pushed_authorization_request() {
        let transport = Arc::new(MockHttpTransport::new());
        transport
            .queue_body(
                201,
                r#"{"request_uri":"urn:ietf:params:oauth:request_uri:abc","expires_in":60}"#,
            )
            .queue_body(200, r#"{"access_token":"at"}"#);
        let server = Arc::new(MockCallbackServerManager::new(callback("code=ABC&state=S1")));
        let browser = Arc::new(MockBrowserLauncher::new());

        let flow_config = AuthorizationCodeFlowConfig {
            state: "S1".to_string(),
            par: true,
            ..Default::default()
        };
        flow(
            OidcClient::with_transport(config(Some("secret")), transport.clone()),
            flow_config,
            server,
            browser.clone(),
        )
        .run(CancellationToken::new())
        .await
        .unwrap();

        let requests = transport.get_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, PAR_URL);
        assert!(requests[0]
            .form_params()
            .contains(&("scope".to_string(), "openid".to_string())));

        let opened = &browser.get_opened()[0];
        let keys: Vec<String> = Url::parse(opened)
            .unwrap()
            .query_pairs()
            .map(|(k, _)| k.into_owned())
            .collect();
        assert_eq!(keys, vec!["client_id", "request_uri", "response_type", "state"]);
        assert_eq!(
            query_param(opened, "request_uri").as_deref(),
            Some("urn:ietf:params:oauth:request_uri:abc")
        );
        assert_eq!(requests[1].url, TOKEN_URL);
    }

    #[tokio::test]
    async fn test_par_failure_skips_browser() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_body(400, r#"{"error":"invalid_request"}"#);
        let server = Arc::new(MockCallbackServerManager::new(callback("code=ABC")));
        let browser = Arc::new(MockBrowserLauncher::new());

        let flow_config = AuthorizationCodeFlowConfig {
            par: true,
            ..Default::default()
        };
        let err = flow(
            OidcClient::with_transport(config(Some("secret")), transport),
            flow_config,
            server.clone(),
            browser.clone(),
        )
        .run(CancellationToken::new())
        .await
        .unwrap_err();

        assert_eq!(err.oauth_error_code(), Some("invalid_request"));
        assert!(server.get_started().is_empty());
        assert!(browser.get_opened().is_empty());
    }

    #[tokio::test]
    async fn test_state_mismatch_skips_token_request() {
        let transport = Arc::new(MockHttpTransport::new());
        let server = Arc::new(MockCallbackServerManager::new(callback("code=ABC&state=S2")));

        let flow_config = AuthorizationCodeFlowConfig {
            state: "S1".to_string(),
            ..Default::default()
        };
        let err = flow(
            OidcClient::with_transport(config(Some("secret")), transport.clone()),
            flow_config,
            server,
            Arc::new(MockBrowserLauncher::new()),
        )
        .run(CancellationToken::new())
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            OAuth2Error::Authorization(AuthorizationError::StateMismatch { .. })
        ));
        assert!(transport.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_access_denied_callback() {
        let transport = Arc::new(MockHttpTransport::new());
        let server = Arc::new(MockCallbackServerManager::new(callback(
            "error=access_denied&error_description=user+said+no",
        )));

        let err = flow(
            OidcClient::with_transport(config(Some("secret")), transport),
            AuthorizationCodeFlowConfig::default(),
            server,
            Arc::new(MockBrowserLauncher::new()),
        )
        .run(CancellationToken::new())
        .await
        .unwrap_err();

        assert!(err.to_string().contains("access_denied"));
    }

    #[tokio::test]
    async fn test_dpop_proof_on_token_request() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_body(200, r#"{"access_token":"at","token_type":"DPoP"}"#);
        let prover = Arc::new(MockDpopProver::new());
        let client = OidcClient::with_transport(config(Some("secret")), transport.clone())
            .with_dpop(prover.clone());

        flow(
            client,
            AuthorizationCodeFlowConfig::default(),
            Arc::new(MockCallbackServerManager::new(callback("code=ABC"))),
            Arc::new(MockBrowserLauncher::new()),
        )
        .run(CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(
            prover.get_history(),
            vec![("POST".to_string(), TOKEN_URL.to_string())]
        );
        assert_eq!(
            transport.get_last_request().unwrap().header("dpop"),
            Some("mock-proof-1")
        );
    }
}
