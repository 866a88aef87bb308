//! Authorization code flow with the real callback listener.
//!
//! The browser is simulated by a launcher hook that follows the redirect
//! the authorization server would issue.

use super::*;
use oidc_cli::{
    AuthFlowDependencies, AuthorizationCodeFlow, AuthorizationCodeFlowConfig,
    AuthorizationError, DefaultCallbackServerManager, Flow, MockBrowserLauncher, OAuth2Error,
};
use serde_json::json;
use std::net::TcpListener;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// A browser that approves the request, answering with `code` and either
/// the request's state or `state_override`.
fn approving_browser(code: &'static str, state_override: Option<&'static str>) -> MockBrowserLauncher {
    MockBrowserLauncher::with_hook(move |authorization_url| {
        let url = Url::parse(authorization_url).unwrap();
        let param = |key: &str| {
            url.query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default()
        };
        let state = state_override
            .map(str::to_string)
            .unwrap_or_else(|| param("state"));
        let mut callback = Url::parse(&param("redirect_uri")).unwrap();
        callback
            .query_pairs_mut()
            .append_pair("code", code)
            .append_pair("state", &state);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = reqwest::get(callback.as_str()).await;
        });
    })
}

fn flow(
    server: &wiremock::MockServer,
    callback_uri: String,
    browser: MockBrowserLauncher,
    state: &str,
) -> AuthorizationCodeFlow<oidc_cli::ReqwestHttpTransport> {
    let config = AuthorizationCodeFlowConfig {
        callback_uri,
        state: state.to_string(),
        pkce: true,
        ..Default::default()
    };
    let deps = AuthFlowDependencies::default()
        .with_browser_launcher(Arc::new(browser))
        .with_server_manager(Arc::new(DefaultCallbackServerManager::with_timeout(
            Duration::from_secs(10),
        )));
    AuthorizationCodeFlow::new(client(server_config(server, None)), config).with_dependencies(deps)
}

#[tokio::test]
async fn test_end_to_end_with_pkce() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=e2e-code"))
        .and(body_string_contains("code_verifier="))
        .and(body_string_contains("client_id=integration-client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "user-token",
            "id_token": "header.payload.signature",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let callback_uri = format!("http://127.0.0.1:{}/callback", free_port());
    let response = flow(&server, callback_uri, approving_browser("e2e-code", None), "csrf-1")
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response["access_token"], "user-token");
    assert_eq!(response["id_token"], "header.payload.signature");
}

#[tokio::test]
async fn test_end_to_end_state_mismatch() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "never"})))
        .expect(0)
        .mount(&server)
        .await;

    let callback_uri = format!("http://127.0.0.1:{}/callback", free_port());
    let err = flow(
        &server,
        callback_uri,
        approving_browser("e2e-code", Some("forged")),
        "csrf-1",
    )
    .run(CancellationToken::new())
    .await
    .unwrap_err();

    match err {
        OAuth2Error::Authorization(AuthorizationError::StateMismatch { expected, received }) => {
            assert_eq!(expected, "csrf-1");
            assert_eq!(received, "forged");
        }
        other => panic!("expected state mismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_while_waiting_for_callback() {
    let server = setup_mock_server().await;
    let callback_uri = format!("http://127.0.0.1:{}/callback", free_port());
    let flow = flow(&server, callback_uri, MockBrowserLauncher::failing(), "");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let err = flow.run(cancel).await.unwrap_err();
    assert!(err.is_cancelled());
}
