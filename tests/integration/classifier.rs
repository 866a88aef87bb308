//! Classification of real HTTP responses.

use super::*;
use oidc_cli::builders::token_request;
use oidc_cli::{ClassifiedResponse, ProtocolError};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

async fn classify(status: u16, body: &str) -> ClassifiedResponse {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let config = server_config(&server, Some("secret"));
    let request = token_request::client_credentials(&config.credentials, "");
    let client = client(config.clone());
    client
        .execute_token_request(
            &CancellationToken::new(),
            &config.provider.token_endpoint,
            &request,
            HashMap::new(),
        )
        .await
        .expect("request executes")
}

#[tokio::test]
async fn test_success_body() {
    match classify(200, r#"{"access_token":"abc","token_type":"Bearer","expires_in":3600}"#).await
    {
        ClassifiedResponse::Success(map) => {
            assert_eq!(map["access_token"], "abc");
            assert_eq!(map["expires_in"], 3600);
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_oauth_error_body() {
    match classify(400, r#"{"error":"invalid_grant"}"#).await {
        ClassifiedResponse::OAuthError { error, status, .. } => {
            assert_eq!(error, "invalid_grant");
            assert_eq!(status, 400);
        }
        other => panic!("expected oauth error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_failure_body() {
    match classify(500, r#"{"message":"internal failure"}"#).await {
        ClassifiedResponse::HttpFailure { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("internal failure"));
        }
        other => panic!("expected http failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_body() {
    for status in [200, 502] {
        let classified = classify(status, "<html>Bad Gateway</html>").await;
        assert!(
            matches!(classified, ClassifiedResponse::JsonParsing { .. }),
            "status {} gave {:?}",
            status,
            classified
        );
        assert!(matches!(
            classified.into_result().unwrap_err(),
            oidc_cli::OAuth2Error::Protocol(ProtocolError::InvalidJson { .. })
        ));
    }
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let server = setup_mock_server().await;
    let config = server_config(&server, Some("secret"));
    drop(server);

    let request = token_request::client_credentials(&config.credentials, "");
    let classified = client(config.clone())
        .execute_token_request(
            &CancellationToken::new(),
            &config.provider.token_endpoint,
            &request,
            HashMap::new(),
        )
        .await
        .unwrap();
    assert!(matches!(classified, ClassifiedResponse::Transport(_)));
}
