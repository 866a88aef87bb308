//! OIDC Client
//!
//! Executes form-encoded exchanges against the authorization server and
//! classifies the result. Flows compose these calls; none of them retry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::{
    auth_method, create_transport, ClassifiedResponse, DpopProver, HttpMethod, HttpRequest,
    HttpTransport, ReqwestHttpTransport, DPOP_HEADER,
};
use crate::error::{ConfigurationError, OAuth2Error, OAuth2Result, ProtocolError};
use crate::types::{
    AuthorizationCodeRequest, DeviceAuthorizationRequest, DeviceAuthorizationResponse,
    IntrospectionRequest, OAuth2Config, TokenRequest,
};

/// Client for the token, device authorization, PAR and introspection endpoints.
pub struct OidcClient<T: HttpTransport = ReqwestHttpTransport> {
    config: OAuth2Config,
    transport: Arc<T>,
    dpop: Option<Arc<dyn DpopProver>>,
}

impl OidcClient<ReqwestHttpTransport> {
    /// Create a client with the default HTTP transport.
    pub fn new(config: OAuth2Config) -> OAuth2Result<Self> {
        let transport = create_transport(config.timeout, config.skip_tls_verify)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }
}

impl<T: HttpTransport> OidcClient<T> {
    /// Create a client with a custom transport.
    pub fn with_transport(config: OAuth2Config, transport: Arc<T>) -> Self {
        Self {
            config,
            transport,
            dpop: None,
        }
    }

    /// Attach a DPoP proof to every token endpoint request.
    pub fn with_dpop(mut self, prover: Arc<dyn DpopProver>) -> Self {
        self.dpop = Some(prover);
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn uses_dpop(&self) -> bool {
        self.dpop.is_some()
    }

    /// Send a token request to `endpoint`.
    ///
    /// `Err` is returned only when the request could not be attempted or was
    /// cancelled. Every received (or failed) exchange is classified.
    pub async fn execute_token_request(
        &self,
        cancel: &CancellationToken,
        endpoint: &str,
        request: &TokenRequest,
        extra_headers: HashMap<String, String>,
    ) -> OAuth2Result<ClassifiedResponse> {
        require_endpoint("token_endpoint", endpoint)?;

        let mut params = request.params.clone();
        params.insert("grant_type".to_string(), request.grant_type.as_str().to_string());

        let mut headers = extra_headers;
        auth_method::apply(
            request.auth_method,
            &request.client_id,
            request.client_secret.as_ref(),
            &mut params,
            &mut headers,
        );

        if let Some(prover) = &self.dpop {
            let proof = prover
                .proof(HttpMethod::Post.as_str(), endpoint)
                .map_err(|e| OAuth2Error::from(e).context("failed to create DPoP proof"))?;
            headers.insert(DPOP_HEADER.to_string(), proof);
        }

        debug!(
            grant_type = request.grant_type.as_str(),
            endpoint,
            auth_method = request.auth_method.as_str(),
            dpop = self.dpop.is_some(),
            "token request"
        );

        self.post_form(cancel, endpoint, &params, headers).await
    }

    /// Request a device code (RFC 8628 section 3.1).
    pub async fn request_device_authorization(
        &self,
        cancel: &CancellationToken,
        endpoint: &str,
        request: &DeviceAuthorizationRequest,
    ) -> OAuth2Result<DeviceAuthorizationResponse> {
        require_endpoint("device_authorization_endpoint", endpoint)?;

        let mut params = BTreeMap::new();
        params.insert("client_id".to_string(), request.client_id.clone());
        let optional = [
            ("scope", &request.scope),
            ("code_challenge", &request.code_challenge),
            ("code_challenge_method", &request.code_challenge_method),
        ];
        for (key, value) in optional {
            if !value.is_empty() {
                params.insert(key.to_string(), value.clone());
            }
        }

        debug!(endpoint, "device authorization request");

        let body = self
            .post_form(cancel, endpoint, &params, HashMap::new())
            .await?
            .into_result()?;

        serde_json::from_value(serde_json::Value::Object(body)).map_err(|e| {
            ProtocolError::InvalidJson {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Push authorization parameters (RFC 9126) and return the `request_uri`.
    pub async fn push_authorization_request(
        &self,
        cancel: &CancellationToken,
        endpoint: &str,
        request: &AuthorizationCodeRequest,
    ) -> OAuth2Result<String> {
        require_endpoint("pushed_authorization_request_endpoint", endpoint)?;

        let mut params = request.to_params();
        let mut headers = HashMap::new();
        let credentials = &self.config.credentials;
        auth_method::apply(
            credentials.auth_method,
            &credentials.client_id,
            credentials.client_secret.as_ref(),
            &mut params,
            &mut headers,
        );

        debug!(endpoint, "pushed authorization request");

        let body = self
            .post_form(cancel, endpoint, &params, headers)
            .await?
            .into_result()?;

        match body.get("request_uri").and_then(|v| v.as_str()) {
            Some(uri) if !uri.is_empty() => Ok(uri.to_string()),
            _ => Err(ProtocolError::InvalidJson {
                message: "pushed authorization response has no request_uri".to_string(),
            }
            .into()),
        }
    }

    /// Introspect a token (RFC 7662). The response is classified but
    /// otherwise returned as received.
    pub async fn introspect(
        &self,
        cancel: &CancellationToken,
        endpoint: &str,
        request: &IntrospectionRequest,
    ) -> OAuth2Result<ClassifiedResponse> {
        require_endpoint("introspection_endpoint", endpoint)?;

        let mut params = BTreeMap::new();
        params.insert("token".to_string(), request.token.clone());
        if !request.token_type_hint.is_empty() {
            params.insert("token_type_hint".to_string(), request.token_type_hint.clone());
        }
        for (key, value) in request.custom_args.iter() {
            params.insert(key.clone(), value.clone());
        }

        let mut headers = HashMap::new();
        if !request.accept.is_empty() {
            headers.insert("accept".to_string(), request.accept.clone());
        }
        if request.bearer_token.is_empty() {
            let credentials = &self.config.credentials;
            auth_method::apply(
                credentials.auth_method,
                &credentials.client_id,
                credentials.client_secret.as_ref(),
                &mut params,
                &mut headers,
            );
        } else {
            headers.insert(
                "authorization".to_string(),
                format!("Bearer {}", request.bearer_token),
            );
        }

        debug!(endpoint, bearer = !request.bearer_token.is_empty(), "introspection request");

        self.post_form(cancel, endpoint, &params, headers).await
    }

    async fn post_form(
        &self,
        cancel: &CancellationToken,
        endpoint: &str,
        params: &BTreeMap<String, String>,
        headers: HashMap<String, String>,
    ) -> OAuth2Result<ClassifiedResponse> {
        let mut request = HttpRequest::form_post(endpoint, params, headers);
        request.timeout = Some(self.config.timeout);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OAuth2Error::Cancelled),
            outcome = self.transport.send(request) => {
                let classified = ClassifiedResponse::classify(outcome);
                debug!(endpoint, success = classified.is_success(), "response classified");
                Ok(classified)
            }
        }
    }
}

fn require_endpoint(field: &str, endpoint: &str) -> Result<(), ConfigurationError> {
    if endpoint.is_empty() {
        return Err(ConfigurationError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(())
}
