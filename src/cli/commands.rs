//! Per-command arguments.

use std::io::BufRead;
use std::path::PathBuf;

use secrecy::SecretString;

use super::{require, token_from_stdin, CliError, DpopKeys, FlowSpec, GlobalArgs};
use crate::flows::{
    AuthorizationCodeFlowConfig, ClientCredentialsFlowConfig, DeviceFlowConfig,
    TokenRefreshFlowConfig, DEFAULT_CALLBACK_URI,
};
use crate::types::{CustomArgs, IntrospectionRequest, TokenExchangeInput, ACCESS_TOKEN_TYPE};

type Resolved = (FlowSpec, Option<DpopKeys>);

#[derive(Debug, clap::Args)]
pub struct AuthorizationCodeArgs {
    /// Space separated scopes
    #[arg(long, default_value = "openid")]
    pub scopes: String,

    /// Local listener URI, also sent as redirect_uri unless --redirect-uri is given
    #[arg(long, default_value = DEFAULT_CALLBACK_URI)]
    pub callback_uri: String,

    /// redirect_uri parameter
    #[arg(long, default_value = "")]
    pub redirect_uri: String,

    /// prompt parameter (login, consent, select_account or none)
    #[arg(long, default_value = "")]
    pub prompt: String,

    /// acr_values parameter
    #[arg(long, default_value = "")]
    pub acr_values: String,

    /// login_hint parameter
    #[arg(long, default_value = "")]
    pub login_hint: String,

    /// max_age parameter
    #[arg(long, default_value = "")]
    pub max_age: String,

    /// ui_locales parameter
    #[arg(long, default_value = "")]
    pub ui_locales: String,

    /// state parameter
    #[arg(long, default_value = "")]
    pub state: String,

    /// Custom authorization parameter as key=value, may be repeated
    #[arg(long = "custom", value_name = "KEY=VALUE")]
    pub custom: Vec<String>,

    /// Use proof key for code exchange (PKCE)
    #[arg(long)]
    pub pkce: bool,

    /// Use pushed authorization requests
    #[arg(long)]
    pub par: bool,

    /// Request DPoP-bound tokens
    #[arg(long)]
    pub dpop: bool,

    /// DPoP private key file (PEM)
    #[arg(long)]
    pub private_key: Option<PathBuf>,

    /// DPoP public key file (JWK or PEM)
    #[arg(long)]
    pub public_key: Option<PathBuf>,
}

impl AuthorizationCodeArgs {
    pub(super) fn resolve(self, global: &GlobalArgs) -> Result<Resolved, CliError> {
        let custom_args = parse_custom(&self.custom)?;

        global.require_issuer_and_client()?;
        require(
            !global.client_secret.is_empty() || self.pkce,
            "client-secret is required unless using PKCE",
        )?;
        require(!self.scopes.is_empty(), "scopes are required")?;
        require(!self.callback_uri.is_empty(), "callback-uri is required")?;
        let dpop = dpop_keys(
            self.dpop,
            self.private_key,
            self.public_key,
            "private-key and public-key are required when using DPoP",
        )?;

        let config = AuthorizationCodeFlowConfig {
            scopes: self.scopes,
            callback_uri: self.callback_uri,
            redirect_uri: self.redirect_uri,
            prompt: self.prompt,
            acr_values: self.acr_values,
            login_hint: self.login_hint,
            max_age: self.max_age,
            ui_locales: self.ui_locales,
            state: self.state,
            custom_args,
            pkce: self.pkce,
            par: self.par,
        };
        Ok((FlowSpec::AuthorizationCode(config), dpop))
    }
}

#[derive(Debug, clap::Args)]
pub struct ClientCredentialsArgs {
    /// Space separated scopes
    #[arg(long, default_value = "")]
    pub scopes: String,
}

impl ClientCredentialsArgs {
    pub(super) fn resolve(self, global: &GlobalArgs) -> Result<Resolved, CliError> {
        global.require_issuer_and_client()?;
        require(!global.client_secret.is_empty(), "client-secret is required")?;

        let config = ClientCredentialsFlowConfig {
            scopes: self.scopes,
        };
        Ok((FlowSpec::ClientCredentials(config), None))
    }
}

/// DPoP flags of the device, refresh and exchange commands.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct DpopArgs {
    /// Request DPoP-bound tokens
    #[arg(long)]
    pub dpop: bool,

    /// DPoP private key file (PEM)
    #[arg(long)]
    pub dpop_private_key: Option<PathBuf>,

    /// DPoP public key file (JWK or PEM)
    #[arg(long)]
    pub dpop_public_key: Option<PathBuf>,
}

impl DpopArgs {
    fn keys(self) -> Result<Option<DpopKeys>, CliError> {
        dpop_keys(
            self.dpop,
            self.dpop_private_key,
            self.dpop_public_key,
            "both dpop-private-key and dpop-public-key are required when using DPoP",
        )
    }
}

#[derive(Debug, clap::Args)]
pub struct DeviceArgs {
    /// Space separated scope
    #[arg(long, default_value = "openid")]
    pub scope: String,

    #[command(flatten)]
    pub dpop: DpopArgs,
}

impl DeviceArgs {
    pub(super) fn resolve(self, global: &GlobalArgs) -> Result<Resolved, CliError> {
        global.require_issuer_and_client()?;
        require(!self.scope.is_empty(), "scope is required")?;
        let dpop = self.dpop.keys()?;

        Ok((FlowSpec::Device(DeviceFlowConfig { scope: self.scope }), dpop))
    }
}

#[derive(Debug, clap::Args)]
pub struct IntrospectArgs {
    /// Token to introspect, or '-' to read it from stdin
    #[arg(long, default_value = "")]
    pub token: String,

    /// Token type hint
    #[arg(long = "token-type", default_value = "access_token")]
    pub token_type: String,

    /// Bearer token authorizing the call (instead of client credentials)
    #[arg(long, default_value = "")]
    pub bearer_token: String,

    /// Custom Accept header (e.g. application/json)
    #[arg(long = "accept-header", default_value = "")]
    pub accept_header: String,

    /// Custom body parameter as key=value, may be repeated
    #[arg(long = "custom", value_name = "KEY=VALUE")]
    pub custom: Vec<String>,
}

impl IntrospectArgs {
    pub(super) fn resolve(
        self,
        global: &GlobalArgs,
        stdin: &mut dyn BufRead,
    ) -> Result<Resolved, CliError> {
        let custom_args = parse_custom(&self.custom)?;
        let token = token_from_stdin(self.token, stdin)?.unwrap_or_default();

        global.require_issuer_and_client()?;
        require(
            !global.client_secret.is_empty() || !self.bearer_token.is_empty(),
            "client-secret or bearer-token is required",
        )?;
        require(!token.is_empty(), "token is required")?;

        let request = IntrospectionRequest {
            token,
            token_type_hint: self.token_type,
            bearer_token: self.bearer_token,
            accept: self.accept_header,
            custom_args,
        };
        Ok((FlowSpec::Introspect(request), None))
    }
}

#[derive(Debug, clap::Args)]
pub struct TokenRefreshArgs {
    /// Refresh token, or '-' to read it from stdin
    #[arg(long, default_value = "")]
    pub refresh_token: String,

    /// Space separated scopes
    #[arg(long, default_value = "")]
    pub scopes: String,

    #[command(flatten)]
    pub dpop: DpopArgs,
}

impl TokenRefreshArgs {
    pub(super) fn resolve(
        self,
        global: &GlobalArgs,
        stdin: &mut dyn BufRead,
    ) -> Result<Resolved, CliError> {
        let refresh_token = token_from_stdin(self.refresh_token, stdin)?
            .ok_or_else(|| CliError::Stdin("no refresh token provided on stdin".to_string()))?;

        global.require_issuer_and_client()?;
        require(!refresh_token.is_empty(), "refresh token is required")?;
        let dpop = self.dpop.keys()?;

        let config = TokenRefreshFlowConfig {
            refresh_token: SecretString::new(refresh_token),
            scopes: self.scopes,
        };
        Ok((FlowSpec::TokenRefresh(config), dpop))
    }
}

#[derive(Debug, clap::Args)]
pub struct TokenExchangeArgs {
    /// Subject token, or '-' to read it from stdin
    #[arg(long, default_value = "")]
    pub subject_token: String,

    /// Subject token type
    #[arg(long, default_value = ACCESS_TOKEN_TYPE)]
    pub subject_token_type: String,

    /// Target audience
    #[arg(long, default_value = "")]
    pub audience: String,

    /// Requested scope
    #[arg(long, default_value = "")]
    pub scope: String,

    /// Requested token type
    #[arg(long, default_value = "")]
    pub requested_token_type: String,

    /// Target resource
    #[arg(long, default_value = "")]
    pub resource: String,

    /// Actor token
    #[arg(long, default_value = "")]
    pub actor_token: String,

    /// Actor token type
    #[arg(long, default_value = "")]
    pub actor_token_type: String,

    #[command(flatten)]
    pub dpop: DpopArgs,
}

impl TokenExchangeArgs {
    pub(super) fn resolve(
        self,
        global: &GlobalArgs,
        stdin: &mut dyn BufRead,
    ) -> Result<Resolved, CliError> {
        let subject_token = token_from_stdin(self.subject_token, stdin)?
            .ok_or_else(|| CliError::Stdin("no subject token provided on stdin".to_string()))?;

        global.require_issuer_and_client()?;
        require(!global.client_secret.is_empty(), "client-secret is required")?;
        require(!subject_token.is_empty(), "subject token is required")?;
        let dpop = self.dpop.keys()?;

        let input = TokenExchangeInput {
            subject_token,
            subject_token_type: self.subject_token_type,
            resource: self.resource,
            audience: self.audience,
            scope: self.scope,
            requested_token_type: self.requested_token_type,
            actor_token: self.actor_token,
            actor_token_type: self.actor_token_type,
        };
        Ok((FlowSpec::TokenExchange(input), dpop))
    }
}

fn parse_custom(entries: &[String]) -> Result<CustomArgs, CliError> {
    let mut custom_args = CustomArgs::new();
    for entry in entries {
        custom_args
            .set(entry)
            .map_err(|e| CliError::InvalidArguments(e.to_string()))?;
    }
    Ok(custom_args)
}

fn dpop_keys(
    enabled: bool,
    private_key: Option<PathBuf>,
    public_key: Option<PathBuf>,
    message: &str,
) -> Result<Option<DpopKeys>, CliError> {
    if !enabled {
        return Ok(None);
    }
    match (private_key, public_key) {
        (Some(private_key), Some(public_key)) => Ok(Some(DpopKeys {
            private_key,
            public_key,
        })),
        _ => Err(CliError::InvalidArguments(message.to_string())),
    }
}
