//! Command Layer
//!
//! Argument parsing and flow wiring for the `oidc-cli` binary. Parsing and
//! validation are pure; [`Invocation::run`] performs discovery, loads DPoP
//! keys and runs the selected flow.

mod commands;

pub use commands::{
    AuthorizationCodeArgs, ClientCredentialsArgs, DeviceArgs, DpopArgs, IntrospectArgs,
    TokenExchangeArgs, TokenRefreshArgs,
};

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::builders::oauth2_config;
use crate::client::OidcClient;
use crate::core::{create_transport, discover_endpoints, DefaultDiscoveryClient, KeyMaterialReader};
use crate::error::{OAuth2Error, OAuth2Result, ResultExt};
use crate::flows::{
    to_pretty_json, AuthorizationCodeFlow, AuthorizationCodeFlowConfig, ClientCredentialsFlow,
    ClientCredentialsFlowConfig, DeviceFlow, DeviceFlowConfig, Flow, IntrospectFlow,
    TokenExchangeFlow, TokenRefreshFlow, TokenRefreshFlowConfig,
};
use crate::types::{AuthMethod, IntrospectionRequest, OAuth2Config, TokenExchangeInput};

/// Command-line OIDC and OAuth2 client
#[derive(Debug, clap::Parser)]
#[command(name = "oidc-cli")]
#[command(about = "oidc-cli is a command-line OIDC and OAuth2 client")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Provider and client settings shared by every command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct GlobalArgs {
    /// Issuer URL (required)
    #[arg(long, global = true, env = "OIDC_ISSUER", default_value = "")]
    pub issuer: String,

    /// Override the discovery document URL
    #[arg(long, global = true, default_value = "")]
    pub discovery_url: String,

    /// Client identifier (required)
    #[arg(long, global = true, env = "OIDC_CLIENT_ID", default_value = "")]
    pub client_id: String,

    /// Client secret
    #[arg(long, global = true, env = "OIDC_CLIENT_SECRET", hide_env_values = true, default_value = "")]
    pub client_secret: String,

    /// Client authentication method (client_secret_basic, client_secret_post or none)
    #[arg(long, global = true)]
    pub auth_method: Option<AuthMethod>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub skip_tls_verify: bool,

    /// HTTP timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout: u64,

    /// Override the authorization endpoint
    #[arg(long, global = true, default_value = "")]
    pub authorization_url: String,

    /// Override the token endpoint
    #[arg(long, global = true, default_value = "")]
    pub token_url: String,

    /// Override the device authorization endpoint
    #[arg(long, global = true, default_value = "")]
    pub device_authorization_url: String,

    /// Override the introspection endpoint
    #[arg(long, global = true, default_value = "")]
    pub introspection_url: String,

    /// Override the pushed authorization request endpoint
    #[arg(long, global = true, default_value = "")]
    pub par_url: String,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Use the Authorization Code flow to obtain tokens
    #[command(name = "authorization_code")]
    AuthorizationCode(AuthorizationCodeArgs),

    /// Use the Client Credentials flow to obtain tokens
    #[command(name = "client_credentials")]
    ClientCredentials(ClientCredentialsArgs),

    /// Use the Device Authorization flow to obtain tokens
    #[command(name = "device")]
    Device(DeviceArgs),

    /// Validate a token and retrieve associated claims
    #[command(name = "introspect")]
    Introspect(IntrospectArgs),

    /// Use a refresh token to obtain new tokens
    #[command(name = "token_refresh")]
    TokenRefresh(TokenRefreshArgs),

    /// Exchange a token for different tokens
    #[command(name = "token_exchange")]
    TokenExchange(TokenExchangeArgs),
}

/// Errors raised before any request is sent.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Stdin(String),

    #[error("failed to read stdin: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    OAuth2(#[from] OAuth2Error),
}

/// The flow a command resolved to.
#[derive(Debug)]
pub enum FlowSpec {
    AuthorizationCode(AuthorizationCodeFlowConfig),
    ClientCredentials(ClientCredentialsFlowConfig),
    Device(DeviceFlowConfig),
    Introspect(IntrospectionRequest),
    TokenRefresh(TokenRefreshFlowConfig),
    TokenExchange(TokenExchangeInput),
}

/// DPoP key files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpopKeys {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

/// A validated command, ready to run.
#[derive(Debug)]
pub struct Invocation {
    pub config: OAuth2Config,
    pub dpop: Option<DpopKeys>,
    pub flow: FlowSpec,
}

impl Cli {
    /// Validate the arguments and resolve the command. Tokens given as `-`
    /// are read from `stdin`.
    pub fn prepare(self, stdin: &mut dyn BufRead) -> Result<Invocation, CliError> {
        let global = self.global;
        let (flow, dpop) = match self.command {
            Commands::AuthorizationCode(args) => args.resolve(&global)?,
            Commands::ClientCredentials(args) => args.resolve(&global)?,
            Commands::Device(args) => args.resolve(&global)?,
            Commands::Introspect(args) => args.resolve(&global, stdin)?,
            Commands::TokenRefresh(args) => args.resolve(&global, stdin)?,
            Commands::TokenExchange(args) => args.resolve(&global, stdin)?,
        };

        Ok(Invocation {
            config: global.to_config()?,
            dpop,
            flow,
        })
    }
}

impl GlobalArgs {
    /// Checks every command shares.
    fn require_issuer_and_client(&self) -> Result<(), CliError> {
        require(!self.issuer.is_empty(), "issuer is required")?;
        require(!self.client_id.is_empty(), "client-id is required")
    }

    fn to_config(&self) -> Result<OAuth2Config, OAuth2Error> {
        let mut builder = oauth2_config()
            .client_id(&self.client_id)
            .issuer(&self.issuer)
            .discovery_endpoint(&self.discovery_url)
            .authorization_endpoint(&self.authorization_url)
            .token_endpoint(&self.token_url)
            .device_authorization_endpoint(&self.device_authorization_url)
            .introspection_endpoint(&self.introspection_url)
            .pushed_authorization_request_endpoint(&self.par_url)
            .timeout(Duration::from_secs(self.timeout))
            .skip_tls_verify(self.skip_tls_verify);
        if !self.client_secret.is_empty() {
            builder = builder.client_secret(&self.client_secret);
        }
        if let Some(method) = self.auth_method {
            builder = builder.auth_method(method);
        }
        builder.build()
    }
}

fn require(condition: bool, message: &str) -> Result<(), CliError> {
    if condition {
        Ok(())
    } else {
        Err(CliError::InvalidArguments(message.to_string()))
    }
}

/// Read the first line of `stdin` when `value` is `-`.
fn token_from_stdin(value: String, stdin: &mut dyn BufRead) -> Result<Option<String>, CliError> {
    if value != "-" {
        return Ok(Some(value));
    }
    let mut line = String::new();
    if stdin.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

impl Invocation {
    /// Discover endpoints, build the client and run the flow. Returns the
    /// response as indented JSON.
    pub async fn run(mut self, cancel: &CancellationToken) -> OAuth2Result<String> {
        let transport = Arc::new(create_transport(
            self.config.timeout,
            self.config.skip_tls_verify,
        )?);

        let discovery = DefaultDiscoveryClient::new(transport.clone());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(OAuth2Error::Cancelled),
            result = discover_endpoints(&mut self.config, &discovery) => {
                result.context("failed to discover endpoints")?
            }
        }
        debug!(
            token_endpoint = %self.config.provider.token_endpoint,
            "endpoints resolved"
        );

        let mut client = OidcClient::with_transport(self.config, transport);
        if let Some(keys) = &self.dpop {
            let prover = KeyMaterialReader::load(&keys.private_key, &keys.public_key)
                .context("failed to read key files")?;
            client = client.with_dpop(Arc::new(prover));
        }

        let flow = build_flow(Arc::new(client), self.flow);
        let response = flow.run(cancel.clone()).await?;
        to_pretty_json(&response)
    }
}

fn build_flow(client: Arc<OidcClient>, flow: FlowSpec) -> Box<dyn Flow> {
    match flow {
        FlowSpec::AuthorizationCode(config) => Box::new(AuthorizationCodeFlow::new(client, config)),
        FlowSpec::ClientCredentials(config) => Box::new(ClientCredentialsFlow::new(client, config)),
        FlowSpec::Device(config) => Box::new(DeviceFlow::new(client, config)),
        FlowSpec::Introspect(request) => Box::new(IntrospectFlow::new(client, request)),
        FlowSpec::TokenRefresh(config) => Box::new(TokenRefreshFlow::new(client, config)),
        FlowSpec::TokenExchange(input) => Box::new(TokenExchangeFlow::new(client, input)),
    }
}
