//! Builders
//!
//! Fluent builders for configuration and per-grant token requests.

pub mod config;
pub mod token_request;

pub use config::{oauth2_config, OAuth2ConfigBuilder};
pub use token_request::TokenRequestBuilder;
