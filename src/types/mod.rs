//! OAuth2 Types
//!
//! Core type definitions for OAuth2/OIDC operations.

pub mod auth;
pub mod callback;
pub mod config;
pub mod device;
pub mod introspection;
pub mod token;

pub use auth::*;
pub use callback::*;
pub use config::*;
pub use device::*;
pub use introspection::*;
pub use token::*;
