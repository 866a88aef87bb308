//! OAuth2 Core Components
//!
//! Transport, response classification and the collaborators flows depend on.

pub mod auth_method;
pub mod browser;
pub mod classify;
pub mod discovery;
pub mod dpop;
pub mod pkce;
pub mod transport;

pub use browser::*;
pub use classify::*;
pub use discovery::*;
pub use dpop::*;
pub use pkce::*;
pub use transport::*;
