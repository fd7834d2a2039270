//! Interactive OAuth 2.0 / OpenID Connect login
//!
//! Supports:
//! - OpenID Connect providers (discovery, authorization code + PKCE, ID token verification)
//! - GitHub OAuth Apps (authorization code + PKCE, REST user profile)
//!
//! The protocol work is delegated to the `openidconnect` and `oauth2` crates;
//! this module provides the loopback redirect listener and browser launch.

mod browser;
mod callback;
pub mod error;
mod github;
mod oidc;
mod service;
mod templates;
pub mod types;

pub use error::AuthError;
pub use service::{AuthenticationService, OidcClientService};
pub use types::{AuthenticationResult, Provider};
