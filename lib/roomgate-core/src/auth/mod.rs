//! Service-to-service authentication against the platform identity provider.
//!
//! The Roomgate gateway expects a bearer token obtained with the OAuth2
//! client-credentials grant. [`TokenManager`] is the single owner of the cached
//! token: it serves cache hits without I/O, refreshes through one in-flight fetch
//! at a time, and invalidates on demand when the gateway rejects a token.
//!
//! The wire protocol lives behind the [`IdentityProvider`] trait so the lifecycle
//! logic is testable without an identity provider; [`ClientCredentials`] is the
//! production implementation.

mod config;
mod credentials;
mod error;
mod manager;
mod secret;
mod token;

pub use self::config::{DEFAULT_SAFETY_MARGIN, IdentityConfig, IdentityConfigBuilder};
pub use self::credentials::{ClientCredentials, IdentityProvider};
pub use self::error::TokenError;
pub use self::manager::{TokenManager, TokenStats};
pub use self::secret::SecretString;
pub use self::token::{AccessToken, TokenCache};
