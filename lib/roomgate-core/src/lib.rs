//! # Roomgate Core
//!
//! HTTP client core for the Roomgate booking platform frontend.
//!
//! Every call the application makes — rooms, orders, users, payments, reviews — goes
//! through the API gateway with a service-level bearer token. This crate owns the two
//! pieces that make that transparent:
//!
//! - **[`auth::TokenManager`]** — acquires a token from the identity provider with the
//!   OAuth2 client-credentials grant, caches it until a safety margin before its
//!   advertised expiry, and coalesces concurrent refreshes into a single fetch.
//! - **[`GatewayClient`]** — attaches `Authorization: Bearer <token>` to every
//!   non-public request, and on a 401 clears the cached token, acquires a fresh one
//!   and resends the request exactly once before surfacing a terminal
//!   [`GatewayError::Authorization`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use roomgate_core::GatewayClient;
//! use roomgate_core::auth::IdentityConfig;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let identity = IdentityConfig::builder(
//!     "https://id.roomgate.example",
//!     "booking",
//!     "frontend-service",
//!     "frontend-secret",
//! )?
//! .build()?;
//!
//! let client = GatewayClient::builder()
//!     .with_host("gateway.roomgate.example")
//!     .with_identity(identity)
//!     .build()?;
//!
//! // The first non-public call fetches and caches the service token.
//! let rooms: serde_json::Value = client.get("/rooms").send().await?.as_json()?;
//!
//! // Login is public: dispatched without an Authorization header, no token I/O.
//! let session = client.post("/auth/login").json(&serde_json::json!({
//!     "email": "guest@example.com",
//!     "password": "hunter2",
//! }))?.send().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error kinds
//!
//! [`GatewayClient::send`](GatewayCall::send) distinguishes three failure families:
//! token acquisition failed (the request was never dispatched), the transport failed,
//! or the gateway still answered 401 after the single token-refresh retry. Any other
//! status — including other error statuses — is returned as a [`GatewayResponse`] for
//! the caller to interpret.
//!
//! ## Testing
//!
//! The dispatch pipeline only talks to the [`Transport`] trait and the token manager
//! only talks to [`auth::IdentityProvider`], so both can be exercised with scripted
//! implementations and no network.

pub mod auth;

mod client;

pub use self::client::{
    Attempt, GatewayCall, GatewayClient, GatewayClientBuilder, GatewayError, GatewayResponse,
    HttpTransport, PublicEndpoints, Transport,
};
