use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use http::{Method, Uri};

use crate::auth::{ClientCredentials, IdentityProvider, TokenManager, TokenStats};

mod builder;
pub use self::builder::GatewayClientBuilder;

mod call;
pub use self::call::{Attempt, GatewayCall};

mod error;
pub use self::error::GatewayError;

mod public;
pub use self::public::PublicEndpoints;

mod response;
pub use self::response::GatewayResponse;

mod transport;
pub use self::transport::{HttpTransport, Transport};


/// HTTP client for the booking gateway.
///
/// Every non-public request is dispatched with a service bearer token obtained from
/// the shared [`TokenManager`]; a 401 triggers one transparent token refresh and
/// resend. Use [`GatewayClient::builder`] to create instances.
///
/// # Example
///
/// ```rust,no_run
/// use roomgate_core::GatewayClient;
/// use roomgate_core::auth::IdentityConfig;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let identity = IdentityConfig::builder(
///     "https://id.roomgate.example",
///     "booking",
///     "frontend-service",
///     "frontend-secret",
/// )?
/// .build()?;
///
/// let client = GatewayClient::builder()
///     .with_host("gateway.roomgate.example")
///     .with_identity(identity)
///     .build()?;
///
/// let orders = client
///     .get("/orders")
///     .with_query(&[("page", "1")])?
///     .send()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// # Thread safety
///
/// The client is cheap to clone; clones share the transport, the token cache, and
/// the retry counter. Concurrent requests racing an empty token cache coalesce onto
/// a single identity-provider fetch.
#[derive(Debug)]
pub struct GatewayClient<T = HttpTransport, P = ClientCredentials> {
    transport: Arc<T>,
    tokens: Arc<TokenManager<P>>,
    public: PublicEndpoints,
    base_uri: Uri,
    retries: Arc<AtomicU64>,
}

impl<T, P> Clone for GatewayClient<T, P> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            tokens: Arc::clone(&self.tokens),
            public: self.public.clone(),
            base_uri: self.base_uri.clone(),
            retries: Arc::clone(&self.retries),
        }
    }
}

impl GatewayClient {
    /// Creates a builder with default settings.
    pub fn builder() -> GatewayClientBuilder {
        GatewayClientBuilder::default()
    }
}

impl<T, P> GatewayClient<T, P> {
    pub(crate) fn assemble(
        transport: T,
        tokens: TokenManager<P>,
        public: PublicEndpoints,
        base_uri: Uri,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            tokens: Arc::new(tokens),
            public,
            base_uri,
            retries: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Starts a request with an arbitrary method.
    pub fn call(&self, method: Method, path: impl Into<String>) -> GatewayCall<T, P> {
        GatewayCall::build(
            Arc::clone(&self.transport),
            Arc::clone(&self.tokens),
            self.public.clone(),
            self.base_uri.clone(),
            method,
            path.into(),
            Arc::clone(&self.retries),
        )
    }

    /// Starts a GET request.
    pub fn get(&self, path: impl Into<String>) -> GatewayCall<T, P> {
        self.call(Method::GET, path)
    }

    /// Starts a POST request.
    pub fn post(&self, path: impl Into<String>) -> GatewayCall<T, P> {
        self.call(Method::POST, path)
    }

    /// Starts a PUT request.
    pub fn put(&self, path: impl Into<String>) -> GatewayCall<T, P> {
        self.call(Method::PUT, path)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, path: impl Into<String>) -> GatewayCall<T, P> {
        self.call(Method::DELETE, path)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, path: impl Into<String>) -> GatewayCall<T, P> {
        self.call(Method::PATCH, path)
    }

    /// Number of authorization-triggered retries performed so far.
    pub fn auth_retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }
}

impl<T, P: IdentityProvider> GatewayClient<T, P> {
    /// Snapshot of the token manager's activity counters.
    pub fn token_stats(&self) -> TokenStats {
        self.tokens.stats()
    }
}
