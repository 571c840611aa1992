use std::net::Ipv4Addr;

use http::Uri;
use http::uri::{PathAndQuery, Scheme};

use crate::auth::{ClientCredentials, IdentityConfig, IdentityProvider, TokenManager};

use super::transport::{HttpTransport, Transport};
use super::{GatewayClient, GatewayError, PublicEndpoints};

/// Builder for creating [`GatewayClient`] instances.
///
/// # Default configuration
///
/// - **Scheme**: HTTP (use [`with_scheme`](Self::with_scheme) for HTTPS)
/// - **Host**: 127.0.0.1
/// - **Port**: 80
/// - **Base path**: none
/// - **Public paths**: `/auth/login` and `/auth/register`
///
/// An identity configuration is required by [`build`](Self::build); tests inject
/// doubles through [`build_with`](Self::build_with) instead.
///
/// # Example
///
/// ```rust,no_run
/// use http::uri::Scheme;
/// use roomgate_core::GatewayClient;
/// use roomgate_core::auth::IdentityConfig;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let identity = IdentityConfig::builder(
///     "https://id.roomgate.example",
///     "booking",
///     "frontend-service",
///     "frontend-secret",
/// )?
/// .build()?;
///
/// let client = GatewayClient::builder()
///     .with_scheme(Scheme::HTTPS)
///     .with_host("gateway.roomgate.example")
///     .with_port(443)
///     .with_base_path("/v1")?
///     .with_identity(identity)
///     .add_public_path("/health")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GatewayClientBuilder {
    client: reqwest::Client,
    scheme: Scheme,
    host: String,
    port: u16,
    base_path: Option<PathAndQuery>,
    identity: Option<IdentityConfig>,
    public: PublicEndpoints,
}

impl Default for GatewayClientBuilder {
    fn default() -> Self {
        Self {
            client: reqwest::Client::default(),
            scheme: Scheme::HTTP,
            host: Ipv4Addr::LOCALHOST.to_string(),
            port: 80,
            base_path: None,
            identity: None,
            public: PublicEndpoints::default(),
        }
    }
}

impl GatewayClientBuilder {
    /// Sets the HTTP scheme used for gateway calls.
    #[must_use]
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Sets the gateway hostname.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the gateway port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets a path prefix prepended to every request path (e.g. `/v1`).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidBasePath`] when the value is not a valid URI
    /// path.
    pub fn with_base_path(mut self, base_path: &str) -> Result<Self, GatewayError> {
        let parsed = base_path
            .parse::<PathAndQuery>()
            .map_err(|error| GatewayError::InvalidBasePath {
                reason: error.to_string(),
            })?;
        self.base_path = Some(parsed);
        Ok(self)
    }

    /// Supplies the `reqwest::Client` shared by the transport and the token fetches.
    ///
    /// Useful for custom timeouts or proxies; the default client is used otherwise.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Sets the identity-provider configuration used for the client-credentials
    /// grant.
    #[must_use]
    pub fn with_identity(mut self, identity: IdentityConfig) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Marks an additional path prefix as public (sent without authorization).
    #[must_use]
    pub fn add_public_path(mut self, prefix: impl Into<String>) -> Self {
        self.public.push(prefix);
        self
    }

    /// Builds a client over the default reqwest transport and client-credentials
    /// token source.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] when no identity configuration was
    /// provided, or an URI assembly error for invalid host/port/base-path
    /// combinations.
    pub fn build(self) -> Result<GatewayClient, GatewayError> {
        let Some(identity) = self.identity.clone() else {
            return Err(GatewayError::Configuration {
                reason: "an identity configuration is required; set one with with_identity"
                    .to_string(),
            });
        };

        let credentials = ClientCredentials::new(self.client.clone(), identity);
        let transport = HttpTransport::new(self.client.clone());
        self.assemble(transport, credentials)
    }

    /// Builds a client over a custom transport and token source.
    ///
    /// This is the seam used by tests to script gateway responses and token grants.
    ///
    /// # Errors
    ///
    /// Returns an URI assembly error for invalid host/port/base-path combinations.
    pub fn build_with<T, P>(
        self,
        transport: T,
        identity: P,
    ) -> Result<GatewayClient<T, P>, GatewayError>
    where
        T: Transport,
        P: IdentityProvider,
    {
        self.assemble(transport, identity)
    }

    fn assemble<T, P>(
        self,
        transport: T,
        identity: P,
    ) -> Result<GatewayClient<T, P>, GatewayError>
    where
        T: Transport,
        P: IdentityProvider,
    {
        let Self {
            scheme,
            host,
            port,
            base_path,
            public,
            ..
        } = self;

        let builder = Uri::builder()
            .scheme(scheme)
            .authority(format!("{host}:{port}"));
        let builder = if let Some(path) = &base_path {
            builder.path_and_query(path.path())
        } else {
            builder.path_and_query("/")
        };
        let base_uri = builder.build()?;

        Ok(GatewayClient::assemble(
            transport,
            TokenManager::new(identity),
            public,
            base_uri,
        ))
    }
}
