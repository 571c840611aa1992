//! Client-credentials token fetch against the identity provider.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::debug;

use super::config::IdentityConfig;
use super::error::TokenError;
use super::token::AccessToken;

/// Source of freshly issued access tokens.
///
/// This trait is the seam between the cache-and-expiry logic in
/// [`TokenManager`](super::TokenManager) and the wire protocol; tests substitute
/// scripted implementations for it.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Obtains a new token from the identity provider.
    fn fetch_token(&self) -> impl Future<Output = Result<AccessToken, TokenError>> + Send;
}

/// Fetches tokens with the OAuth2 client-credentials grant.
///
/// Posts a form-encoded request to the realm's token endpoint, as the identity
/// provider expects for machine-to-machine authentication. Shares the application's
/// `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    client: reqwest::Client,
    config: IdentityConfig,
}

/// Successful token response body.
#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    /// Advertised lifetime in seconds.
    expires_in: u64,
}

/// Error body returned by the identity provider on a rejected request.
#[derive(Debug, Deserialize)]
struct TokenEndpointError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenEndpointError {
    fn description(self) -> String {
        self.error_description.unwrap_or(self.error)
    }
}

impl ClientCredentials {
    /// Creates a new fetcher from a shared HTTP client and identity settings.
    pub fn new(client: reqwest::Client, config: IdentityConfig) -> Self {
        Self { client, config }
    }

    async fn request_grant(&self) -> Result<TokenGrant, TokenError> {
        let params = &[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ];
        let body =
            serde_urlencoded::to_string(params).map_err(|error| TokenError::Configuration {
                reason: format!("credential form encoding: {error}"),
            })?;

        let response = self
            .client
            .post(self.config.token_url())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let description = match response.json::<TokenEndpointError>().await {
                Ok(body) => body.description(),
                Err(_) => "no error description provided".to_string(),
            };
            return Err(TokenError::Endpoint {
                status: status.as_u16(),
                description,
            });
        }

        response
            .json::<TokenGrant>()
            .await
            .map_err(|error| TokenError::InvalidResponse {
                reason: error.to_string(),
            })
    }
}

impl IdentityProvider for ClientCredentials {
    async fn fetch_token(&self) -> Result<AccessToken, TokenError> {
        let grant = self.request_grant().await?;
        debug!(expires_in = grant.expires_in, "token grant received");
        Ok(AccessToken::from_grant(
            grant.access_token,
            Duration::from_secs(grant.expires_in),
            self.config.safety_margin(),
        ))
    }
}
