//! Identity-provider configuration.

use std::fmt;
use std::time::Duration;

use url::Url;

use super::error::TokenError;
use super::secret::SecretString;

/// Default safety margin subtracted from a grant's advertised lifetime (60 seconds).
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Connection settings for the platform identity provider.
///
/// Use [`IdentityConfig::builder`] to create instances:
///
/// ```rust
/// use roomgate_core::auth::IdentityConfig;
///
/// # fn example() -> Result<(), roomgate_core::auth::TokenError> {
/// let identity = IdentityConfig::builder(
///     "https://id.roomgate.example",
///     "booking",
///     "frontend-service",
///     "frontend-secret",
/// )?
/// .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct IdentityConfig {
    pub(crate) base_url: Url,
    pub(crate) realm: String,
    pub(crate) client_id: String,
    pub(crate) client_secret: SecretString,
    pub(crate) safety_margin: Duration,
}

impl IdentityConfig {
    /// Creates a builder for the client-credentials grant.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Configuration`] if `base_url` is not a valid URL.
    pub fn builder(
        base_url: impl AsRef<str>,
        realm: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<SecretString>,
    ) -> Result<IdentityConfigBuilder, TokenError> {
        let base_url =
            Url::parse(base_url.as_ref()).map_err(|error| TokenError::Configuration {
                reason: format!("invalid identity provider URL '{}': {error}", base_url.as_ref()),
            })?;

        Ok(IdentityConfigBuilder {
            base_url,
            realm: realm.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            safety_margin: DEFAULT_SAFETY_MARGIN,
        })
    }

    /// Renders the token endpoint for the configured realm.
    pub fn token_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.base_url.as_str().trim_end_matches('/'),
            self.realm
        )
    }

    /// Safety margin applied to every grant issued with this configuration.
    pub fn safety_margin(&self) -> Duration {
        self.safety_margin
    }
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("IdentityConfig")
            .field("base_url", &self.base_url)
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("safety_margin", &self.safety_margin)
            .finish()
    }
}

/// Builder for [`IdentityConfig`].
#[derive(Debug, Clone)]
pub struct IdentityConfigBuilder {
    base_url: Url,
    realm: String,
    client_id: String,
    client_secret: SecretString,
    safety_margin: Duration,
}

impl IdentityConfigBuilder {
    /// Overrides the safety margin subtracted from each grant's lifetime.
    #[must_use]
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Configuration`] when the realm, client id, or client
    /// secret is empty — the client-credentials grant needs all three.
    pub fn build(self) -> Result<IdentityConfig, TokenError> {
        if self.realm.is_empty() {
            return Err(TokenError::Configuration {
                reason: "realm must not be empty".to_string(),
            });
        }
        if self.client_id.is_empty() {
            return Err(TokenError::Configuration {
                reason: "client id must not be empty".to_string(),
            });
        }
        if self.client_secret.as_str().is_empty() {
            return Err(TokenError::Configuration {
                reason: "client credentials flow requires a client secret".to_string(),
            });
        }

        Ok(IdentityConfig {
            base_url: self.base_url,
            realm: self.realm,
            client_id: self.client_id,
            client_secret: self.client_secret,
            safety_margin: self.safety_margin,
        })
    }
}
