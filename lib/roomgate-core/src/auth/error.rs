//! Token-acquisition error types.

/// Errors raised while obtaining a service token from the identity provider.
///
/// The token manager never retries on its own; the gateway client decides whether
/// the enclosing request is retried.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum TokenError {
    /// The identity provider answered the token request with a non-success status.
    #[display("token endpoint rejected the request ({status}): {description}")]
    #[from(skip)]
    Endpoint {
        /// HTTP status returned by the token endpoint.
        status: u16,
        /// Provider-supplied `error_description`, or a fallback when absent.
        description: String,
    },

    /// The identity provider could not be reached.
    Network(reqwest::Error),

    /// The token response could not be understood.
    #[display("invalid token response: {reason}")]
    #[from(skip)]
    InvalidResponse {
        /// Description of what was malformed.
        reason: String,
    },

    /// The refresh task ended without producing a grant.
    #[display("token refresh was interrupted before completing")]
    Interrupted,

    /// The identity configuration is unusable.
    #[display("identity configuration error: {reason}")]
    #[from(skip)]
    Configuration {
        /// Description of the configuration issue.
        reason: String,
    },
}
