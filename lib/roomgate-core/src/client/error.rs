use uuid::Uuid;

use crate::auth::TokenError;

/// Errors surfaced by the gateway client.
///
/// Token-acquisition failures, transport failures, and terminal authorization
/// failures are distinct kinds because callers react differently to each: a
/// [`TokenAcquisition`](Self::TokenAcquisition) means the request was never
/// dispatched, while an [`Authorization`](Self::Authorization) means the single
/// token-refresh retry has already been spent.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum GatewayError {
    /// A service token could not be acquired; the request was never dispatched.
    TokenAcquisition(TokenError),

    /// The transport failed before a response was produced.
    #[display("transport error: {inner}")]
    #[from(skip)]
    Transport {
        /// The underlying transport failure.
        inner: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The gateway rejected the request with 401 even after the single
    /// token-refresh retry. Terminal: the caller must treat the session as
    /// unauthorized.
    #[display("authorization failed after retry (status {status}, correlation {correlation_id}): {body}")]
    #[from(skip)]
    Authorization {
        /// Final status returned by the gateway.
        status: u16,
        /// Final response body, for diagnosis.
        body: String,
        /// Correlation id shared by the initial attempt and its retry.
        correlation_id: Uuid,
    },

    /// URL construction from the base URI and request path failed.
    Url(url::ParseError),

    /// HTTP protocol error while assembling the client or request.
    Http(http::Error),

    /// Invalid HTTP header name.
    InvalidHeaderName(http::header::InvalidHeaderName),

    /// Invalid HTTP header value; a bearer token with non-ASCII bytes lands here.
    InvalidHeaderValue(http::header::InvalidHeaderValue),

    /// JSON serialization of a request body failed.
    JsonBody(serde_json::Error),

    /// Response body could not be decoded as the expected JSON.
    #[display("failed to deserialize JSON: {error}\n{body}")]
    #[from(skip)]
    Json {
        /// The underlying JSON parsing error.
        error: serde_json::Error,
        /// The response body that failed to parse.
        body: String,
    },

    /// Query parameter serialization failed.
    QuerySerialization(serde_urlencoded::ser::Error),

    /// Invalid base path configuration.
    #[display("invalid base path: {reason}")]
    #[from(skip)]
    InvalidBasePath {
        /// Description of why the base path is invalid.
        reason: String,
    },

    /// The client was assembled without required settings.
    #[display("client configuration error: {reason}")]
    #[from(skip)]
    Configuration {
        /// Description of the configuration issue.
        reason: String,
    },
}

impl GatewayError {
    /// Wraps a transport failure.
    pub(crate) fn transport<E>(inner: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            inner: Box::new(inner),
        }
    }
}
