//! Transport seam between the dispatch pipeline and the HTTP stack.

use reqwest::Body;
use tracing::debug;

use super::call::Attempt;
use super::response::GatewayResponse;

/// Executes a single wire attempt.
///
/// The pipeline in [`GatewayCall::send`](super::GatewayCall::send) only ever talks
/// to this trait, so authorization and retry behavior can be exercised against
/// scripted transports without a network.
pub trait Transport: Send + Sync + 'static {
    /// Transport-level failure (connection, protocol); surfaced to callers as
    /// [`GatewayError::Transport`](super::GatewayError::Transport).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Dispatches the attempt and reads the response in full.
    fn execute(
        &self,
        attempt: &Attempt,
    ) -> impl Future<Output = Result<GatewayResponse, Self::Error>> + Send;
}

/// Default transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport over an existing client, so connection pools are shared
    /// with the token fetches.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    type Error = reqwest::Error;

    async fn execute(&self, attempt: &Attempt) -> Result<GatewayResponse, reqwest::Error> {
        let mut request = reqwest::Request::new(attempt.method().clone(), attempt.url().clone());
        *request.headers_mut() = attempt.headers().clone();
        if let Some(body) = attempt.body() {
            *request.body_mut() = Some(Body::from(body.clone()));
        }

        debug!(correlation_id = %attempt.correlation_id(), ?request, "sending...");
        let response = self.client.execute(request).await?;
        debug!(correlation_id = %attempt.correlation_id(), ?response, "...receiving");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(GatewayResponse::new(status, headers, body))
    }
}
