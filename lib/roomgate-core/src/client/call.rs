//! Request attempts and the authorized dispatch pipeline.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode, Uri};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::auth::{IdentityProvider, TokenManager};

use super::error::GatewayError;
use super::public::PublicEndpoints;
use super::response::GatewayResponse;
use super::transport::Transport;

/// One immutable wire attempt.
///
/// A logical request is at most two attempts sharing a correlation id: the initial
/// dispatch and, after an authorization failure, a single retry carrying a fresh
/// bearer. The retry flag moves false→true exactly once, in [`Attempt::into_retry`],
/// which is what bounds recovery to a single resend even when the identity provider
/// keeps issuing tokens the gateway rejects.
#[derive(Debug, Clone)]
pub struct Attempt {
    correlation_id: Uuid,
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    retried: bool,
}

impl Attempt {
    pub(crate) fn new(method: Method, url: Url, headers: HeaderMap, body: Option<Bytes>) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            method,
            url,
            headers,
            body,
            retried: false,
        }
    }

    /// Correlation id shared by the initial attempt and its retry.
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Fully resolved request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request body, if any.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Whether this attempt is the post-401 retry.
    pub fn is_retry(&self) -> bool {
        self.retried
    }

    /// Snapshot for the single authorization retry.
    pub(crate) fn into_retry(self) -> Self {
        debug_assert!(!self.retried, "a request is retried at most once");
        Self {
            retried: true,
            ..self
        }
    }

    /// Returns a copy with the bearer attached, replacing any previous value.
    pub(crate) fn with_bearer(mut self, token: &str) -> Result<Self, GatewayError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }
}

/// A request under construction against the gateway.
///
/// Obtained from [`GatewayClient::get`](super::GatewayClient::get) and friends.
/// Dispatch with [`send`](Self::send), or await the call directly.
#[derive(Debug)]
pub struct GatewayCall<T, P> {
    transport: Arc<T>,
    tokens: Arc<TokenManager<P>>,
    public: PublicEndpoints,
    base_uri: Uri,
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Option<Bytes>,
    retries: Arc<AtomicU64>,
}

impl<T, P> GatewayCall<T, P> {
    pub(crate) fn build(
        transport: Arc<T>,
        tokens: Arc<TokenManager<P>>,
        public: PublicEndpoints,
        base_uri: Uri,
        method: Method,
        path: String,
        retries: Arc<AtomicU64>,
    ) -> Self {
        Self {
            transport,
            tokens,
            public,
            base_uri,
            method,
            path,
            query: None,
            headers: HeaderMap::new(),
            body: None,
            retries,
        }
    }

    /// Adds a request header; setting the same name twice keeps the later value.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidHeaderName`] or
    /// [`GatewayError::InvalidHeaderValue`] for values that cannot appear in HTTP
    /// headers.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, GatewayError> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Serializes query parameters onto the request URL.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::QuerySerialization`] when the value cannot be encoded
    /// as a query string.
    pub fn with_query<Q: Serialize>(mut self, query: &Q) -> Result<Self, GatewayError> {
        let rendered = serde_urlencoded::to_string(query)?;
        self.query = (!rendered.is_empty()).then_some(rendered);
        Ok(self)
    }

    /// Sets a JSON request body and the matching content type.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::JsonBody`] when serialization fails.
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, GatewayError> {
        let data = serde_json::to_vec(body)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(data));
        Ok(self)
    }

    /// Sets a plain-text request body.
    pub fn text(mut self, body: &str) -> Self {
        self.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.body = Some(Bytes::copy_from_slice(body.as_bytes()));
        self
    }
}

impl<T, P> GatewayCall<T, P>
where
    T: Transport,
    P: IdentityProvider,
{
    /// Dispatches the request.
    ///
    /// Public paths are sent bare. Everything else gets `Authorization: Bearer
    /// <token>` from the token manager before dispatch; a 401 on a first attempt
    /// clears the cached token, acquires a fresh one, and resends the same request
    /// exactly once. A 401 on the retried attempt is terminal
    /// ([`GatewayError::Authorization`]). Any other status is returned to the caller
    /// uninterpreted.
    ///
    /// # Errors
    ///
    /// [`GatewayError::TokenAcquisition`] when no token could be obtained (the
    /// request is never dispatched without one), [`GatewayError::Transport`] when
    /// the wire fails, and [`GatewayError::Authorization`] as above.
    pub async fn send(self) -> Result<GatewayResponse, GatewayError> {
        let Self {
            transport,
            tokens,
            public,
            base_uri,
            method,
            path,
            query,
            headers,
            body,
            retries,
        } = self;

        let url = build_url(&base_uri, &path, query.as_deref())?;
        let mut attempt = Attempt::new(method, url, headers, body);

        if public.matches(&path) {
            debug!(
                correlation_id = %attempt.correlation_id(),
                %path,
                "public endpoint, dispatching without authorization"
            );
            return transport
                .execute(&attempt)
                .await
                .map_err(GatewayError::transport);
        }

        let token = tokens.get_token().await?;
        attempt = attempt.with_bearer(token.value())?;
        let mut response = transport
            .execute(&attempt)
            .await
            .map_err(GatewayError::transport)?;

        if response.status() == StatusCode::UNAUTHORIZED && !attempt.is_retry() {
            warn!(
                correlation_id = %attempt.correlation_id(),
                %path,
                "gateway rejected the token, refreshing for a single retry"
            );
            retries.fetch_add(1, Ordering::Relaxed);
            tokens.clear_token().await;
            let token = tokens.get_token().await?;
            attempt = attempt.into_retry().with_bearer(token.value())?;
            response = transport
                .execute(&attempt)
                .await
                .map_err(GatewayError::transport)?;
        }

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Authorization {
                status: response.status().as_u16(),
                body: response.text().into_owned(),
                correlation_id: attempt.correlation_id(),
            });
        }

        Ok(response)
    }
}

impl<T, P> IntoFuture for GatewayCall<T, P>
where
    T: Transport,
    P: IdentityProvider,
{
    type Output = Result<GatewayResponse, GatewayError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.send())
    }
}

fn build_url(base_uri: &Uri, path: &str, query: Option<&str>) -> Result<Url, GatewayError> {
    let base = base_uri.to_string();
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = joined.parse::<Url>()?;
    if let Some(query) = query {
        url.set_query(Some(query));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::auth::{AccessToken, TokenError};
    use crate::client::GatewayClient;

    fn response(status: StatusCode, body: &str) -> GatewayResponse {
        GatewayResponse::new(status, HeaderMap::new(), Bytes::copy_from_slice(body.as_bytes()))
    }

    /// Replays queued responses and records every attempt it sees.
    #[derive(Debug, Default)]
    struct ScriptedTransport {
        responses: Mutex<VecDeque<GatewayResponse>>,
        seen: Arc<Mutex<Vec<Attempt>>>,
    }

    impl ScriptedTransport {
        fn replaying(responses: impl IntoIterator<Item = GatewayResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                seen: Arc::default(),
            }
        }

        fn seen_handle(&self) -> Arc<Mutex<Vec<Attempt>>> {
            Arc::clone(&self.seen)
        }
    }

    impl Transport for ScriptedTransport {
        type Error = std::io::Error;

        async fn execute(&self, attempt: &Attempt) -> Result<GatewayResponse, std::io::Error> {
            self.seen.lock().expect("seen lock").push(attempt.clone());
            self.responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .ok_or_else(|| std::io::Error::other("connection reset by peer"))
        }
    }

    /// Issues `"service-token-1"`, `"service-token-2"`, ...
    #[derive(Debug, Default)]
    struct SequencedIdentity {
        issued: AtomicU64,
    }

    impl IdentityProvider for SequencedIdentity {
        async fn fetch_token(&self) -> Result<AccessToken, TokenError> {
            let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(AccessToken::from_grant(
                format!("service-token-{sequence}"),
                Duration::from_secs(300),
                Duration::from_secs(60),
            ))
        }
    }

    fn client_with(
        transport: ScriptedTransport,
    ) -> (GatewayClient<ScriptedTransport, SequencedIdentity>, Arc<Mutex<Vec<Attempt>>>) {
        let seen = transport.seen_handle();
        let client = GatewayClient::builder()
            .with_host("gateway.test")
            .build_with(transport, SequencedIdentity::default())
            .expect("client should build");
        (client, seen)
    }

    fn bearer_of(attempt: &Attempt) -> Option<String> {
        attempt
            .headers()
            .get(AUTHORIZATION)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
    }

    #[test]
    fn retry_snapshot_shares_correlation_id_and_sets_flag() {
        let url = "http://gateway.test/orders".parse().expect("url");
        let attempt = Attempt::new(Method::GET, url, HeaderMap::new(), None);
        let correlation_id = attempt.correlation_id();
        assert!(!attempt.is_retry());

        let retry = attempt.into_retry();
        assert!(retry.is_retry());
        assert_eq!(retry.correlation_id(), correlation_id);
    }

    #[test]
    fn bearer_replaces_previous_value() {
        let url = "http://gateway.test/orders".parse().expect("url");
        let attempt = Attempt::new(Method::GET, url, HeaderMap::new(), None)
            .with_bearer("stale")
            .expect("first bearer")
            .with_bearer("fresh")
            .expect("second bearer");

        assert_eq!(bearer_of(&attempt), Some("Bearer fresh".to_string()));
        assert_eq!(attempt.headers().get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn bearer_with_invalid_bytes_is_rejected() {
        let url = "http://gateway.test/orders".parse().expect("url");
        let result = Attempt::new(Method::GET, url, HeaderMap::new(), None).with_bearer("no\0pe");
        assert!(matches!(
            result.expect_err("should fail"),
            GatewayError::InvalidHeaderValue(_)
        ));
    }

    #[test]
    fn should_join_base_uri_path_and_query() {
        let base: Uri = "http://gateway.test:8080/api".parse().expect("uri");
        let url = build_url(&base, "/orders", Some("page=2")).expect("url");
        assert_eq!(url.as_str(), "http://gateway.test:8080/api/orders?page=2");
    }

    #[tokio::test]
    async fn should_recover_from_single_401_with_fresh_token() {
        let transport = ScriptedTransport::replaying([
            response(StatusCode::UNAUTHORIZED, "token expired"),
            response(StatusCode::OK, r#"[{"orderId":1}]"#),
        ]);
        let (client, seen) = client_with(transport);

        let result = client.get("/orders").send().await.expect("retried response");
        assert_eq!(result.status(), StatusCode::OK);
        assert_eq!(client.auth_retries(), 1);

        let seen = seen.lock().expect("seen lock");
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].correlation_id(), seen[1].correlation_id());
        assert!(!seen[0].is_retry());
        assert!(seen[1].is_retry());
        assert_eq!(bearer_of(&seen[0]), Some("Bearer service-token-1".to_string()));
        assert_eq!(bearer_of(&seen[1]), Some("Bearer service-token-2".to_string()));

        let stats = client.token_stats();
        assert_eq!(stats.fetches, 2);
        assert_eq!(stats.clears, 1);
    }

    #[tokio::test]
    async fn should_stop_after_retried_401() {
        let transport = ScriptedTransport::replaying([
            response(StatusCode::UNAUTHORIZED, "token expired"),
            response(StatusCode::UNAUTHORIZED, "token rejected"),
        ]);
        let (client, seen) = client_with(transport);

        let error = client.get("/orders").send().await.expect_err("terminal 401");
        assert!(matches!(
            error,
            GatewayError::Authorization { status: 401, ref body, .. } if body == "token rejected"
        ));

        // exactly one retry, never a third attempt
        assert_eq!(seen.lock().expect("seen lock").len(), 2);
        assert_eq!(client.auth_retries(), 1);
    }

    #[tokio::test]
    async fn should_send_public_paths_without_token_lookup() {
        let transport =
            ScriptedTransport::replaying([response(StatusCode::OK, r#"{"session":"s-1"}"#)]);
        let (client, seen) = client_with(transport);

        let result = client.post("/auth/login").send().await.expect("response");
        assert!(result.is_success());

        let seen = seen.lock().expect("seen lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(bearer_of(&seen[0]), None);
        assert_eq!(client.token_stats().lookups, 0);
    }

    #[tokio::test]
    async fn should_pass_non_401_errors_through_without_retry() {
        let transport =
            ScriptedTransport::replaying([response(StatusCode::SERVICE_UNAVAILABLE, "maintenance")]);
        let (client, seen) = client_with(transport);

        let result = client.get("/orders").send().await.expect("response");
        assert_eq!(result.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(result.text(), "maintenance");

        assert_eq!(seen.lock().expect("seen lock").len(), 1);
        assert_eq!(client.auth_retries(), 0);
    }

    #[tokio::test]
    async fn should_propagate_transport_failure() {
        // empty script: every dispatch fails at the wire
        let transport = ScriptedTransport::default();
        let (client, _seen) = client_with(transport);

        let error = client.get("/orders").send().await.expect_err("transport failure");
        assert!(matches!(error, GatewayError::Transport { .. }));
    }

    #[tokio::test]
    async fn should_attach_json_body_and_content_type() {
        let transport = ScriptedTransport::replaying([response(StatusCode::CREATED, "{}")]);
        let (client, seen) = client_with(transport);

        client
            .post("/orders")
            .json(&serde_json::json!({"roomId": 7, "nights": 2}))
            .expect("body should serialize")
            .send()
            .await
            .expect("response");

        let seen = seen.lock().expect("seen lock");
        assert_eq!(
            seen[0].headers().get(CONTENT_TYPE).map(|value| value.as_bytes()),
            Some(b"application/json".as_slice())
        );
        assert_eq!(
            seen[0].body().map(|body| body.as_ref()),
            Some(br#"{"nights":2,"roomId":7}"#.as_slice())
        );
    }

    #[tokio::test]
    async fn should_serialize_query_parameters() {
        let transport = ScriptedTransport::replaying([response(StatusCode::OK, "[]")]);
        let (client, seen) = client_with(transport);

        client
            .get("/rooms")
            .with_query(&[("checkIn", "2026-08-10"), ("guests", "2")])
            .expect("query should serialize")
            .send()
            .await
            .expect("response");

        let seen = seen.lock().expect("seen lock");
        assert_eq!(
            seen[0].url().as_str(),
            "http://gateway.test/rooms?checkIn=2026-08-10&guests=2"
        );
    }
}
