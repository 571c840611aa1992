//! Fully-read gateway responses.

use std::borrow::Cow;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use super::error::GatewayError;

/// A gateway response with its body read to completion.
///
/// Status interpretation is left to the caller, except for the authorization
/// recovery handled inside [`GatewayCall::send`](super::GatewayCall::send): a
/// response you receive here is never a 401.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl GatewayResponse {
    pub(crate) fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Looks up a response header, ignoring values that are not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Raw body bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Json`] carrying the offending body when
    /// deserialization fails.
    pub fn as_json<T: DeserializeOwned>(&self) -> Result<T, GatewayError> {
        serde_json::from_slice(&self.body).map_err(|error| GatewayError::Json {
            error,
            body: self.text().into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: StatusCode, body: &str) -> GatewayResponse {
        GatewayResponse::new(status, HeaderMap::new(), Bytes::copy_from_slice(body.as_bytes()))
    }

    #[test]
    fn should_deserialize_json_body() {
        let response = response(StatusCode::OK, r#"{"id":7,"name":"Seaview Suite"}"#);
        let value: serde_json::Value = response.as_json().expect("body should parse");
        assert_eq!(value["name"], "Seaview Suite");
    }

    #[test]
    fn should_carry_body_in_json_error() {
        let response = response(StatusCode::OK, "not json");
        let error = response
            .as_json::<serde_json::Value>()
            .expect_err("parsing should fail");
        assert!(matches!(error, GatewayError::Json { ref body, .. } if body == "not json"));
    }

    #[test]
    fn should_expose_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        let response = GatewayResponse::new(StatusCode::OK, headers, Bytes::new());

        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("x-missing"), None);
    }

    #[test]
    fn should_classify_success() {
        assert!(response(StatusCode::CREATED, "").is_success());
        assert!(!response(StatusCode::SERVICE_UNAVAILABLE, "").is_success());
    }
}
