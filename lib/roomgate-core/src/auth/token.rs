//! Access tokens and the shared token cache.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A bearer token for gateway calls, valid until a margin-adjusted expiry instant.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessToken {
    value: String,
    #[zeroize(skip)]
    expires_at: Instant,
}

impl AccessToken {
    /// Creates a token from a grant response.
    ///
    /// The expiry is `now + expires_in − safety_margin`: the token is treated as
    /// expired slightly before the provider would reject it, so a request issued
    /// near the advertised expiry never carries a token that dies mid-flight. A
    /// margin at or above the advertised lifetime yields an already-expired token.
    pub fn from_grant(
        value: impl Into<String>,
        expires_in: Duration,
        safety_margin: Duration,
    ) -> Self {
        let lifetime = expires_in.saturating_sub(safety_margin);
        Self {
            value: value.into(),
            expires_at: Instant::now() + lifetime,
        }
    }

    /// Returns the raw bearer value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Checks whether the margin-adjusted expiry has passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Time remaining before the margin-adjusted expiry, if any.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        let now = Instant::now();
        (now < self.expires_at).then(|| self.expires_at - now)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Shared cache holding at most one service token.
///
/// Handles are cheap clones of the same cell. The cache never hands out a token past
/// its adjusted expiry, reads always see a complete token, and both `set` and `clear`
/// hold the write lock only for the swap itself — clearing one stale token never
/// blocks unrelated requests that already read a valid one.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    inner: Arc<RwLock<Option<AccessToken>>>,
}

impl TokenCache {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token if present and still valid.
    pub async fn get(&self) -> Option<AccessToken> {
        let guard = self.inner.read().await;
        guard.as_ref().filter(|token| !token.is_expired()).cloned()
    }

    /// Replaces the cached token wholesale.
    pub async fn set(&self, token: AccessToken) {
        let mut guard = self.inner.write().await;
        *guard = Some(token);
    }

    /// Discards any cached token. Idempotent.
    pub async fn clear(&self) {
        let mut guard = self.inner.write().await;
        *guard = None;
    }
}
