//! Token lifecycle: cache-first reads, single-flight refresh, explicit invalidation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::credentials::IdentityProvider;
use super::error::TokenError;
use super::token::{AccessToken, TokenCache};

/// Snapshot of token-manager activity counters.
///
/// Every acquisition decision is countable, so operators can tell cache pressure
/// from identity-provider trouble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenStats {
    /// Total [`TokenManager::get_token`] calls.
    pub lookups: u64,
    /// Lookups served from the cache with no I/O.
    pub cache_hits: u64,
    /// Grants fetched from the identity provider.
    pub fetches: u64,
    /// Explicit cache invalidations.
    pub clears: u64,
}

#[derive(Debug, Default)]
struct Counters {
    lookups: AtomicU64,
    cache_hits: AtomicU64,
    fetches: AtomicU64,
    clears: AtomicU64,
}

/// Produces a currently-valid bearer token while minimizing identity-provider
/// round-trips.
///
/// The manager is the single writer of the shared [`TokenCache`]; the gateway client
/// only ever reads through this interface and never stores a token beyond the
/// in-flight request. Share it behind an `Arc`.
#[derive(Debug)]
pub struct TokenManager<P> {
    identity: Arc<P>,
    cache: TokenCache,
    refresh_gate: Mutex<()>,
    counters: Counters,
}

impl<P: IdentityProvider> TokenManager<P> {
    /// Creates a manager with an empty cache.
    pub fn new(identity: P) -> Self {
        Self {
            identity: Arc::new(identity),
            cache: TokenCache::new(),
            refresh_gate: Mutex::new(()),
            counters: Counters::default(),
        }
    }

    /// Returns a valid token, fetching a new grant only when the cache cannot serve
    /// one.
    ///
    /// Concurrent callers racing an empty cache coalesce onto a single
    /// identity-provider request: the first caller fetches while the rest queue on
    /// the refresh gate and then read the freshly populated cache.
    ///
    /// # Errors
    ///
    /// Propagates the [`TokenError`] of a failed fetch; nothing is cached on failure.
    pub async fn get_token(&self) -> Result<AccessToken, TokenError> {
        self.counters.lookups.fetch_add(1, Ordering::Relaxed);

        if let Some(token) = self.cache.get().await {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            debug!(remaining = ?token.time_until_expiry(), "using cached service token");
            return Ok(token);
        }

        let _gate = self.refresh_gate.lock().await;

        // A fetch that finished while this caller waited on the gate has already
        // repopulated the cache.
        if let Some(token) = self.cache.get().await {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(token);
        }

        info!("no valid service token cached, requesting a new grant");
        let token = self.refresh().await?;
        self.counters.fetches.fetch_add(1, Ordering::Relaxed);
        debug!(remaining = ?token.time_until_expiry(), "service token cache refreshed");
        Ok(token)
    }

    /// Unconditionally discards the cached token.
    ///
    /// Idempotent; performs no I/O. The next [`get_token`](Self::get_token) call will
    /// fetch a fresh grant.
    pub async fn clear_token(&self) {
        self.counters.clears.fetch_add(1, Ordering::Relaxed);
        self.cache.clear().await;
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> TokenStats {
        TokenStats {
            lookups: self.counters.lookups.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            clears: self.counters.clears.load(Ordering::Relaxed),
        }
    }

    // The fetch runs detached so that cancelling the requesting call cannot drop a
    // grant other requests are queued for; the task stores the token in the shared
    // cache before handing it back.
    async fn refresh(&self) -> Result<AccessToken, TokenError> {
        let identity = Arc::clone(&self.identity);
        let cache = self.cache.clone();
        let fetch = tokio::spawn(async move {
            let token = identity.fetch_token().await?;
            cache.set(token.clone()).await;
            Ok::<_, TokenError>(token)
        });

        fetch.await.map_err(|_| TokenError::Interrupted)?
    }
}
