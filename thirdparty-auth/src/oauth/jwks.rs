//! JWKS (JSON Web Key Set) fetching and caching.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::jwk::JwkSet;
use log::{debug, warn};
use tokio::sync::Mutex;

use crate::error::{upstream_error, Error, UpstreamErrorKind};
use crate::http::HttpClient;

/// Key sets are refetched after this long.
pub const DEFAULT_JWKS_TTL_SECONDS: i64 = 3600;

#[derive(Debug, Clone)]
struct CachedKeySet {
    keys: Arc<JwkSet>,
    fetched_at: DateTime<Utc>,
}

/// URL-keyed cache of provider signing keys.
///
/// Concurrent misses for the same URL are collapsed into a single fetch with a
/// per-URL lock and a second look at the cache once the lock is held.
pub struct JwksCache {
    http: HttpClient,
    entries: DashMap<String, CachedKeySet>,
    fetch_locks: DashMap<String, Arc<Mutex<()>>>,
    ttl: Duration,
}

impl JwksCache {
    /// Create a cache with the default one hour TTL.
    pub fn new(http: HttpClient) -> Self {
        Self::with_ttl(http, Duration::seconds(DEFAULT_JWKS_TTL_SECONDS))
    }

    /// Create a cache with a custom TTL.
    pub fn with_ttl(http: HttpClient, ttl: Duration) -> Self {
        Self {
            http,
            entries: DashMap::new(),
            fetch_locks: DashMap::new(),
            ttl,
        }
    }

    /// Return the cached key set for `url`, fetching it if missing or stale.
    pub async fn get_or_fetch(&self, url: &str) -> Result<Arc<JwkSet>, Error> {
        if let Some(keys) = self.fresh(url) {
            return Ok(keys);
        }

        let lock = self.lock_for(url);
        let _guard = lock.lock().await;

        // Another request may have fetched while we waited for the lock
        if let Some(keys) = self.fresh(url) {
            debug!("JWKS for {} was fetched by another request", url);
            return Ok(keys);
        }

        self.fetch(url).await
    }

    /// Refetch the key set for `url` regardless of its age.
    ///
    /// Used when a token names a key the cached set does not contain.
    pub async fn refresh(&self, url: &str) -> Result<Arc<JwkSet>, Error> {
        let lock = self.lock_for(url);
        let _guard = lock.lock().await;
        self.fetch(url).await
    }

    fn fresh(&self, url: &str) -> Option<Arc<JwkSet>> {
        let entry = self.entries.get(url)?;
        if Utc::now() - entry.fetched_at < self.ttl {
            Some(entry.keys.clone())
        } else {
            None
        }
    }

    fn lock_for(&self, url: &str) -> Arc<Mutex<()>> {
        self.fetch_locks
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn fetch(&self, url: &str) -> Result<Arc<JwkSet>, Error> {
        debug!("Fetching JWKS from {}", url);
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("JWKS endpoint {} answered {}", url, status);
            return Err(upstream_error(
                UpstreamErrorKind::JwksFetchFailed {
                    status: status.as_u16(),
                },
                &format!("JWKS endpoint {} answered {}", url, status),
            ));
        }
        let keys = Arc::new(response.json::<JwkSet>().await?);

        self.entries.insert(
            url.to_string(),
            CachedKeySet {
                keys: keys.clone(),
                fetched_at: Utc::now(),
            },
        );
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::http::HttpClientBuilder;
    use mockito::Server;

    const JWKS_BODY: &str = r#"{"keys": [{"kty": "oct", "kid": "k1", "alg": "HS256", "k": "andrcy10ZXN0LXNlY3JldC13aXRoLXBsZW50eS1vZi1lbnRyb3B5"}]}"#;

    fn http() -> HttpClient {
        HttpClientBuilder::new().build().unwrap()
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/jwks")
            .with_status(200)
            .with_body(JWKS_BODY)
            .expect(1)
            .create_async()
            .await;
        let url = format!("{}/jwks", server.url());
        let cache = JwksCache::new(http());

        let first = cache.get_or_fetch(&url).await.unwrap();
        let second = cache.get_or_fetch(&url).await.unwrap();

        assert_eq!(first.keys.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_concurrent_misses_fetch_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/jwks")
            .with_status(200)
            .with_body(JWKS_BODY)
            .expect(1)
            .create_async()
            .await;
        let url = format!("{}/jwks", server.url());
        let cache = Arc::new(JwksCache::new(http()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let url = url.clone();
                tokio::spawn(async move { cache.get_or_fetch(&url).await.map(|keys| keys.keys.len()) })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 1);
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stale_entries_are_refetched() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/jwks")
            .with_status(200)
            .with_body(JWKS_BODY)
            .expect(2)
            .create_async()
            .await;
        let url = format!("{}/jwks", server.url());
        let cache = JwksCache::with_ttl(http(), Duration::zero());

        cache.get_or_fetch(&url).await.unwrap();
        cache.get_or_fetch(&url).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_cached() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/jwks")
            .with_status(503)
            .create_async()
            .await;
        let url = format!("{}/jwks", server.url());
        let cache = JwksCache::new(http());

        let err = cache.get_or_fetch(&url).await.unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::Upstream(UpstreamErrorKind::JwksFetchFailed { status: 503 })
        );
        assert!(cache.fresh(&url).is_none());
    }
}
