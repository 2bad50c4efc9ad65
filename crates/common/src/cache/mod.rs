//! In-process TTL cache
//!
//! Provides:
//! - A shared key/value store with per-entry expiry
//! - Stable cache keys built from query parameters
//! - A memoizing wrapper for async loaders

use crate::metrics::record_cache;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Default entry lifetime (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct Entry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}

/// Shared TTL cache. Clones share the same storage.
pub struct TtlCache<V> {
    entries: Arc<RwLock<HashMap<String, Entry<V>>>>,
    default_ttl: Duration,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            default_ttl: self.default_ttl,
        }
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
        }
    }

    /// Fresh value for `key`. Expired entries are evicted on read.
    pub async fn get(&self, key: &str) -> Option<V> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                None => return None,
                Some(_) => {}
            }
        }
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(Entry::is_expired) {
            entries.remove(key);
            debug!(key, "Cache entry expired");
        }
        None
    }

    pub async fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    pub async fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            stored_at: Instant::now(),
            ttl,
        };
        self.entries.write().await.insert(key.into(), entry);
    }

    pub async fn has(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Drop every expired entry, read or not. Returns how many went.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// `prefix:` followed by a SHA-256 of the parameters sorted by name,
/// so parameter order never changes the key
pub fn cache_key(prefix: &str, params: &[(&str, String)]) -> String {
    let mut sorted: Vec<String> = params.iter().map(|(k, v)| format!("{k}:{v}")).collect();
    sorted.sort();
    let digest = Sha256::digest(sorted.join("|").as_bytes());
    format!("{prefix}:{}", hex::encode(digest))
}

/// Memoizes an async loader over a [`TtlCache`], keyed by its argument
pub struct Memo<A: ?Sized, V> {
    cache: TtlCache<V>,
    key_fn: fn(&A) -> String,
    ttl: Duration,
    name: &'static str,
}

impl<A: ?Sized, V: Clone> Memo<A, V> {
    pub fn new(name: &'static str, cache: TtlCache<V>, key_fn: fn(&A) -> String, ttl: Duration) -> Self {
        Self {
            cache,
            key_fn,
            ttl,
            name,
        }
    }

    /// Cached value for `arg`, or run `load` and cache what it returns.
    /// Errors are never cached.
    pub async fn get_or_try_load<F, Fut, E>(&self, arg: &A, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let key = (self.key_fn)(arg);
        if let Some(hit) = self.cache.get(&key).await {
            record_cache(true, self.name);
            return Ok(hit);
        }
        record_cache(false, self.name);

        let value = load().await?;
        self.cache.set_with_ttl(key, value.clone(), self.ttl).await;
        Ok(value)
    }

    /// Drop every memoized value
    pub async fn invalidate(&self) {
        self.cache.clear().await;
        debug!(memo = self.name, "Memo invalidated");
    }

    /// Drop memoized values whose TTL has run out
    pub async fn purge_expired(&self) -> usize {
        let purged = self.cache.purge_expired().await;
        if purged > 0 {
            debug!(memo = self.name, purged, "Expired memo entries purged");
        }
        purged
    }
}
