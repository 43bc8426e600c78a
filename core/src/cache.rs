use crate::Result;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// CacheStore keeps short-lived vendor artifacts between requests, such
/// as WeChat access tokens and platform certificates.
///
/// TTL convention: `0` never expires, a negative TTL is already expired
/// when stored.
#[async_trait::async_trait]
pub trait CacheStore: Debug + Send + Sync + 'static {
    /// Fetch a value. Expired and missing entries both return `None`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value with a TTL in seconds.
    async fn set(&self, key: &str, value: &str, ttl: i64) -> Result<()>;

    /// Remove a value.
    async fn del(&self, key: &str) -> Result<()>;
}

/// In-process cache backed by a mutex-guarded map.
///
/// Suitable for single-process deployments and tests. Multi-process
/// deployments should inject a shared store instead.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) => {
                if let Some(deadline) = entry.expires_at {
                    if Instant::now() >= deadline {
                        entries.remove(key);
                        return Ok(None);
                    }
                }
                Ok(Some(entry.value.clone()))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: i64) -> Result<()> {
        let expires_at = match ttl {
            0 => None,
            t if t < 0 => Some(Instant::now()),
            t => Some(Instant::now() + Duration::from_secs(t as u64)),
        };
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.remove(key);
        Ok(())
    }
}

/// NoopCache never stores anything.
///
/// This is used when no cache is configured. Clients that rely on
/// caching still work, they just refetch on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait::async_trait]
impl CacheStore for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: i64) -> Result<()> {
        Ok(())
    }

    async fn del(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_del() {
        let cache = MemoryCache::new();
        cache.set("k", "v", 0).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
        cache.del("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_zero_ttl_never_expires() {
        let cache = MemoryCache::new();
        cache.set("token", "abc", 0).await.unwrap();
        assert_eq!(cache.get("token").await.unwrap(), Some("abc".to_string()));
    }

    #[tokio::test]
    async fn test_negative_ttl_is_already_expired() {
        let cache = MemoryCache::new();
        cache.set("token", "abc", -1).await.unwrap();
        assert_eq!(cache.get("token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_ttl() {
        let cache = MemoryCache::new();
        cache.set("k", "old", -1).await.unwrap();
        cache.set("k", "new", 3600).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("new".to_string()));
    }
}
