//! Memcached cache store
//!
//! Point operations through the memcached text protocol. Memcached has no key
//! enumeration and its only bulk removal is `flush_all`, which wipes the whole
//! server; that is exposed separately through [`ServerFlush`] so callers must
//! opt in to it. Requires the `cache-memcached` feature flag.

use super::error::{StoreError, StoreResult};
use super::expiration::{Expiration, Ttl};
use super::{decode_bytes_value, encode_value, NativeCache, ServerFlush};
use crate::keys::KeyCodec;
use async_memcached::{Client, Error as MemcachedError, Status};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

/// Longest key the protocol accepts
const MAX_KEY_LENGTH: usize = 250;

/// Expirations longer than this are read by the server as unix timestamps
const RELATIVE_TTL_LIMIT_SECS: u64 = 60 * 60 * 24 * 30;

/// Memcached-backed store for one logical cache
pub struct MemcachedStore {
    url: String,
    codec: KeyCodec,
    default_ttl: Option<Duration>,
    client: OnceCell<Mutex<Client>>,
}

impl std::fmt::Debug for MemcachedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcachedStore")
            .field("url", &self.url)
            .field("codec", &self.codec)
            .field("client", &"Client")
            .finish()
    }
}

impl MemcachedStore {
    /// Create a store without connecting; the client connects on first use.
    pub fn new(url: impl Into<String>, codec: KeyCodec, default_ttl: Option<Duration>) -> Self {
        Self {
            url: url.into(),
            codec,
            default_ttl,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> StoreResult<&Mutex<Client>> {
        self.client
            .get_or_try_init(|| async {
                let client = Client::new(&self.url).await.map_err(|e| {
                    StoreError::ConnectionError(format!("Failed to connect to memcached: {}", e))
                })?;
                debug!(url = %self.url, "Memcached store connected");
                Ok(Mutex::new(client))
            })
            .await
    }

    fn physical_key(&self, key: &str) -> StoreResult<String> {
        let physical = self.codec.encode(key);
        if physical.len() > MAX_KEY_LENGTH
            || physical
                .chars()
                .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(StoreError::BackendError(format!(
                "Invalid memcached key '{}'",
                physical
            )));
        }
        Ok(physical)
    }
}

/// Memcached expiration argument for a positive lifetime
fn expiration_seconds(ttl: Duration, now_unix: i64) -> i64 {
    let secs = ttl.as_secs().max(1);
    if secs > RELATIVE_TTL_LIMIT_SECS {
        now_unix.saturating_add(i64::try_from(secs).unwrap_or(i64::MAX))
    } else {
        secs as i64
    }
}

#[async_trait]
impl NativeCache for MemcachedStore {
    fn backend_name(&self) -> &'static str {
        "memcached"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let physical = self.physical_key(key)?;
        let mut client = self.client().await?.lock().await;

        let result = client
            .get(&physical)
            .await
            .map_err(|e| StoreError::BackendError(format!("Memcached GET failed: {}", e)))?;

        match result {
            Some(value) => {
                debug!(key = key, "Cache HIT (memcached)");
                Ok(Some(decode_bytes_value(&value.data)))
            }
            None => {
                debug!(key = key, "Cache MISS (memcached)");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &Value, expiration: Expiration) -> StoreResult<()> {
        let physical = self.physical_key(key)?;
        let ttl_seconds = match expiration.ttl(self.default_ttl) {
            Ttl::Expired => {
                self.delete(key).await?;
                return Ok(());
            }
            Ttl::Persistent => 0,
            Ttl::Expires(ttl) => expiration_seconds(ttl, chrono::Utc::now().timestamp()),
        };
        let payload = encode_value(value)?;
        let mut client = self.client().await?.lock().await;

        client
            .set(&physical, payload.as_bytes(), Some(ttl_seconds), None)
            .await
            .map_err(|e| StoreError::BackendError(format!("Memcached SET failed: {}", e)))?;

        debug!(
            key = key,
            ttl_seconds = ttl_seconds,
            "Cache SET (memcached)"
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let physical = self.physical_key(key)?;
        let mut client = self.client().await?.lock().await;

        let existed = match client.delete(&physical).await {
            Ok(()) => true,
            Err(MemcachedError::Protocol(Status::NotFound)) => false,
            Err(e) => {
                return Err(StoreError::BackendError(format!(
                    "Memcached DEL failed: {}",
                    e
                )))
            }
        };

        debug!(key = key, existed = existed, "Cache DEL (memcached)");
        Ok(existed)
    }

    async fn clear(&self) -> StoreResult<u64> {
        Err(StoreError::Unsupported(
            "memcached cannot flush a single namespace".to_string(),
        ))
    }
}

#[async_trait]
impl ServerFlush for MemcachedStore {
    async fn flush_server(&self) -> StoreResult<()> {
        let mut client = self.client().await?.lock().await;
        client
            .flush_all()
            .await
            .map_err(|e| StoreError::BackendError(format!("Memcached FLUSH_ALL failed: {}", e)))?;

        warn!(url = %self.url, "Memcached server flushed (all namespaces)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiration_seconds() {
        assert_eq!(expiration_seconds(Duration::from_millis(10), 1_000), 1);
        assert_eq!(expiration_seconds(Duration::from_secs(300), 1_000), 300);
        let long = Duration::from_secs(RELATIVE_TTL_LIMIT_SECS + 1);
        assert_eq!(
            expiration_seconds(long, 1_000),
            1_000 + RELATIVE_TTL_LIMIT_SECS as i64 + 1
        );
    }

    #[test]
    fn test_physical_key_validation() {
        let store = MemcachedStore::new("localhost:11211", KeyCodec::new("app", 1), None);
        assert_eq!(store.physical_key("user:1").unwrap(), ":1:app:user:1");
        assert!(store.physical_key("has space").is_err());
        assert!(store.physical_key(&"x".repeat(300)).is_err());
    }

    #[tokio::test]
    async fn test_clear_is_unsupported() {
        let store = MemcachedStore::new("localhost:11211", KeyCodec::default(), None);
        assert!(matches!(
            store.clear().await,
            Err(StoreError::Unsupported(_))
        ));
    }

    // Integration tests require a running memcached instance (behind test-services feature)
    #[cfg(feature = "test-services")]
    mod integration {
        use super::*;
        use serde_json::json;

        fn memcached_url() -> String {
            std::env::var("MEMCACHED_URL").unwrap_or_else(|_| "localhost:11211".to_string())
        }

        #[tokio::test]
        async fn test_memcached_round_trip() {
            let store = MemcachedStore::new(memcached_url(), KeyCodec::new("panel_test", 1), None);
            store
                .set("k", &json!({"v": 1}), Expiration::Default)
                .await
                .unwrap();
            assert_eq!(store.get("k").await.unwrap(), Some(json!({"v": 1})));
            assert!(store.delete("k").await.unwrap());
            assert!(!store.delete("k").await.unwrap());
        }
    }
}
