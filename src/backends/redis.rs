//! Redis cache stores
//!
//! `RedisStore` talks to a single node (Redis, Dragonfly, Valkey) through a
//! lazily created `ConnectionManager` and exposes the cursor `SCAN` used for
//! key enumeration and namespace-scoped flushes. `RedisClusterStore` talks to
//! a cluster; keys are spread across nodes so it only offers point
//! operations. Requires the `cache-redis` feature flag.

use super::error::{StoreError, StoreResult};
use super::expiration::{Expiration, Ttl};
use super::{
    decode_bytes_value, encode_value, redact_url, NativeCache, RemoteKeyspace, ScanPage,
};
use crate::keys::{GlobPattern, KeyCodec};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

/// Batch size used when flushing a namespace
const FLUSH_SCAN_COUNT: u64 = 500;

/// Build the `SET` command for a write, or `None` when the key must be removed
fn set_command(physical: &str, payload: &str, ttl: Ttl) -> Option<redis::Cmd> {
    let mut cmd = redis::cmd("SET");
    cmd.arg(physical).arg(payload);
    match ttl {
        Ttl::Persistent => {}
        Ttl::Expires(ttl) => {
            cmd.arg("PX")
                .arg(u64::try_from(ttl.as_millis().max(1)).unwrap_or(u64::MAX));
        }
        Ttl::Expired => return None,
    }
    Some(cmd)
}

/// Single-node Redis store
pub struct RedisStore {
    client: redis::Client,
    url: String,
    codec: KeyCodec,
    default_ttl: Option<Duration>,
    connection_manager: OnceCell<ConnectionManager>,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("url", &redact_url(&self.url))
            .field("codec", &self.codec)
            .field("connected", &self.connection_manager.initialized())
            .finish()
    }
}

impl RedisStore {
    /// Create a store without connecting; the connection opens on first use.
    pub fn open(url: &str, codec: KeyCodec, default_ttl: Option<Duration>) -> StoreResult<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            StoreError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        debug!(url = %redact_url(url), namespace = %codec.namespace(), "Redis store configured");

        Ok(Self {
            client,
            url: url.to_string(),
            codec,
            default_ttl,
            connection_manager: OnceCell::new(),
        })
    }

    async fn connection(&self) -> StoreResult<ConnectionManager> {
        let manager = self
            .connection_manager
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|e| {
                        StoreError::ConnectionError(format!("Failed to connect to Redis: {}", e))
                    })?;
                debug!(url = %redact_url(&self.url), "Redis store connected");
                Ok::<_, StoreError>(manager)
            })
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl NativeCache for RedisStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let mut conn = self.connection().await?;
        let result: Option<Vec<u8>> = redis::cmd("GET")
            .arg(self.codec.encode(key))
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::BackendError(format!("Redis GET failed: {}", e)))?;

        if result.is_some() {
            debug!(key = key, "Cache HIT");
        } else {
            debug!(key = key, "Cache MISS");
        }

        Ok(result.map(|bytes| decode_bytes_value(&bytes)))
    }

    async fn set(&self, key: &str, value: &Value, expiration: Expiration) -> StoreResult<()> {
        let physical = self.codec.encode(key);
        let payload = encode_value(value)?;
        let mut conn = self.connection().await?;

        match set_command(&physical, &payload, expiration.ttl(self.default_ttl)) {
            Some(cmd) => {
                cmd.query_async::<()>(&mut conn)
                    .await
                    .map_err(|e| StoreError::BackendError(format!("Redis SET failed: {}", e)))?;
            }
            None => {
                redis::cmd("DEL")
                    .arg(&physical)
                    .query_async::<()>(&mut conn)
                    .await
                    .map_err(|e| StoreError::BackendError(format!("Redis DEL failed: {}", e)))?;
            }
        }

        debug!(key = key, ?expiration, "Cache SET");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let removed: u64 = redis::cmd("DEL")
            .arg(self.codec.encode(key))
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::BackendError(format!("Redis DEL failed: {}", e)))?;

        debug!(key = key, removed = removed, "Cache DEL");
        Ok(removed > 0)
    }

    /// Delete every key of this instance's namespace with SCAN + DEL.
    async fn clear(&self) -> StoreResult<u64> {
        let pattern = self.codec.redis_match(&GlobPattern::default());
        let mut deleted: u64 = 0;
        let mut cursor: u64 = 0;

        // Use SCAN to iterate without blocking the server
        loop {
            let page = self.scan_page(cursor, &pattern, FLUSH_SCAN_COUNT).await?;
            if !page.keys.is_empty() {
                deleted += self.delete_physical(&page.keys).await?;
            }

            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = %pattern, deleted = deleted, "Cache namespace DEL");
        Ok(deleted)
    }
}

#[async_trait]
impl RemoteKeyspace for RedisStore {
    fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    async fn scan_page(&self, cursor: u64, pattern: &str, count: u64) -> StoreResult<ScanPage> {
        let mut conn = self.connection().await?;
        let (cursor, keys): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count.max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::BackendError(format!("Redis SCAN failed: {}", e)))?;

        Ok(ScanPage { cursor, keys })
    }

    async fn delete_physical(&self, keys: &[Vec<u8>]) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        redis::cmd("DEL")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::BackendError(format!("Redis DEL (batch) failed: {}", e)))
    }
}

/// Redis cluster store; point operations only
pub struct RedisClusterStore {
    client: ClusterClient,
    nodes: Vec<String>,
    codec: KeyCodec,
    default_ttl: Option<Duration>,
    connection: OnceCell<ClusterConnection>,
}

impl std::fmt::Debug for RedisClusterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nodes: Vec<String> = self.nodes.iter().map(|n| redact_url(n)).collect();
        f.debug_struct("RedisClusterStore")
            .field("nodes", &nodes)
            .field("codec", &self.codec)
            .field("connected", &self.connection.initialized())
            .finish()
    }
}

impl RedisClusterStore {
    /// Create a cluster store from a comma-separated list of node URLs.
    pub fn open(nodes: &str, codec: KeyCodec, default_ttl: Option<Duration>) -> StoreResult<Self> {
        let nodes: Vec<String> = nodes
            .split(',')
            .map(str::trim)
            .filter(|node| !node.is_empty())
            .map(String::from)
            .collect();
        if nodes.is_empty() {
            return Err(StoreError::Configuration(
                "Redis cluster requires at least one node URL".to_string(),
            ));
        }

        let client = ClusterClient::new(nodes.clone()).map_err(|e| {
            StoreError::ConnectionError(format!("Failed to create Redis cluster client: {}", e))
        })?;

        Ok(Self {
            client,
            nodes,
            codec,
            default_ttl,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> StoreResult<ClusterConnection> {
        let conn = self
            .connection
            .get_or_try_init(|| async {
                self.client.get_async_connection().await.map_err(|e| {
                    StoreError::ConnectionError(format!(
                        "Failed to connect to Redis cluster: {}",
                        e
                    ))
                })
            })
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl NativeCache for RedisClusterStore {
    fn backend_name(&self) -> &'static str {
        "redis-cluster"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let mut conn = self.connection().await?;
        let result: Option<Vec<u8>> = redis::cmd("GET")
            .arg(self.codec.encode(key))
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::BackendError(format!("Redis cluster GET failed: {}", e)))?;

        debug!(key = key, hit = result.is_some(), "Cache GET (cluster)");
        Ok(result.map(|bytes| decode_bytes_value(&bytes)))
    }

    async fn set(&self, key: &str, value: &Value, expiration: Expiration) -> StoreResult<()> {
        let physical = self.codec.encode(key);
        let payload = encode_value(value)?;
        let mut conn = self.connection().await?;

        let cmd = match set_command(&physical, &payload, expiration.ttl(self.default_ttl)) {
            Some(cmd) => cmd,
            None => {
                let mut del = redis::cmd("DEL");
                del.arg(&physical);
                del
            }
        };
        cmd.query_async::<()>(&mut conn)
            .await
            .map_err(|e| StoreError::BackendError(format!("Redis cluster SET failed: {}", e)))?;

        debug!(key = key, ?expiration, "Cache SET (cluster)");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let removed: u64 = redis::cmd("DEL")
            .arg(self.codec.encode(key))
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::BackendError(format!("Redis cluster DEL failed: {}", e)))?;

        debug!(key = key, removed = removed, "Cache DEL (cluster)");
        Ok(removed > 0)
    }

    async fn clear(&self) -> StoreResult<u64> {
        Err(StoreError::Unsupported(
            "namespace flush across cluster nodes".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_does_not_connect() {
        let store = RedisStore::open("redis://localhost:1", KeyCodec::new("app", 1), None).unwrap();
        assert_eq!(store.codec().namespace(), ":1:app:");
        assert!(format!("{:?}", store).contains("connected: false"));
    }

    #[test]
    fn test_cluster_requires_nodes() {
        assert!(RedisClusterStore::open(" , ", KeyCodec::default(), None).is_err());
        let store = RedisClusterStore::open(
            "redis://a:7000, redis://b:7001",
            KeyCodec::default(),
            None,
        )
        .unwrap();
        assert!(format!("{:?}", store).contains("redis://b:7001"));
    }

    #[test]
    fn test_set_command_clamps_huge_ttl() {
        let cmd = set_command("k", "1", Ttl::Expires(std::time::Duration::MAX)).unwrap();
        let args: Vec<Vec<u8>> = cmd
            .args_iter()
            .filter_map(|arg| match arg {
                redis::Arg::Simple(bytes) => Some(bytes.to_vec()),
                redis::Arg::Cursor => None,
            })
            .collect();
        assert_eq!(args.last().unwrap(), u64::MAX.to_string().as_bytes());
    }

    #[test]
    fn test_set_command_expired_is_none() {
        assert!(set_command("k", "1", Ttl::Expired).is_none());
        assert!(set_command("k", "1", Ttl::Persistent).is_some());
    }

    // Integration tests require a running Redis instance (behind test-services feature)
    #[cfg(feature = "test-services")]
    mod integration {
        use super::*;
        use serde_json::json;

        fn redis_url() -> String {
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
        }

        #[tokio::test]
        async fn test_redis_round_trip_and_scoped_clear() {
            let ours = RedisStore::open(&redis_url(), KeyCodec::new("panel_test_a", 1), None)
                .unwrap();
            let theirs = RedisStore::open(&redis_url(), KeyCodec::new("panel_test_b", 1), None)
                .unwrap();

            ours.set("k", &json!({"v": 1}), Expiration::Default)
                .await
                .unwrap();
            theirs.set("k", &json!(2), Expiration::Default).await.unwrap();
            assert_eq!(ours.get("k").await.unwrap(), Some(json!({"v": 1})));

            assert_eq!(ours.clear().await.unwrap(), 1);
            assert_eq!(ours.get("k").await.unwrap(), None);
            assert_eq!(theirs.get("k").await.unwrap(), Some(json!(2)));
            theirs.clear().await.unwrap();
        }
    }
}
