//! File-based cache store
//!
//! One file per key in the instance directory. The filename is the SHA-256 of
//! the physical key, so the logical key cannot be recovered from the
//! directory listing. Each file holds a small JSON envelope with the value and
//! its deadline.

use super::error::StoreResult;
use super::expiration::{Expiration, Ttl};
use super::NativeCache;
use crate::keys::KeyCodec;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const CACHE_FILE_SUFFIX: &str = ".cache";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    /// Key namespace of the instance that wrote the entry
    #[serde(default)]
    namespace: String,
    /// Unix microseconds; absent for entries that never expire
    expires_at: Option<i64>,
    value: Value,
}

impl Envelope {
    fn is_live(&self, now_micros: i64) -> bool {
        self.expires_at.map_or(true, |deadline| deadline > now_micros)
    }
}

/// Cache directory of one logical cache instance
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    codec: KeyCodec,
    default_ttl: Option<Duration>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>, codec: KeyCodec, default_ttl: Option<Duration>) -> Self {
        Self {
            dir: dir.into(),
            codec,
            default_ttl,
        }
    }

    /// Path of the file that holds a logical key
    pub fn file_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(self.codec.encode(key).as_bytes());
        self.dir
            .join(format!("{}{}", hex::encode(digest), CACHE_FILE_SUFFIX))
    }

    async fn read_envelope(path: &Path) -> StoreResult<Option<Envelope>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_file(path: &Path) -> StoreResult<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a temporary file so readers never see a partial entry
    async fn write_envelope(&self, path: &Path, envelope: &Envelope) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = self.dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        let bytes = serde_json::to_vec(envelope)?;
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl NativeCache for FileStore {
    fn backend_name(&self) -> &'static str {
        "file-based"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let path = self.file_path(key);
        let value = match Self::read_envelope(&path).await? {
            Some(envelope) if envelope.is_live(Utc::now().timestamp_micros()) => {
                Some(envelope.value)
            }
            Some(_) => {
                Self::remove_file(&path).await?;
                None
            }
            None => None,
        };
        debug!(key = key, hit = value.is_some(), "Cache GET (file)");
        Ok(value)
    }

    async fn set(&self, key: &str, value: &Value, expiration: Expiration) -> StoreResult<()> {
        let path = self.file_path(key);
        let now = Utc::now();
        let expires_at = match expiration.ttl(self.default_ttl) {
            Ttl::Expired => {
                Self::remove_file(&path).await?;
                debug!(key = key, "Cache SET with expired timeout removed key (file)");
                return Ok(());
            }
            Ttl::Persistent => None,
            Ttl::Expires(ttl) => Some(
                now.timestamp_micros()
                    .saturating_add(i64::try_from(ttl.as_micros()).unwrap_or(i64::MAX)),
            ),
        };

        let envelope = Envelope {
            namespace: self.codec.namespace(),
            expires_at,
            value: value.clone(),
        };
        self.write_envelope(&path, &envelope).await?;
        debug!(key = key, ?expiration, "Cache SET (file)");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let existed = Self::remove_file(&self.file_path(key)).await?;
        debug!(key = key, existed = existed, "Cache DEL (file)");
        Ok(existed)
    }

    /// Removes the cache files written under this instance's namespace.
    ///
    /// Several instances may share a directory, so each file's envelope is
    /// read and foreign or unreadable entries are left alone.
    async fn clear(&self) -> StoreResult<u64> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let namespace = self.codec.namespace();
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let is_cache_file = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(CACHE_FILE_SUFFIX));
            if !is_cache_file {
                continue;
            }

            let path = entry.path();
            let owned = match Self::read_envelope(&path).await {
                Ok(Some(envelope)) => envelope.namespace == namespace,
                Ok(None) => false,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping unreadable cache file");
                    false
                }
            };
            if owned && Self::remove_file(&path).await? {
                removed += 1;
            }
        }

        debug!(
            dir = %self.dir.display(),
            namespace = %namespace,
            removed = removed,
            "Cache namespace cleared (file)"
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(dir: &Path) -> FileStore {
        FileStore::new(dir, KeyCodec::default(), Some(Duration::from_secs(300)))
    }

    #[test]
    fn test_file_name_is_hashed() {
        let store = FileStore::new("/tmp/cache", KeyCodec::new("app", 1), None);
        let path = store.file_path("user:1");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with(".cache"));
        assert_eq!(name.len(), 64 + ".cache".len());
        assert!(!name.contains("user"));
        assert_ne!(store.file_path("user:2"), path);
    }

    #[tokio::test]
    async fn test_file_set_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let svc = store(dir.path());

        svc.set("k", &json!({"n": 1}), Expiration::Default)
            .await
            .unwrap();
        assert_eq!(svc.get("k").await.unwrap(), Some(json!({"n": 1})));

        assert!(svc.delete("k").await.unwrap());
        assert!(!svc.delete("k").await.unwrap());
        assert_eq!(svc.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_expired_entry_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let svc = store(dir.path());
        svc.set("k", &json!("v"), Expiration::After(Duration::from_millis(20)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(svc.get("k").await.unwrap(), None);
        assert!(!svc.file_path("k").exists());
    }

    #[tokio::test]
    async fn test_file_clear_removes_only_cache_files() {
        let dir = tempfile::tempdir().unwrap();
        let svc = store(dir.path());
        svc.set("a", &json!(1), Expiration::Never).await.unwrap();
        svc.set("b", &json!(2), Expiration::Never).await.unwrap();
        std::fs::write(dir.path().join("README"), "keep me").unwrap();

        assert_eq!(svc.clear().await.unwrap(), 2);
        assert!(dir.path().join("README").exists());
        assert_eq!(svc.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_clear_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let svc = store(&dir.path().join("never-created"));
        assert_eq!(svc.clear().await.unwrap(), 0);
    }
}
