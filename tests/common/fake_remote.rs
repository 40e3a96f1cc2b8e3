//! In-memory stand-in for a remote keyspace with a native cursor scan.

#![allow(dead_code)]

use async_trait::async_trait;
use cache_panel::backends::{
    Expiration, NativeCache, RemoteKeyspace, ScanPage, StoreError, StoreResult,
};
use cache_panel::keys::KeyCodec;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Remote store fake
///
/// Several fakes may share one `keys` map to model logical caches on one
/// server. The scan ignores `MATCH`, returning every key on the server in
/// batches of `batch_size`, so the caller's namespace and pattern filtering
/// is what decides the result.
#[derive(Debug)]
pub struct FakeRemote {
    codec: KeyCodec,
    keys: std::sync::Arc<Mutex<BTreeMap<String, Value>>>,
    batch_size: usize,
    repeat_first_key: bool,
    fail_scans: AtomicBool,
    fail_all: AtomicBool,
    pub scan_calls: AtomicUsize,
    pub patterns: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn new(codec: KeyCodec) -> Self {
        Self::with_server(codec, std::sync::Arc::default())
    }

    /// Fake sharing `server` with other fakes
    pub fn with_server(codec: KeyCodec, server: std::sync::Arc<Mutex<BTreeMap<String, Value>>>) -> Self {
        Self {
            codec,
            keys: server,
            batch_size: 7,
            repeat_first_key: false,
            fail_scans: AtomicBool::new(false),
            fail_all: AtomicBool::new(false),
            scan_calls: AtomicUsize::new(0),
            patterns: Mutex::new(Vec::new()),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Return the first key again at the start of every batch, as a real
    /// `SCAN` may do during rehashing
    pub fn with_repeats(mut self) -> Self {
        self.repeat_first_key = true;
        self
    }

    pub fn fail_scans(&self, fail: bool) {
        self.fail_scans.store(fail, Ordering::SeqCst);
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Put a raw physical key on the server
    pub fn insert_physical(&self, physical: &str, value: Value) {
        self.keys.lock().insert(physical.to_string(), value);
    }

    pub fn physical_keys(&self) -> Vec<String> {
        self.keys.lock().keys().cloned().collect()
    }

    fn check(&self) -> StoreResult<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            Err(StoreError::ConnectionError("Connection refused (os error 111)".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NativeCache for FakeRemote {
    fn backend_name(&self) -> &'static str {
        "fake-remote"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        self.check()?;
        Ok(self.keys.lock().get(&self.codec.encode(key)).cloned())
    }

    async fn set(&self, key: &str, value: &Value, expiration: Expiration) -> StoreResult<()> {
        self.check()?;
        let physical = self.codec.encode(key);
        let mut keys = self.keys.lock();
        if matches!(expiration, Expiration::Immediately) {
            keys.remove(&physical);
        } else {
            keys.insert(physical, value.clone());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.check()?;
        Ok(self.keys.lock().remove(&self.codec.encode(key)).is_some())
    }

    async fn clear(&self) -> StoreResult<u64> {
        self.check()?;
        let mut keys = self.keys.lock();
        let before = keys.len();
        keys.retain(|physical, _| self.codec.decode(physical).is_none());
        Ok((before - keys.len()) as u64)
    }
}

#[async_trait]
impl RemoteKeyspace for FakeRemote {
    fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    async fn scan_page(&self, cursor: u64, pattern: &str, _count: u64) -> StoreResult<ScanPage> {
        self.check()?;
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        self.patterns.lock().push(pattern.to_string());
        if self.fail_scans.load(Ordering::SeqCst) && cursor > 0 {
            return Err(StoreError::BackendError(
                "LOADING Redis is loading the dataset in memory".to_string(),
            ));
        }

        let all: Vec<String> = self.keys.lock().keys().cloned().collect();
        let start = usize::try_from(cursor).unwrap_or(usize::MAX).min(all.len());
        let end = (start + self.batch_size).min(all.len());

        let mut batch: Vec<Vec<u8>> = all[start..end]
            .iter()
            .map(|key| key.as_bytes().to_vec())
            .collect();
        if self.repeat_first_key {
            if let Some(first) = all.first() {
                batch.push(first.as_bytes().to_vec());
            }
        }

        let next = if end >= all.len() { 0 } else { end as u64 };
        Ok(ScanPage { cursor: next, keys: batch })
    }

    async fn delete_physical(&self, physical_keys: &[Vec<u8>]) -> StoreResult<u64> {
        self.check()?;
        let mut keys = self.keys.lock();
        let removed = physical_keys
            .iter()
            .filter(|raw| keys.remove(String::from_utf8_lossy(raw).as_ref()).is_some())
            .count();
        Ok(removed as u64)
    }
}
