//! # Adapter contract and Operation Gate
//!
//! Concrete adapters implement the unchecked primitives of [`PanelAdapter`].
//! Callers only ever reach them through [`CachePanel`], which checks the
//! effective capability set before every call, validates input, and turns
//! store failures into errors that name the cache, backend and operation.
//! Listing failures degrade to an empty [`ScanResult`] with `error` set.

use super::capabilities::{CapabilitySet, Operation};
use super::types::{KeyQuery, KeyRecord, OperationOutcome, ScanResult};
use crate::backends::{Expiration, StoreError, StoreResult};
use crate::error::{PanelError, PanelResult};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

fn unsupported<T>(primitive: &str) -> StoreResult<T> {
    Err(StoreError::Unsupported(primitive.to_string()))
}

/// Backend-specific primitives behind the gate
///
/// Defaults report the primitive as unsupported, so an adapter only
/// implements what its capability set declares.
#[async_trait]
pub trait PanelAdapter: Send + Sync + fmt::Debug {
    fn adapter_name(&self) -> &'static str;

    /// Capabilities declared for this backend type
    fn capabilities(&self) -> CapabilitySet;

    /// Operations the primitives can actually perform; per-instance
    /// overrides may enable anything in this set
    fn implemented(&self) -> CapabilitySet {
        self.capabilities()
    }

    async fn scan_keys(&self, _query: &KeyQuery) -> StoreResult<ScanResult> {
        unsupported("scan")
    }

    async fn fetch_key(&self, _key: &str) -> StoreResult<Option<Value>> {
        unsupported("get")
    }

    /// Remove a key, reporting whether it existed
    async fn remove_key(&self, _key: &str) -> StoreResult<bool> {
        unsupported("delete")
    }

    /// Create or replace a key
    async fn store_key(&self, _key: &str, _value: &Value, _expiration: Expiration) -> StoreResult<()> {
        unsupported("set")
    }

    /// Remove this instance's entries; `None` when the count is unknown
    async fn clear(&self) -> StoreResult<Option<u64>> {
        unsupported("clear")
    }
}

/// Gated panel for one configured cache
#[derive(Clone)]
pub struct CachePanel {
    cache_name: String,
    backend_type: String,
    adapter: Arc<dyn PanelAdapter>,
    capabilities: CapabilitySet,
}

impl fmt::Debug for CachePanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachePanel")
            .field("cache_name", &self.cache_name)
            .field("backend_type", &self.backend_type)
            .field("adapter", &self.adapter.adapter_name())
            .field("capabilities", &self.capabilities.to_string())
            .finish()
    }
}

impl CachePanel {
    /// Gate an adapter with its declared capabilities
    pub fn new(
        cache_name: impl Into<String>,
        backend_type: impl Into<String>,
        adapter: Arc<dyn PanelAdapter>,
    ) -> Self {
        let capabilities = adapter.capabilities();
        Self {
            cache_name: cache_name.into(),
            backend_type: backend_type.into(),
            adapter,
            capabilities,
        }
    }

    /// Replace the effective capability set; callers check it against
    /// `implemented()` first
    pub(crate) fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn backend_type(&self) -> &str {
        &self.backend_type
    }

    pub fn adapter_name(&self) -> &'static str {
        self.adapter.adapter_name()
    }

    /// Effective capabilities after per-instance overrides
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    pub fn is_supported(&self, operation: Operation) -> bool {
        self.capabilities.supports(operation)
    }

    fn check(&self, operation: Operation) -> PanelResult<()> {
        if self.is_supported(operation) {
            Ok(())
        } else {
            Err(PanelError::UnsupportedOperation {
                cache_name: self.cache_name.clone(),
                backend_type: self.backend_type.clone(),
                operation,
            })
        }
    }

    fn check_key(&self, operation: Operation, key: &str) -> PanelResult<()> {
        self.check(operation)?;
        if key.is_empty() {
            return Err(self.invalid_input(operation, "key must not be empty"));
        }
        Ok(())
    }

    fn invalid_input(&self, operation: Operation, reason: impl Into<String>) -> PanelError {
        PanelError::InvalidInput {
            cache_name: self.cache_name.clone(),
            operation,
            reason: reason.into(),
        }
    }

    fn transport(&self, operation: Operation, source: StoreError) -> PanelError {
        PanelError::BackendTransport {
            cache_name: self.cache_name.clone(),
            backend_type: self.backend_type.clone(),
            operation,
            source,
        }
    }

    /// List keys matching a pattern, one page at a time
    ///
    /// Backend failures do not raise: the result comes back empty with
    /// `error` set.
    pub async fn query(&self, query: &KeyQuery) -> PanelResult<ScanResult> {
        self.check(Operation::Query)?;
        let query = query.normalized();

        match self.adapter.scan_keys(&query).await {
            Ok(result) => {
                debug!(
                    cache_name = %self.cache_name,
                    pattern = %query.pattern,
                    page = query.page,
                    total_count = result.total_count,
                    "Cache keys listed"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(
                    cache_name = %self.cache_name,
                    backend_type = %self.backend_type,
                    pattern = %query.pattern,
                    error = %e,
                    "Key scan failed, returning empty result"
                );
                Ok(ScanResult::failed(&query, e.to_string()))
            }
        }
    }

    pub async fn get_key(&self, key: &str) -> PanelResult<KeyRecord> {
        self.check_key(Operation::GetKey, key)?;
        let value = self
            .adapter
            .fetch_key(key)
            .await
            .map_err(|e| self.transport(Operation::GetKey, e))?;

        Ok(match value {
            Some(value) => KeyRecord::found(key, value),
            None => KeyRecord::missing(key),
        })
    }

    /// Delete a key; deleting an absent key also succeeds
    pub async fn delete_key(&self, key: &str) -> PanelResult<OperationOutcome> {
        self.check_key(Operation::DeleteKey, key)?;
        let existed = self
            .adapter
            .remove_key(key)
            .await
            .map_err(|e| self.transport(Operation::DeleteKey, e))?;

        debug!(cache_name = %self.cache_name, key = key, existed = existed, "Cache key deleted");
        Ok(OperationOutcome::ok(if existed {
            format!("Key '{key}' deleted")
        } else {
            format!("Key '{key}' did not exist")
        }))
    }

    /// Create or update a key
    ///
    /// `timeout` is in seconds: `None` keeps the backend default, zero or
    /// negative expires the key immediately, infinity never expires.
    pub async fn edit_key(
        &self,
        key: &str,
        value: Value,
        timeout: Option<f64>,
    ) -> PanelResult<OperationOutcome> {
        self.write(Operation::EditKey, key, value, timeout).await?;
        Ok(OperationOutcome::ok(format!("Key '{key}' updated")))
    }

    /// Add a key; an existing key with the same name is overwritten
    pub async fn add_key(
        &self,
        key: &str,
        value: Value,
        timeout: Option<f64>,
    ) -> PanelResult<OperationOutcome> {
        self.write(Operation::AddKey, key, value, timeout).await?;
        Ok(OperationOutcome::ok(format!("Key '{key}' added")))
    }

    async fn write(
        &self,
        operation: Operation,
        key: &str,
        value: Value,
        timeout: Option<f64>,
    ) -> PanelResult<()> {
        self.check_key(operation, key)?;
        let expiration = Expiration::from_timeout(timeout)
            .ok_or_else(|| self.invalid_input(operation, "timeout must be a number"))?;

        self.adapter
            .store_key(key, &value, expiration)
            .await
            .map_err(|e| self.transport(operation, e))?;

        debug!(cache_name = %self.cache_name, key = key, operation = %operation, "Cache key written");
        Ok(())
    }

    /// Remove every entry of this cache instance
    pub async fn flush_cache(&self) -> PanelResult<OperationOutcome> {
        self.check(Operation::FlushCache)?;
        let removed = self
            .adapter
            .clear()
            .await
            .map_err(|e| self.transport(Operation::FlushCache, e))?;

        debug!(cache_name = %self.cache_name, removed = ?removed, "Cache flushed");
        Ok(OperationOutcome::ok(match removed {
            Some(count) => format!("Cache '{}' flushed ({count} keys removed)", self.cache_name),
            None => format!("Cache '{}' flushed", self.cache_name),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Adapter that records every primitive call
    #[derive(Debug, Default)]
    struct RecordingAdapter {
        calls: Mutex<Vec<&'static str>>,
        fail: bool,
    }

    impl RecordingAdapter {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn record(&self, call: &'static str) -> StoreResult<()> {
            self.calls.lock().push(call);
            if self.fail {
                Err(StoreError::BackendError("connection reset by peer".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl PanelAdapter for RecordingAdapter {
        fn adapter_name(&self) -> &'static str {
            "recording"
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::ALL.with(Operation::FlushCache, false)
        }

        fn implemented(&self) -> CapabilitySet {
            CapabilitySet::ALL
        }

        async fn scan_keys(&self, query: &KeyQuery) -> StoreResult<ScanResult> {
            self.record("scan")?;
            Ok(ScanResult::empty(query))
        }

        async fn fetch_key(&self, key: &str) -> StoreResult<Option<Value>> {
            self.record("get")?;
            Ok((key == "present").then(|| json!(null)))
        }

        async fn remove_key(&self, key: &str) -> StoreResult<bool> {
            self.record("delete")?;
            Ok(key == "present")
        }

        async fn store_key(&self, _key: &str, _value: &Value, _expiration: Expiration) -> StoreResult<()> {
            self.record("set")
        }

        async fn clear(&self) -> StoreResult<Option<u64>> {
            self.record("clear")?;
            Ok(Some(3))
        }
    }

    fn panel(adapter: RecordingAdapter) -> (CachePanel, Arc<RecordingAdapter>) {
        let adapter = Arc::new(adapter);
        (CachePanel::new("default", "test", adapter.clone()), adapter)
    }

    #[tokio::test]
    async fn test_disabled_capability_never_reaches_adapter() {
        let (panel, adapter) = panel(RecordingAdapter::default());
        let err = panel.flush_cache().await.unwrap_err();
        assert!(err.is_unsupported());
        assert!(adapter.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_overridden_capabilities_are_enforced() {
        let (panel, adapter) = panel(RecordingAdapter::default());
        let panel = panel.with_capabilities(CapabilitySet::NONE.with(Operation::GetKey, true));

        assert!(panel.query(&KeyQuery::default()).await.unwrap_err().is_unsupported());
        assert!(panel.delete_key("k").await.unwrap_err().is_unsupported());
        assert!(panel
            .edit_key("k", json!(1), None)
            .await
            .unwrap_err()
            .is_unsupported());
        assert!(panel.get_key("k").await.is_ok());
        assert_eq!(*adapter.calls.lock(), vec!["get"]);
    }

    #[tokio::test]
    async fn test_get_key_distinguishes_null_from_missing() {
        let (panel, _) = panel(RecordingAdapter::default());
        let present = panel.get_key("present").await.unwrap();
        assert!(present.exists);
        assert_eq!(present.value, Some(Value::Null));

        let absent = panel.get_key("absent").await.unwrap();
        assert!(!absent.exists);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (panel, _) = panel(RecordingAdapter::default());
        assert!(panel.delete_key("absent").await.unwrap().success);
        assert!(panel.delete_key("absent").await.unwrap().success);
    }

    #[tokio::test]
    async fn test_nan_timeout_is_rejected() {
        let (panel, adapter) = panel(RecordingAdapter::default());
        let err = panel.edit_key("k", json!(1), Some(f64::NAN)).await.unwrap_err();
        assert!(matches!(err, PanelError::InvalidInput { .. }));
        assert!(adapter.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected() {
        let (panel, _) = panel(RecordingAdapter::default());
        assert!(matches!(
            panel.get_key("").await,
            Err(PanelError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_scan_failure_degrades_to_error_result() {
        let (panel, _) = panel(RecordingAdapter::failing());
        let result = panel.query(&KeyQuery::default()).await.unwrap();
        assert!(result.keys.is_empty());
        assert_eq!(result.total_count, 0);
        assert!(result.error.unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_other_failures_carry_context() {
        let (panel, _) = panel(RecordingAdapter::failing());
        match panel.get_key("k").await.unwrap_err() {
            PanelError::BackendTransport {
                cache_name,
                backend_type,
                operation,
                source,
            } => {
                assert_eq!(cache_name, "default");
                assert_eq!(backend_type, "test");
                assert_eq!(operation, Operation::GetKey);
                assert!(source.to_string().contains("connection reset"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_oversized_timeouts_are_stored_without_deadline() {
        use crate::backends::{MemoryStore, MemoryTable};
        use crate::keys::KeyCodec;
        use crate::panel::adapters::LocalMemoryAdapter;

        let store = MemoryStore::new(MemoryTable::new(100), KeyCodec::default(), None);
        let panel = CachePanel::new(
            "default",
            "locmem",
            Arc::new(LocalMemoryAdapter::new(Arc::new(store))),
        );

        for (key, timeout) in [("a", 1e19), ("b", 1e20), ("c", f64::MAX)] {
            panel.edit_key(key, json!(key), Some(timeout)).await.unwrap();
            assert_eq!(panel.get_key(key).await.unwrap().value, Some(json!(key)));
        }
        panel.add_key("d", json!(4), Some(1e20)).await.unwrap();
        assert!(panel.get_key("d").await.unwrap().exists);
    }

    #[tokio::test]
    async fn test_flush_message_reports_count() {
        let (panel, _) = panel(RecordingAdapter::default());
        let panel = panel.with_capabilities(CapabilitySet::ALL);
        let outcome = panel.flush_cache().await.unwrap();
        assert!(outcome.message.contains("3 keys removed"));
    }
}
