//! Null cache store
//!
//! Stores nothing. Reads always miss, writes and deletes succeed silently.

use super::error::StoreResult;
use super::expiration::Expiration;
use super::NativeCache;
use async_trait::async_trait;
use serde_json::Value;

/// Cache handle for a dummy backend that never keeps anything
#[derive(Debug, Clone, Default)]
pub struct NullStore;

impl NullStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NativeCache for NullStore {
    fn backend_name(&self) -> &'static str {
        "null"
    }

    async fn get(&self, _key: &str) -> StoreResult<Option<Value>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &Value, _expiration: Expiration) -> StoreResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> StoreResult<bool> {
        Ok(false)
    }

    async fn clear(&self) -> StoreResult<u64> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_null_get_returns_none_after_set() {
        let svc = NullStore::new();
        svc.set("key", &json!("value"), Expiration::Never)
            .await
            .unwrap();
        assert_eq!(svc.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_null_delete_and_clear() {
        let svc = NullStore::new();
        assert!(!svc.delete("key").await.unwrap());
        assert_eq!(svc.clear().await.unwrap(), 0);
        assert_eq!(svc.backend_name(), "null");
    }
}
