//! Relational table adapter.
//!
//! Pagination happens in the database: one `COUNT(*)` for the total, then an
//! ordered `LIMIT/OFFSET` select for the page. Expired rows are excluded from
//! both.

use crate::backends::{DatabaseTable, Expiration, NativeCache, StoreResult};
use crate::panel::adapter::PanelAdapter;
use crate::panel::capabilities::CapabilitySet;
use crate::panel::scan::decode_rows;
use crate::panel::types::{KeyQuery, ScanResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DatabaseAdapter {
    table: Arc<DatabaseTable>,
}

impl DatabaseAdapter {
    pub const NAME: &'static str = "database";

    pub fn new(table: Arc<DatabaseTable>) -> Self {
        Self { table }
    }
}

#[async_trait]
impl PanelAdapter for DatabaseAdapter {
    fn adapter_name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::ALL
    }

    async fn scan_keys(&self, query: &KeyQuery) -> StoreResult<ScanResult> {
        let like = self.table.codec().like_pattern(&query.glob());
        let total_count = self.table.count_matching(&like).await?;

        let mut result = ScanResult::empty(query);
        result.total_count = total_count;
        if query.offset() >= total_count {
            return Ok(result);
        }

        let rows = self
            .table
            .page_matching(&like, query.per_page, query.offset())
            .await?;
        result.keys = decode_rows(rows, self.table.codec());
        Ok(result)
    }

    async fn fetch_key(&self, key: &str) -> StoreResult<Option<Value>> {
        self.table.get(key).await
    }

    async fn remove_key(&self, key: &str) -> StoreResult<bool> {
        self.table.delete(key).await
    }

    async fn store_key(&self, key: &str, value: &Value, expiration: Expiration) -> StoreResult<()> {
        self.table.set(key, value, expiration).await
    }

    async fn clear(&self) -> StoreResult<Option<u64>> {
        self.table.clear().await.map(Some)
    }
}
