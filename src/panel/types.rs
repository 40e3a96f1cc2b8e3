//! Request and result shapes shared by every adapter.

use crate::keys::{pattern::MATCH_ALL, GlobPattern};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PER_PAGE: u64 = 25;
pub const DEFAULT_SCAN_COUNT: u64 = 100;

/// Key listing request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyQuery {
    /// Shell-style pattern; `*` and `?` are the only wildcards
    pub pattern: String,
    /// 1-indexed page number
    pub page: u64,
    pub per_page: u64,
    /// Batch size hint for cursor scans; does not affect results
    pub scan_count: u64,
}

impl Default for KeyQuery {
    fn default() -> Self {
        Self {
            pattern: MATCH_ALL.to_string(),
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }
}

impl KeyQuery {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page: u64, per_page: u64) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }

    pub fn with_scan_count(mut self, scan_count: u64) -> Self {
        self.scan_count = scan_count;
        self
    }

    /// Replace out-of-range values with defaults
    pub fn normalized(&self) -> Self {
        Self {
            pattern: self.pattern.clone(),
            page: self.page.max(DEFAULT_PAGE),
            per_page: if self.per_page == 0 {
                DEFAULT_PER_PAGE
            } else {
                self.per_page
            },
            scan_count: if self.scan_count == 0 {
                DEFAULT_SCAN_COUNT
            } else {
                self.scan_count
            },
        }
    }

    pub fn glob(&self) -> GlobPattern {
        GlobPattern::new(&self.pattern)
    }

    /// Index of the first key on the requested page
    pub fn offset(&self) -> u64 {
        self.page
            .max(DEFAULT_PAGE)
            .saturating_sub(1)
            .saturating_mul(self.per_page)
    }
}

/// One listed key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScanKey {
    pub key: String,
    /// Physical key as stored, when the backend reports it
    pub physical_key: Option<String>,
}

impl ScanKey {
    pub fn new(key: impl Into<String>, physical_key: Option<String>) -> Self {
        Self {
            key: key.into(),
            physical_key,
        }
    }
}

/// One page of a key listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub keys: Vec<ScanKey>,
    /// Size of the full matching set before pagination
    pub total_count: u64,
    pub page: u64,
    pub per_page: u64,
    /// Non-fatal failure text; set together with an empty key list
    pub error: Option<String>,
}

impl ScanResult {
    pub fn empty(query: &KeyQuery) -> Self {
        Self {
            keys: Vec::new(),
            total_count: 0,
            page: query.page,
            per_page: query.per_page,
            error: None,
        }
    }

    /// Empty result carrying a scan failure
    pub fn failed(query: &KeyQuery, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(query)
        }
    }

    pub fn key_names(&self) -> Vec<&str> {
        self.keys.iter().map(|k| k.key.as_str()).collect()
    }

    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.per_page)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Result of a single-key lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub key: String,
    /// Stored value; `None` only when the key does not exist
    pub value: Option<Value>,
    pub exists: bool,
    pub type_hint: Option<String>,
}

impl KeyRecord {
    pub fn found(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            type_hint: Some(type_hint(&value).to_string()),
            value: Some(value),
            exists: true,
        }
    }

    pub fn missing(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            exists: false,
            type_hint: None,
        }
    }
}

/// JSON type name of a stored value
pub fn type_hint(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Result of a mutating operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub success: bool,
    pub message: String,
}

impl OperationOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_defaults() {
        let query = KeyQuery::default();
        assert_eq!(query.pattern, "*");
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 25);
        assert_eq!(query.scan_count, 100);
    }

    #[test]
    fn test_query_normalization_and_offset() {
        let query = KeyQuery::new("a*").with_page(0, 0).with_scan_count(0).normalized();
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 25);
        assert_eq!(query.scan_count, 100);
        assert_eq!(query.offset(), 0);

        assert_eq!(KeyQuery::new("*").with_page(3, 10).offset(), 20);
    }

    #[test]
    fn test_failed_result_is_empty() {
        let result = ScanResult::failed(&KeyQuery::default(), "connection refused");
        assert!(result.keys.is_empty());
        assert_eq!(result.total_count, 0);
        assert_eq!(result.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_page_navigation() {
        let result = ScanResult {
            keys: Vec::new(),
            total_count: 30,
            page: 2,
            per_page: 10,
            error: None,
        };
        assert_eq!(result.total_pages(), 3);
        assert!(result.has_next());
        assert!(result.has_previous());
    }

    #[test]
    fn test_key_record_distinguishes_null_from_missing() {
        let null = KeyRecord::found("k", Value::Null);
        assert!(null.exists);
        assert_eq!(null.value, Some(Value::Null));
        assert_eq!(null.type_hint.as_deref(), Some("null"));

        let missing = KeyRecord::missing("k");
        assert!(!missing.exists);
        assert_eq!(missing.value, None);
    }

    #[test]
    fn test_type_hints() {
        assert_eq!(type_hint(&json!(1)), "integer");
        assert_eq!(type_hint(&json!(1.5)), "float");
        assert_eq!(type_hint(&json!("s")), "string");
        assert_eq!(type_hint(&json!([1])), "array");
        assert_eq!(type_hint(&json!({"a": 1})), "object");
        assert_eq!(type_hint(&json!(false)), "boolean");
    }
}
