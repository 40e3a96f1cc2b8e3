//! Relational caches on in-memory SQLite.

mod common;

use cache_panel::config::CacheInstanceConfig;
use cache_panel::panel::{KeyQuery, Operation};
use common::builders::TestPanelBuilder;
use common::unique_name;
use serde_json::json;

fn sqlite_cache(table: &str) -> CacheInstanceConfig {
    CacheInstanceConfig::new("sqlite")
        .with_location("sqlite::memory:")
        .with_table(table)
        .with_create_table(true)
}

#[tokio::test]
async fn test_database_scenario() {
    let panel = TestPanelBuilder::new()
        .with_cache("db", sqlite_cache(&unique_name("cache")))
        .build()
        .resolve("db");
    assert_eq!(panel.adapter_name(), "database");
    assert!(panel.is_supported(Operation::Query));

    for (key, value) in [("a", json!(1)), ("b", json!([1, 2])), ("c", json!(null))] {
        panel.add_key(key, value, None).await.unwrap();
    }
    let result = panel.query(&KeyQuery::default()).await.unwrap();
    assert_eq!(result.key_names(), vec!["a", "b", "c"]);

    panel.delete_key("a").await.unwrap();
    let result = panel.query(&KeyQuery::default()).await.unwrap();
    assert_eq!(result.total_count, 2);

    let record = panel.get_key("b").await.unwrap();
    assert_eq!(record.value, Some(json!([1, 2])));
    assert_eq!(record.type_hint.as_deref(), Some("array"));
}

#[tokio::test]
async fn test_expired_rows_are_not_listed() {
    let panel = TestPanelBuilder::new()
        .with_cache("db", sqlite_cache(&unique_name("cache")))
        .build()
        .resolve("db");
    panel.edit_key("fresh", json!("yes"), Some(3600.0)).await.unwrap();
    panel.edit_key("stale", json!("no"), Some(-1.0)).await.unwrap();

    let result = panel.query(&KeyQuery::default()).await.unwrap();
    assert_eq!(result.key_names(), vec!["fresh"]);
    assert_eq!(result.total_count, 1);
    assert!(!panel.get_key("stale").await.unwrap().exists);
}

#[tokio::test]
async fn test_database_pagination_and_pattern() {
    let panel = TestPanelBuilder::new()
        .with_cache("db", sqlite_cache(&unique_name("cache")))
        .build()
        .resolve("db");
    for i in 0..25 {
        panel
            .edit_key(&format!("user:{i:02}"), json!(i), None)
            .await
            .unwrap();
    }
    panel.edit_key("user_profile", json!(0), None).await.unwrap();
    panel.edit_key("session:1", json!(0), None).await.unwrap();

    let last = panel
        .query(&KeyQuery::new("user:*").with_page(3, 10))
        .await
        .unwrap();
    assert_eq!(last.total_count, 25);
    assert_eq!(last.key_names(), vec!["user:20", "user:21", "user:22", "user:23", "user:24"]);

    // `_` is a LIKE wildcard and must only match itself
    let literal = panel.query(&KeyQuery::new("user_*")).await.unwrap();
    assert_eq!(literal.key_names(), vec!["user_profile"]);
}

#[tokio::test]
async fn test_database_flush_keeps_other_namespaces() {
    let test = TestPanelBuilder::new()
        .with_cache(
            "first",
            sqlite_cache("shared_cache").with_key_prefix("first"),
        )
        .with_cache(
            "second",
            sqlite_cache("shared_cache").with_key_prefix("second"),
        )
        .build();
    let first = test.resolve("first");
    let second = test.resolve("second");

    first.edit_key("k", json!(1), None).await.unwrap();
    second.edit_key("k", json!(2), None).await.unwrap();

    first.flush_cache().await.unwrap();
    assert!(!first.get_key("k").await.unwrap().exists);
    assert_eq!(second.get_key("k").await.unwrap().value, Some(json!(2)));
}
