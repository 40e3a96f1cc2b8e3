//! Scan engine helpers shared by the enumerating adapters.
//!
//! In-process and cursor-based listings both end the same way: decode the
//! physical keys of this instance's namespace, filter by the logical pattern,
//! sort, and slice out the requested page. SQL listings paginate natively and
//! only use [`decode_rows`].

use super::types::{KeyQuery, ScanKey, ScanResult};
use crate::backends::{RemoteKeyspace, StoreResult};
use crate::keys::{GlobPattern, KeyCodec};
use std::collections::BTreeMap;
use tracing::debug;

/// Decode physical keys and keep the ones matching `pattern`
///
/// Keys outside the codec's namespace are dropped. Duplicates collapse and
/// the result is sorted by logical key.
pub fn decode_matching<I, S>(physical_keys: I, codec: &KeyCodec, pattern: &GlobPattern) -> Vec<ScanKey>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut matched: BTreeMap<String, String> = BTreeMap::new();
    for physical in physical_keys {
        let physical = physical.as_ref();
        if let Some(logical) = codec.decode(physical) {
            if pattern.matches(&logical) {
                matched.insert(logical, physical.to_string());
            }
        }
    }
    matched
        .into_iter()
        .map(|(key, physical)| ScanKey::new(key, Some(physical)))
        .collect()
}

/// Sort, deduplicate and slice a full key list into one page
pub fn paginate(mut keys: Vec<ScanKey>, query: &KeyQuery) -> ScanResult {
    let query = query.normalized();
    keys.sort();
    keys.dedup_by(|a, b| a.key == b.key);

    let total_count = keys.len() as u64;
    let start = usize::try_from(query.offset()).unwrap_or(usize::MAX);
    let page: Vec<ScanKey> = keys
        .into_iter()
        .skip(start)
        .take(usize::try_from(query.per_page).unwrap_or(usize::MAX))
        .collect();

    ScanResult {
        keys: page,
        total_count,
        page: query.page,
        per_page: query.per_page,
        error: None,
    }
}

/// Decode one page of SQL rows already ordered and sliced by the database
pub fn decode_rows(rows: Vec<String>, codec: &KeyCodec) -> Vec<ScanKey> {
    rows.into_iter()
        .filter_map(|physical| {
            codec
                .decode(&physical)
                .map(|logical| ScanKey::new(logical, Some(physical)))
        })
        .collect()
}

/// Follow a native cursor scan until the server reports cursor zero
///
/// The native `MATCH` is scoped to the namespace and already applies the
/// pattern. Keys are still filtered locally and deduplicated, since `SCAN`
/// may return a key more than once.
pub async fn cursor_scan(
    store: &dyn RemoteKeyspace,
    pattern: &GlobPattern,
    scan_count: u64,
) -> StoreResult<Vec<ScanKey>> {
    let codec = store.codec();
    let native = codec.redis_match(pattern);
    let mut matched: BTreeMap<String, String> = BTreeMap::new();
    let mut cursor: u64 = 0;
    let mut rounds: u64 = 0;

    loop {
        let page = store.scan_page(cursor, &native, scan_count).await?;
        rounds += 1;
        for raw in &page.keys {
            if let Some((logical, physical)) = codec.decode_bytes(raw) {
                if pattern.matches(&logical) {
                    matched.insert(logical, physical);
                }
            }
        }

        cursor = page.cursor;
        if cursor == 0 {
            break;
        }
    }

    debug!(
        pattern = %native,
        rounds = rounds,
        matched = matched.len(),
        "Cursor scan complete"
    );

    Ok(matched
        .into_iter()
        .map(|(key, physical)| ScanKey::new(key, Some(physical)))
        .collect())
}
