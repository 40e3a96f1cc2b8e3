//! Shared fixtures for the integration tests.

#![allow(dead_code)]

pub mod builders;
pub mod fake_remote;

use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Unique name for per-test tables, prefixes and directories
pub fn unique_name(base: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{base}_{}_{n}", std::process::id())
}
