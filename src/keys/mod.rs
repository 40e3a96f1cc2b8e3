//! # Key Codec
//!
//! Translates between the logical keys operators type and the physical keys
//! backends actually store.
//!
//! Every namespaced backend stores a logical key `k` as
//!
//! ```text
//! :<version>:<prefix>:<k>      (prefix configured)
//! :<version>:<k>               (no prefix)
//! ```
//!
//! Decoding splits the physical key on `:` into at most three parts, checks
//! the version, then strips the configured prefix and its separator. Keys that
//! do not belong to the codec's namespace decode to `None`, which lets stores
//! shared by several logical caches (one Redis server, one database table, one
//! in-process table) enumerate and flush only their own keys.

pub mod pattern;

pub use pattern::GlobPattern;

/// Default key version, matching the usual cache-framework default.
pub const DEFAULT_KEY_VERSION: u32 = 1;

/// Separator between key segments.
const SEPARATOR: char = ':';

/// Encodes logical keys into one instance's physical namespace and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCodec {
    prefix: String,
    version: u32,
}

impl Default for KeyCodec {
    fn default() -> Self {
        Self::new("", DEFAULT_KEY_VERSION)
    }
}

impl KeyCodec {
    pub fn new(prefix: impl Into<String>, version: u32) -> Self {
        Self {
            prefix: prefix.into(),
            version,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Physical prefix shared by every key of this instance.
    pub fn namespace(&self) -> String {
        let mut namespace = format!("{SEPARATOR}{}{SEPARATOR}", self.version);
        if !self.prefix.is_empty() {
            namespace.push_str(&self.prefix);
            if !self.prefix.ends_with(SEPARATOR) {
                namespace.push(SEPARATOR);
            }
        }
        namespace
    }

    /// Logical key to physical key.
    pub fn encode(&self, key: &str) -> String {
        let mut physical = self.namespace();
        physical.push_str(key);
        physical
    }

    /// Physical key to logical key, or `None` when the key is outside this
    /// codec's version/prefix namespace.
    pub fn decode(&self, physical: &str) -> Option<String> {
        let mut parts = physical.splitn(3, SEPARATOR);
        let lead = parts.next()?;
        let version = parts.next()?;
        let rest = parts.next()?;

        if !lead.is_empty() || version.parse::<u32>().ok()? != self.version {
            return None;
        }

        if self.prefix.is_empty() {
            return Some(rest.to_string());
        }

        let stripped = rest.strip_prefix(self.prefix.as_str())?;
        if self.prefix.ends_with(SEPARATOR) {
            return Some(stripped.to_string());
        }
        stripped.strip_prefix(SEPARATOR).map(str::to_string)
    }

    /// Decode raw key bytes as returned by remote servers.
    ///
    /// Keys that are not valid UTF-8 cannot be addressed through the logical
    /// API and are skipped.
    pub fn decode_bytes(&self, physical: &[u8]) -> Option<(String, String)> {
        let physical = std::str::from_utf8(physical).ok()?;
        self.decode(physical)
            .map(|logical| (logical, physical.to_string()))
    }

    /// Native `MATCH` pattern for a Redis-style `SCAN`, scoped to this namespace.
    pub fn redis_match(&self, pattern: &GlobPattern) -> String {
        let mut native = pattern::escape_redis_glob(&self.namespace());
        native.push_str(&pattern.to_redis_match());
        native
    }

    /// SQL `LIKE` operand (used with `ESCAPE '\'`), scoped to this namespace.
    pub fn like_pattern(&self, pattern: &GlobPattern) -> String {
        let mut native = pattern::escape_like(&self.namespace());
        native.push_str(&pattern.to_like());
        native
    }
}
