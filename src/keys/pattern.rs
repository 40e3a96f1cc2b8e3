//! Shell-style key patterns and their native translations.
//!
//! Only `*` (any run, including empty) and `?` (exactly one character) are
//! wildcards. Everything else, including `[`, `%` and `_`, is literal, so the
//! same pattern means the same thing whether it is evaluated in process, by a
//! SQL `LIKE`, or by a Redis `SCAN MATCH`.

use std::fmt;
use wildmatch::WildMatch;

/// Pattern that matches every key.
pub const MATCH_ALL: &str = "*";

/// A validated shell-style key pattern.
#[derive(Clone)]
pub struct GlobPattern {
    raw: String,
    matcher: WildMatch,
}

impl fmt::Debug for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobPattern").field(&self.raw).finish()
    }
}

impl fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Default for GlobPattern {
    fn default() -> Self {
        Self::new(MATCH_ALL)
    }
}

impl GlobPattern {
    /// Build a pattern; an empty or blank pattern means "all keys".
    pub fn new(pattern: &str) -> Self {
        let raw = if pattern.trim().is_empty() {
            MATCH_ALL.to_string()
        } else {
            pattern.to_string()
        };
        let matcher = WildMatch::new(&raw);
        Self { raw, matcher }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when the pattern contains no wildcard and names a single key.
    pub fn is_exact(&self) -> bool {
        !self.raw.contains(['*', '?'])
    }

    /// True when the pattern accepts every key.
    pub fn matches_all(&self) -> bool {
        self.raw.chars().all(|c| c == '*')
    }

    pub fn matches(&self, key: &str) -> bool {
        if self.is_exact() {
            return self.raw == key;
        }
        self.matches_all() || self.matcher.matches(key)
    }

    /// Translate to a SQL `LIKE` operand, to be used with `ESCAPE '\'`.
    pub fn to_like(&self) -> String {
        let mut like = String::with_capacity(self.raw.len());
        for c in self.raw.chars() {
            match c {
                '*' => like.push('%'),
                '?' => like.push('_'),
                '%' | '_' | '\\' => {
                    like.push('\\');
                    like.push(c);
                }
                _ => like.push(c),
            }
        }
        like
    }

    /// Translate to a Redis `MATCH` pattern with character classes disabled.
    pub fn to_redis_match(&self) -> String {
        let mut native = String::with_capacity(self.raw.len());
        for c in self.raw.chars() {
            match c {
                '[' | ']' | '\\' => {
                    native.push('\\');
                    native.push(c);
                }
                _ => native.push(c),
            }
        }
        native
    }
}

/// Escape a literal for use inside a SQL `LIKE` operand.
pub fn escape_like(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape a literal for use inside a Redis glob.
pub fn escape_redis_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pattern_matches_everything() {
        let pattern = GlobPattern::new("");
        assert_eq!(pattern.as_str(), "*");
        assert!(pattern.matches_all());
        assert!(pattern.matches("anything:at:all"));
    }

    #[test]
    fn test_prefix_wildcard() {
        let pattern = GlobPattern::new("test:*");
        assert!(pattern.matches("test:key1"));
        assert!(pattern.matches("test:"));
        assert!(!pattern.matches("other:key"));
        assert!(!pattern.is_exact());
    }

    #[test]
    fn test_single_character_wildcard() {
        let pattern = GlobPattern::new("key?");
        assert!(pattern.matches("key1"));
        assert!(!pattern.matches("key"));
        assert!(!pattern.matches("key12"));
    }

    #[test]
    fn test_exact_pattern() {
        let pattern = GlobPattern::new("exact:match:key");
        assert!(pattern.is_exact());
        assert!(pattern.matches("exact:match:key"));
        assert!(!pattern.matches("exact:match:key2"));
    }

    #[test]
    fn test_brackets_are_literal() {
        let pattern = GlobPattern::new("list[1]");
        assert!(pattern.matches("list[1]"));
        assert!(!pattern.matches("list1"));
    }

    #[test]
    fn test_like_translation() {
        assert_eq!(GlobPattern::new("test:*").to_like(), "test:%");
        assert_eq!(GlobPattern::new("a?c").to_like(), "a_c");
        assert_eq!(GlobPattern::new("100%_done").to_like(), "100\\%\\_done");
        assert_eq!(GlobPattern::new("back\\slash").to_like(), "back\\\\slash");
    }

    #[test]
    fn test_redis_translation() {
        assert_eq!(GlobPattern::new("user:*").to_redis_match(), "user:*");
        assert_eq!(GlobPattern::new("list[1]?").to_redis_match(), "list\\[1\\]?");
    }

    #[test]
    fn test_escape_helpers() {
        assert_eq!(escape_like(":1:a_b:"), ":1:a\\_b:");
        assert_eq!(escape_redis_glob(":1:a*b:"), ":1:a\\*b:");
    }
}
