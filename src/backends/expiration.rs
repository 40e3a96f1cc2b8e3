//! Retention requested for a write.

use std::time::Duration;

/// Timeouts longer than this are treated as "never expire" (100 years)
pub const MAX_TIMEOUT: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Retention requested by a caller for a single write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expiration {
    /// Use the instance's configured default timeout
    Default,
    /// Keep until deleted or evicted
    Never,
    /// Expire after the given duration
    After(Duration),
    /// Store as already expired (a timeout of zero or less)
    Immediately,
}

/// Effective lifetime of a write once the instance default is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Persistent,
    Expires(Duration),
    Expired,
}

impl Expiration {
    /// Interpret an operator-supplied timeout in seconds.
    ///
    /// `None` keeps the backend default, zero or negative values expire the key
    /// immediately, and anything past [`MAX_TIMEOUT`] (including `+inf`) never
    /// expires. Returns `None` for NaN.
    pub fn from_timeout(timeout: Option<f64>) -> Option<Self> {
        match timeout {
            None => Some(Self::Default),
            Some(t) if t.is_nan() => None,
            Some(t) if t <= 0.0 => Some(Self::Immediately),
            Some(t) => match Duration::try_from_secs_f64(t) {
                Ok(d) if d <= MAX_TIMEOUT => Some(Self::After(d)),
                _ => Some(Self::Never),
            },
        }
    }

    pub fn ttl(self, default_ttl: Option<Duration>) -> Ttl {
        match self {
            Self::Default => default_ttl.map_or(Ttl::Persistent, Ttl::Expires),
            Self::Never => Ttl::Persistent,
            Self::After(d) if d.is_zero() => Ttl::Expired,
            Self::After(d) if d > MAX_TIMEOUT => Ttl::Persistent,
            Self::After(d) => Ttl::Expires(d),
            Self::Immediately => Ttl::Expired,
        }
    }
}

/// Convert a configured default timeout; zero means "never expire".
pub fn default_ttl_from_seconds(seconds: u64) -> Option<Duration> {
    (seconds > 0).then(|| Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_timeout() {
        assert_eq!(Expiration::from_timeout(None), Some(Expiration::Default));
        assert_eq!(
            Expiration::from_timeout(Some(120.0)),
            Some(Expiration::After(Duration::from_secs(120)))
        );
        assert_eq!(
            Expiration::from_timeout(Some(0.0)),
            Some(Expiration::Immediately)
        );
        assert_eq!(
            Expiration::from_timeout(Some(-5.0)),
            Some(Expiration::Immediately)
        );
        assert_eq!(
            Expiration::from_timeout(Some(f64::INFINITY)),
            Some(Expiration::Never)
        );
        assert_eq!(Expiration::from_timeout(Some(f64::NAN)), None);
    }

    #[test]
    fn test_oversized_timeouts_never_expire() {
        for timeout in [1e10, 1e19, 1e20, f64::MAX] {
            assert_eq!(
                Expiration::from_timeout(Some(timeout)),
                Some(Expiration::Never),
                "timeout {timeout}"
            );
        }
        assert_eq!(
            Expiration::from_timeout(Some(MAX_TIMEOUT.as_secs_f64())),
            Some(Expiration::After(MAX_TIMEOUT))
        );
        assert_eq!(
            Expiration::After(Duration::MAX).ttl(None),
            Ttl::Persistent
        );
    }

    #[test]
    fn test_ttl_applies_default() {
        let default = Some(Duration::from_secs(300));
        assert_eq!(
            Expiration::Default.ttl(default),
            Ttl::Expires(Duration::from_secs(300))
        );
        assert_eq!(Expiration::Default.ttl(None), Ttl::Persistent);
        assert_eq!(Expiration::Never.ttl(default), Ttl::Persistent);
        assert_eq!(Expiration::Immediately.ttl(default), Ttl::Expired);
    }

    #[test]
    fn test_default_ttl_zero_means_never() {
        assert_eq!(default_ttl_from_seconds(0), None);
        assert_eq!(
            default_ttl_from_seconds(60),
            Some(Duration::from_secs(60))
        );
    }
}
