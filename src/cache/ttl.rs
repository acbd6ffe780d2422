//! TTL Module
//!
//! Time-to-live value object shared by the facade, backends and dependencies.

use std::time::Duration;

// == Ttl ==
/// A duration in whole seconds, or forever.
///
/// Zero and negative durations are "already expired".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Ttl(Option<i64>);

impl Ttl {
    // == Constructors ==
    pub const fn forever() -> Self {
        Self(None)
    }

    pub const fn seconds(secs: i64) -> Self {
        Self(Some(secs))
    }

    pub const fn minutes(mins: i64) -> Self {
        Self(Some(mins * 60))
    }

    pub const fn hours(hours: i64) -> Self {
        Self(Some(hours * 3600))
    }

    pub const fn days(days: i64) -> Self {
        Self(Some(days * 86_400))
    }

    // == Accessors ==
    /// Seconds to live, `None` for forever.
    pub fn as_secs(&self) -> Option<i64> {
        self.0
    }

    pub fn is_forever(&self) -> bool {
        self.0.is_none()
    }

    /// True for zero or negative durations.
    pub fn is_expired(&self) -> bool {
        matches!(self.0, Some(secs) if secs <= 0)
    }

    // == Expiry ==
    /// Absolute expiry in Unix milliseconds, counted from `now_ms`.
    pub fn expiry_from(&self, now_ms: u64) -> Option<u64> {
        self.0.map(|secs| {
            if secs <= 0 {
                now_ms
            } else {
                now_ms.saturating_add((secs as u64).saturating_mul(1000))
            }
        })
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Self(Some(i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)))
    }
}

impl From<chrono::Duration> for Ttl {
    fn from(duration: chrono::Duration) -> Self {
        Self(Some(duration.num_seconds()))
    }
}

impl From<Option<i64>> for Ttl {
    fn from(secs: Option<i64>) -> Self {
        Self(secs)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forever_has_no_expiry() {
        let ttl = Ttl::forever();
        assert!(ttl.is_forever());
        assert!(!ttl.is_expired());
        assert_eq!(ttl.expiry_from(1_000), None);
    }

    #[test]
    fn test_unit_constructors() {
        assert_eq!(Ttl::minutes(2).as_secs(), Some(120));
        assert_eq!(Ttl::hours(1).as_secs(), Some(3600));
        assert_eq!(Ttl::days(1).as_secs(), Some(86_400));
    }

    #[test]
    fn test_from_durations() {
        assert_eq!(Ttl::from(Duration::from_secs(90)), Ttl::seconds(90));
        assert_eq!(Ttl::from(chrono::Duration::minutes(3)), Ttl::seconds(180));
    }

    #[test]
    fn test_expiry_from() {
        assert_eq!(Ttl::seconds(5).expiry_from(10_000), Some(15_000));
    }

    #[test]
    fn test_non_positive_is_expired() {
        assert!(Ttl::seconds(0).is_expired());
        assert!(Ttl::seconds(-3).is_expired());
        assert_eq!(Ttl::seconds(-3).expiry_from(500), Some(500));
    }
}
