//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use crate::clock::duration_ms;

// == Cache Entry ==
/// A cached value together with its lifetime bounds.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Insertion timestamp (Unix milliseconds)
    pub inserted_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry that lives for `ttl` starting at `now_ms`.
    pub fn new(value: V, now_ms: u64, ttl: Duration) -> Self {
        Self {
            value,
            inserted_at: now_ms,
            expires_at: now_ms.saturating_add(duration_ms(ttl)),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry stays readable through its expiration millisecond and is gone
    /// once `now_ms` is strictly past it.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining lifetime in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("club", 1_000, Duration::from_secs(60));

        assert_eq!(entry.value, "club");
        assert_eq!(entry.inserted_at, 1_000);
        assert_eq!(entry.expires_at, 61_000);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new(1u32, 0, Duration::from_millis(100));

        assert!(!entry.is_expired(99));
        assert!(!entry.is_expired(100), "Entry is still live at expires_at");
        assert!(entry.is_expired(101));
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = CacheEntry::new((), 5_000, Duration::from_secs(10));

        assert_eq!(entry.ttl_remaining_ms(5_000), 10_000);
        assert_eq!(entry.ttl_remaining_ms(14_000), 1_000);
        assert_eq!(entry.ttl_remaining_ms(20_000), 0);
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = CacheEntry::new((), u64::MAX - 10, Duration::from_secs(60));
        assert_eq!(entry.expires_at, u64::MAX);
        assert!(!entry.is_expired(u64::MAX));
    }
}
