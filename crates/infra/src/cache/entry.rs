//! Cache entry lifecycle.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// A cached artifact: its backing path, TTL, and current expiry.
///
/// Created by a successful store; renewed by each successful fetch (sliding
/// window); removed by eviction or garbage collection. The backing path is
/// exclusive to the cache; nothing else may alias it.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    path: PathBuf,
    ttl: Duration,
    expires_at: Instant,
}

impl CacheEntry {
    /// Record a freshly materialised artifact.
    pub fn new(path: PathBuf, ttl: Duration, now: Instant) -> Self {
        Self { path, ttl, expires_at: now + ttl }
    }

    /// The backing path inside the cache directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the entry expires, absent further renewal.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Renew the sliding window: `expires_at = now + ttl`.
    pub fn touch(&mut self, now: Instant) {
        self.expires_at = now + self.ttl;
    }

    /// Whether the entry has expired as of `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the entry lifecycle.
    use super::*;

    #[test]
    fn test_expiry_follows_last_touch() {
        let start = Instant::now();
        let ttl = Duration::from_secs(10);
        let mut entry = CacheEntry::new(PathBuf::from("/cache/key"), ttl, start);

        assert!(!entry.is_expired(start));
        assert!(!entry.is_expired(start + Duration::from_secs(9)));
        assert!(entry.is_expired(start + Duration::from_secs(10)));

        // sliding window: touching pushes expiry out from the touch time
        let touch = start + Duration::from_secs(8);
        entry.touch(touch);
        assert!(!entry.is_expired(start + Duration::from_secs(15)));
        assert!(entry.is_expired(touch + ttl));
        assert_eq!(entry.expires_at(), touch + ttl);
    }
}
