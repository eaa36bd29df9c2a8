//! In-process report cache, keyed by canonicalized URL. Advisory only:
//! entries are reclaimed lazily on read, there is no LRU bound.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use webaudit_core::Report;

struct CacheEntry {
    payload: Report,
    created_at: Instant,
    expires_at: Instant,
}

/// A cache hit: the stored payload plus its age.
pub struct CachedReport {
    pub payload: Report,
    pub age: Duration,
}

pub struct ReportCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ReportCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn with_ttl_ms(ttl_ms: u64) -> Self {
        Self::new(Duration::from_millis(ttl_ms))
    }

    /// Fresh payload for `key`, or nothing. Expired entries are removed on
    /// the way out.
    pub fn get(&self, key: &str) -> Option<CachedReport> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if Instant::now() < entry.expires_at {
                    debug!(key, "cache hit");
                    return Some(CachedReport {
                        payload: entry.payload.clone(),
                        age: entry.created_at.elapsed(),
                    });
                }
                true
            }
            None => false,
        };
        if expired {
            debug!(key, "cache entry expired");
            self.entries.remove(key);
        }
        None
    }

    /// Store a payload. Callers only insert successful reports; blocked and
    /// timed-out audits must be re-run, never replayed.
    pub fn set(&self, key: &str, payload: Report) {
        let now = Instant::now();
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                payload,
                created_at: now,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
