//! Short-TTL memoization of list-all fetches.
//!
//! The fuzzy resolver re-reads the full task/event lists for every
//! directive; within one interaction those reads hit this cache instead of
//! the network. Mutating handlers invalidate their key so reads after a
//! write are always fresh. Foreground-only — no cross-thread access.

use std::time::{Duration, Instant};

/// One cached payload with its fetch timestamp.
pub struct CacheSlot<T> {
    entry: Option<(T, Instant)>,
    ttl: Duration,
}

impl<T> CacheSlot<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { entry: None, ttl }
    }

    /// The cached payload, if still within the TTL.
    pub fn get(&self) -> Option<&T> {
        match &self.entry {
            Some((value, fetched)) if fetched.elapsed() < self.ttl => Some(value),
            _ => None,
        }
    }

    pub fn put(&mut self, value: T) {
        self.entry = Some((value, Instant::now()));
    }

    /// Drop the cached payload; the next read refetches.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
