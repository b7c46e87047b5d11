//! Assistant configuration and collaborator availability.
//!
//! Each external collaborator is wrapped in `Capability`: either a live
//! handle or an explicit reason it is unavailable. Handlers match on the
//! capability instead of probing a global flag.

use std::sync::Arc;
use std::time::Duration;

/// Availability of an external collaborator.
pub enum Capability<T: ?Sized> {
    Available(Arc<T>),
    Unavailable(String),
}

impl<T: ?Sized> Capability<T> {
    /// The live handle, or the reason it is missing.
    pub fn get(&self) -> std::result::Result<&Arc<T>, &str> {
        match self {
            Capability::Available(handle) => Ok(handle),
            Capability::Unavailable(reason) => Err(reason.as_str()),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }
}

impl<T: ?Sized> Clone for Capability<T> {
    fn clone(&self) -> Self {
        match self {
            Capability::Available(handle) => Capability::Available(Arc::clone(handle)),
            Capability::Unavailable(reason) => Capability::Unavailable(reason.clone()),
        }
    }
}

/// Tunables for the interpreter core.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Minimum fuzzy-match score (0–100) for tier-3 resolution.
    pub fuzzy_threshold: u32,
    /// Freshness window for cached list-all fetches.
    pub cache_ttl: Duration,
    /// Scheduled-send poll interval.
    pub poll_interval: Duration,
    /// Poll interval after a failed iteration.
    pub poll_backoff: Duration,
    /// Horizon (days) for "upcoming events" fetches backing the resolver.
    pub upcoming_days: i64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 70,
            cache_ttl: Duration::from_secs(5),
            poll_interval: Duration::from_secs(30),
            poll_backoff: Duration::from_secs(60),
            upcoming_days: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_available() {
        let cap: Capability<str> = Capability::Available(Arc::from("handle"));
        assert!(cap.is_available());
        assert_eq!(cap.get().map(|h| h.as_ref() as &str), Ok("handle"));
    }

    #[test]
    fn test_capability_unavailable_carries_reason() {
        let cap: Capability<str> = Capability::Unavailable("no token file".to_string());
        assert!(!cap.is_available());
        assert_eq!(cap.get().err(), Some("no token file"));
    }

    #[test]
    fn test_default_thresholds() {
        let cfg = AssistantConfig::default();
        assert_eq!(cfg.fuzzy_threshold, 70);
        assert_eq!(cfg.cache_ttl, Duration::from_secs(5));
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert_eq!(cfg.poll_backoff, Duration::from_secs(60));
    }
}
