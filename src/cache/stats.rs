//! Cache Statistics Module
//!
//! Tracks engine activity: hits, misses, upstream refreshes and purges.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads that found a stored value
    pub hits: u64,
    /// Reads that found nothing
    pub misses: u64,
    /// Successful upstream refreshes
    pub refreshes: u64,
    /// Failed upstream refreshes (empty body or fetch error)
    pub refresh_failures: u64,
    /// Entries removed by expiration sweeps
    pub purged: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if nothing was read yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_refresh(&mut self) {
        self.refreshes += 1;
    }

    pub fn record_refresh_failure(&mut self) {
        self.refresh_failures += 1;
    }

    pub fn record_purged(&mut self, count: usize) {
        self.purged += count as u64;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats, CacheStats::default());
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_refresh_counters() {
        let mut stats = CacheStats::new();
        stats.record_refresh();
        stats.record_refresh_failure();
        stats.record_refresh_failure();
        stats.record_purged(3);

        assert_eq!(stats.refreshes, 1);
        assert_eq!(stats.refresh_failures, 2);
        assert_eq!(stats.purged, 3);
    }
}
