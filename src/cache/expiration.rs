//! Expiration Module
//!
//! Tracks per-key expiration inside the key map and purges expired entries
//! together with their stored values.

use tracing::debug;

use crate::cache::entry::{current_timestamp_ms, KeyMapEntry};
use crate::cache::keymap::KeyMap;
use crate::error::Result;
use crate::storage::StoreAdapter;

// == Expiration Manager ==
#[derive(Clone)]
pub struct ExpirationManager {
    adapter: StoreAdapter,
    /// Lifetime of keys that never had one requested
    default_lifetime_ms: u64,
    /// Entries expired for longer than this are purged regardless of key
    housekeeping_horizon_ms: u64,
}

impl ExpirationManager {
    pub fn new(
        adapter: StoreAdapter,
        default_lifetime_ms: u64,
        housekeeping_horizon_ms: u64,
    ) -> Self {
        Self {
            adapter,
            default_lifetime_ms,
            housekeeping_horizon_ms,
        }
    }

    // == Touch ==
    /// Sets the expiration of `logical_key` to now + its lifetime.
    ///
    /// The lifetime is `lifetime_ms` when given, else the one last given for
    /// this key, else the default. Recreates the entry with `physical_key` if a
    /// sweep removed it.
    pub fn touch(
        &self,
        logical_key: &str,
        physical_key: &str,
        lifetime_ms: Option<u64>,
    ) -> Result<()> {
        let mut map = KeyMap::load(&self.adapter)?;
        if map.get(logical_key).is_none() {
            map.upsert(KeyMapEntry::new(
                logical_key,
                physical_key,
                self.default_lifetime_ms,
            ));
        }
        if let Some(entry) = map.get_mut(logical_key) {
            let lifetime = lifetime_ms
                .or(entry.lifetime_ms)
                .unwrap_or(self.default_lifetime_ms);
            entry.physical_key = physical_key.to_string();
            entry.extend(lifetime);
        }
        map.save(&self.adapter)
    }

    // == Sweep ==
    /// Purges the entry of `logical_key` if it has expired, plus every entry
    /// that expired before the housekeeping horizon. Stored values of purged
    /// entries are deleted.
    ///
    /// Returns the purged entries.
    pub fn sweep(&self, logical_key: &str) -> Result<Vec<KeyMapEntry>> {
        let now = current_timestamp_ms();
        let horizon_ms = i64::try_from(self.housekeeping_horizon_ms).unwrap_or(i64::MAX);
        let horizon = now.saturating_sub(horizon_ms);

        let mut map = KeyMap::load(&self.adapter)?;
        let purged = map.extract_where(|entry| {
            (entry.logical_key == logical_key && entry.is_expired_at(now))
                || entry.expiration <= horizon
        });

        if purged.is_empty() {
            return Ok(purged);
        }

        for entry in &purged {
            self.adapter.remove(&entry.physical_key)?;
        }
        map.save(&self.adapter)?;
        debug!("Swept {} expired entries", purged.len());

        Ok(purged)
    }

    /// Returns the expiration timestamp of `logical_key`, if mapped.
    pub fn expiration_of(&self, logical_key: &str) -> Result<Option<i64>> {
        Ok(KeyMap::load(&self.adapter)?
            .get(logical_key)
            .map(|entry| entry.expiration))
    }
}
