//! Key Map Module
//!
//! Maintains the persisted mapping from logical cache keys to physical storage
//! keys. Keys stored encrypted get an opaque physical key so the logical key
//! never appears in the store.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::entry::{current_timestamp_ms, KeyMapEntry};
use crate::cache::{MASTER_KEY, PHYSICAL_KEY_PREFIX};
use crate::error::Result;
use crate::storage::StoreAdapter;

// == Key Map ==
/// The collection persisted under [`MASTER_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyMap {
    entries: Vec<KeyMapEntry>,
}

impl KeyMap {
    /// Loads the key map, empty if none is stored yet.
    pub fn load(adapter: &StoreAdapter) -> Result<Self> {
        Ok(adapter.read_record(MASTER_KEY)?.unwrap_or_default())
    }

    /// Persists the key map.
    pub fn save(&self, adapter: &StoreAdapter) -> Result<()> {
        adapter.write_record(MASTER_KEY, self)
    }

    pub fn get(&self, logical_key: &str) -> Option<&KeyMapEntry> {
        self.entries.iter().find(|e| e.logical_key == logical_key)
    }

    pub fn get_mut(&mut self, logical_key: &str) -> Option<&mut KeyMapEntry> {
        self.entries.iter_mut().find(|e| e.logical_key == logical_key)
    }

    /// Inserts `entry`, replacing any entry with the same logical key.
    pub fn upsert(&mut self, entry: KeyMapEntry) {
        match self.get_mut(&entry.logical_key) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn remove(&mut self, logical_key: &str) -> Option<KeyMapEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.logical_key == logical_key)?;
        Some(self.entries.remove(index))
    }

    /// Removes and returns every entry matching `predicate`.
    pub fn extract_where<F>(&mut self, mut predicate: F) -> Vec<KeyMapEntry>
    where
        F: FnMut(&KeyMapEntry) -> bool,
    {
        let (extracted, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| predicate(e));
        self.entries = kept;
        extracted
    }

    pub fn contains_physical(&self, physical_key: &str) -> bool {
        self.entries.iter().any(|e| e.physical_key == physical_key)
    }

    fn is_taken(&self, key: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.physical_key == key || e.logical_key == key)
    }

    pub fn entries(&self) -> &[KeyMapEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Key Map Manager ==
/// Resolves logical keys to physical keys and reclaims orphaned entries.
#[derive(Clone)]
pub struct KeyMapManager {
    adapter: StoreAdapter,
    /// Expiration given to entries until their first touch
    initial_lifetime_ms: u64,
}

impl KeyMapManager {
    pub fn new(adapter: StoreAdapter, initial_lifetime_ms: u64) -> Self {
        Self {
            adapter,
            initial_lifetime_ms,
        }
    }

    // == Resolve ==
    /// Returns the physical key of `logical_key`, creating or migrating its
    /// entry as needed.
    ///
    /// A new key maps to itself unless `encrypted`, in which case it gets a
    /// fresh opaque key. An existing identity mapping is migrated to an opaque
    /// key (moving the stored payload) once encryption is requested. Orphaned
    /// opaque keys are collected on every call.
    pub fn resolve(&self, logical_key: &str, encrypted: bool) -> Result<String> {
        let mut map = KeyMap::load(&self.adapter)?;

        let physical_key = match map.get(logical_key).map(|e| e.physical_key.clone()) {
            None => {
                let physical_key = if encrypted {
                    allocate_physical_key(&map)
                } else {
                    logical_key.to_string()
                };
                debug!("Mapping '{}' to '{}'", logical_key, physical_key);
                map.upsert(KeyMapEntry::new(
                    logical_key,
                    physical_key.clone(),
                    self.initial_lifetime_ms,
                ));
                physical_key
            }
            Some(current) if encrypted && current == logical_key => {
                let migrated = allocate_physical_key(&map);
                let moved = self.adapter.move_raw(&current, &migrated)?;
                info!(
                    "Migrated '{}' to encrypted storage (payload moved: {})",
                    logical_key, moved
                );
                if let Some(entry) = map.get_mut(logical_key) {
                    entry.physical_key = migrated.clone();
                }
                migrated
            }
            Some(current) => current,
        };

        map.save(&self.adapter)?;
        self.collect_orphans(&map)?;

        Ok(physical_key)
    }

    // == Remove Entry ==
    /// Drops the entry of `logical_key` from the map.
    pub fn remove_entry(&self, logical_key: &str) -> Result<Option<KeyMapEntry>> {
        let mut map = KeyMap::load(&self.adapter)?;
        let removed = map.remove(logical_key);
        if removed.is_some() {
            map.save(&self.adapter)?;
        }
        Ok(removed)
    }

    // == Collect Orphans ==
    /// Deletes stored opaque keys no entry of `map` refers to.
    ///
    /// Returns the number of keys deleted.
    pub fn collect_orphans(&self, map: &KeyMap) -> Result<usize> {
        let mut collected = 0;
        for key in self.adapter.keys()? {
            if key.starts_with(PHYSICAL_KEY_PREFIX) && !map.contains_physical(&key) {
                self.adapter.remove(&key)?;
                collected += 1;
            }
        }
        if collected > 0 {
            debug!("Collected {} orphaned entries", collected);
        }
        Ok(collected)
    }
}

/// Generates a time-based opaque key unused by any entry of `map`.
fn allocate_physical_key(map: &KeyMap) -> String {
    let base = format!("{}{}", PHYSICAL_KEY_PREFIX, current_timestamp_ms());
    let mut candidate = base.clone();
    let mut suffix = 0u64;
    while map.is_taken(&candidate) {
        suffix += 1;
        candidate = format!("{}-{}", base, suffix);
    }
    candidate
}
