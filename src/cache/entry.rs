//! Key Map Entry Module
//!
//! One record of the persisted key map: where a logical key's value lives and
//! when it expires.

use chrono::Utc;
use serde::{Deserialize, Serialize};

// == Key Map Entry ==
/// Maps a logical cache key to its physical storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMapEntry {
    /// Caller-supplied cache key
    pub logical_key: String,
    /// Storage-layer key holding the value
    pub physical_key: String,
    /// Expiration timestamp (Unix milliseconds)
    pub expiration: i64,
    /// Lifetime last requested for this key, reused when an operation names none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime_ms: Option<u64>,
}

impl KeyMapEntry {
    // == Constructor ==
    /// Creates an entry expiring `lifetime_ms` from now.
    pub fn new(
        logical_key: impl Into<String>,
        physical_key: impl Into<String>,
        lifetime_ms: u64,
    ) -> Self {
        Self {
            logical_key: logical_key.into(),
            physical_key: physical_key.into(),
            expiration: expiration_from_now(lifetime_ms),
            lifetime_ms: None,
        }
    }

    /// Moves the expiration to `lifetime_ms` from now and remembers the lifetime.
    pub fn extend(&mut self, lifetime_ms: u64) {
        self.expiration = expiration_from_now(lifetime_ms);
        self.lifetime_ms = Some(lifetime_ms);
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiration.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expiration <= now
    }

    /// Returns true if the entry has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Returns true if the physical key differs from the logical key.
    pub fn is_remapped(&self) -> bool {
        self.physical_key != self.logical_key
    }

    // == Time To Live ==
    /// Returns remaining lifetime in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        let remaining = self.expiration.saturating_sub(current_timestamp_ms());
        remaining.max(0) as u64
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Returns the timestamp `lifetime_ms` from now, saturating on overflow.
pub fn expiration_from_now(lifetime_ms: u64) -> i64 {
    let lifetime = i64::try_from(lifetime_ms).unwrap_or(i64::MAX);
    current_timestamp_ms().saturating_add(lifetime)
}
