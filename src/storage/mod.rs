//! Storage Module
//!
//! The raw key-value store capability, its bundled implementations and the
//! adapter that layers serialization and encryption on top of it.

mod adapter;
mod file;
mod memory;

pub use adapter::{Lookup, StoreAdapter};
pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;

// == Key-Value Store ==
/// Persistent string key-value store local to the client.
///
/// Implementations must be safe to share across tasks. A missing key is
/// `Ok(None)` from [`KvStore::get`] and a no-op for [`KvStore::delete`].
pub trait KvStore: Send + Sync {
    /// Returns the raw value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, overwriting any previous value.
    fn set(&self, key: &str, value: String) -> Result<()>;

    /// Removes `key` if present.
    fn delete(&self, key: &str) -> Result<()>;

    /// Lists every key currently stored.
    fn list_keys(&self) -> Result<Vec<String>>;
}
