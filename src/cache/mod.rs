//! Cache Module
//!
//! Key mapping, expiration bookkeeping and the engine composing them.

mod engine;
mod entry;
mod expiration;
mod keymap;
mod stats;


// Re-export public types
pub use engine::{CacheEngine, EngineBuilder};
pub use entry::{current_timestamp_ms, KeyMapEntry};
pub use expiration::ExpirationManager;
pub use keymap::{KeyMap, KeyMapManager};
pub use stats::CacheStats;

// == Public Constants ==
/// Store key of the persisted key map
pub const MASTER_KEY: &str = "__cachify__";

/// Prefix of opaque physical keys allocated for encrypted entries
pub const PHYSICAL_KEY_PREFIX: &str = "__cachify__:";
