//! Option models for the cache engine
//!
//! Typed, builder-style options for each engine operation.

pub mod options;

// Re-export commonly used types
pub use options::{
    CachifyOptions, Encryption, ErrorCallback, GetOptions, PostSync, RemoveOptions, SetOptions,
    SyncCallback,
};
