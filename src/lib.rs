//! Cachify - a client-side HTTP response cache
//!
//! Memoizes GET responses in a persistent key-value store with per-key
//! expiration, optional at-rest encryption and background refresh.

pub mod cache;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod duration;
pub mod error;
pub mod fetch;
pub mod models;
pub mod storage;
pub mod tasks;

pub use cache::{CacheEngine, CacheStats};
pub use config::EngineConfig;
pub use error::{CacheError, Result};
pub use fetch::{FetchRequest, Fetcher, ReqwestFetcher};
pub use models::{CachifyOptions, GetOptions, PostSync, RemoveOptions, SetOptions};
pub use storage::{FileStore, KvStore, Lookup, MemoryStore};
