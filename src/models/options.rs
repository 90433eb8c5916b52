//! Per-call options for the cache engine
//!
//! Builders for the four operations. Callbacks are shared closures so they
//! can outlive the call that registered them (background refreshes).

use std::fmt;
use std::sync::Arc;

use crate::duration::Lifetime;
use crate::error::CacheError;
use crate::storage::Lookup;

/// Receives a freshly read value (post-sync refreshes, `after` hooks).
pub type SyncCallback = Arc<dyn Fn(Lookup) + Send + Sync>;

/// Receives a refresh failure instead of it being propagated.
pub type ErrorCallback = Arc<dyn Fn(&CacheError) + Send + Sync>;

// == Encryption ==
/// Enables at-rest encryption of a key's value.
#[derive(Clone, PartialEq, Eq)]
pub struct Encryption {
    pub secret_key: String,
}

impl Encryption {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
        }
    }
}

impl fmt::Debug for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encryption")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

// == Post Sync ==
/// Background refresh scheduled after serving a cache hit.
#[derive(Clone)]
pub struct PostSync {
    /// Invoked with the refreshed value
    pub callback: SyncCallback,
    /// Delay of a one-shot refresh
    pub sync_timeout: Option<Lifetime>,
    /// Period of a recurring refresh
    pub sync_interval: Option<Lifetime>,
}

impl PostSync {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Lookup) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            sync_timeout: None,
            sync_interval: None,
        }
    }

    pub fn timeout(mut self, delay: impl Into<Lifetime>) -> Self {
        self.sync_timeout = Some(delay.into());
        self
    }

    pub fn interval(mut self, period: impl Into<Lifetime>) -> Self {
        self.sync_interval = Some(period.into());
        self
    }
}

impl fmt::Debug for PostSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostSync")
            .field("sync_timeout", &self.sync_timeout)
            .field("sync_interval", &self.sync_interval)
            .finish_non_exhaustive()
    }
}

// == Cachify Options ==
/// Options of a read-through fetch.
#[derive(Clone, Default)]
pub struct CachifyOptions {
    /// Logical cache key
    pub key: String,
    /// Lifetime of the stored response, engine default if None
    pub lifetime: Option<Lifetime>,
    pub encryption: Option<Encryption>,
    /// Refresh before serving, even on a hit
    pub pre_sync: bool,
    pub post_sync: Option<PostSync>,
    pub error_callback: Option<ErrorCallback>,
}

impl CachifyOptions {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn lifetime(mut self, lifetime: impl Into<Lifetime>) -> Self {
        self.lifetime = Some(lifetime.into());
        self
    }

    pub fn encrypted(mut self, secret_key: impl Into<String>) -> Self {
        self.encryption = Some(Encryption::new(secret_key));
        self
    }

    pub fn pre_sync(mut self, pre_sync: bool) -> Self {
        self.pre_sync = pre_sync;
        self
    }

    pub fn post_sync(mut self, post_sync: PostSync) -> Self {
        self.post_sync = Some(post_sync);
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CacheError) + Send + Sync + 'static,
    {
        self.error_callback = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for CachifyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachifyOptions")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("encryption", &self.encryption)
            .field("pre_sync", &self.pre_sync)
            .field("post_sync", &self.post_sync)
            .field("error_callback", &self.error_callback.is_some())
            .finish()
    }
}

// == Get Options ==
/// Options of a cache read.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub key: String,
    /// Lifetime the read extends the entry to, engine default if None
    pub lifetime: Option<Lifetime>,
    /// Needed to read a value stored encrypted
    pub encryption: Option<Encryption>,
}

impl GetOptions {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn lifetime(mut self, lifetime: impl Into<Lifetime>) -> Self {
        self.lifetime = Some(lifetime.into());
        self
    }

    pub fn encrypted(mut self, secret_key: impl Into<String>) -> Self {
        self.encryption = Some(Encryption::new(secret_key));
        self
    }
}

// == Set Options ==
/// Options of a cache write (set or update).
#[derive(Clone, Default)]
pub struct SetOptions {
    pub key: String,
    pub lifetime: Option<Lifetime>,
    pub encryption: Option<Encryption>,
    /// Invoked with the value as re-read after the write
    pub after: Option<SyncCallback>,
}

impl SetOptions {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn lifetime(mut self, lifetime: impl Into<Lifetime>) -> Self {
        self.lifetime = Some(lifetime.into());
        self
    }

    pub fn encrypted(mut self, secret_key: impl Into<String>) -> Self {
        self.encryption = Some(Encryption::new(secret_key));
        self
    }

    pub fn after<F>(mut self, callback: F) -> Self
    where
        F: Fn(Lookup) + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for SetOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetOptions")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("encryption", &self.encryption)
            .field("after", &self.after.is_some())
            .finish()
    }
}

// == Remove Options ==
/// Options of a cache removal.
#[derive(Debug, Clone, Default)]
pub struct RemoveOptions {
    pub key: String,
}

impl RemoveOptions {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cachify_options_builder() {
        let options = CachifyOptions::new("users")
            .lifetime("1h")
            .encrypted("s3cret")
            .pre_sync(true)
            .post_sync(PostSync::new(|_| {}).interval("5m"));

        assert_eq!(options.key, "users");
        assert_eq!(options.lifetime, Some(Lifetime::from("1h")));
        assert_eq!(options.encryption, Some(Encryption::new("s3cret")));
        assert!(options.pre_sync);
        let post_sync = options.post_sync.unwrap();
        assert!(post_sync.sync_timeout.is_none());
        assert_eq!(post_sync.sync_interval, Some(Lifetime::from("5m")));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let options = SetOptions::new("k").encrypted("hunter2");
        let debug = format!("{:?}", options);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
