//! Cache Engine Module
//!
//! Orchestrates the read-through fetch, get, set/update and remove operations
//! over the key map, the expiration bookkeeping and the refresh scheduler.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{error, info, warn};

use crate::cache::{CacheStats, ExpirationManager, KeyMapManager, MASTER_KEY};
use crate::config::EngineConfig;
use crate::crypto::{AesGcmCipher, Cipher};
use crate::duration::Lifetime;
use crate::error::{CacheError, Result};
use crate::fetch::{FetchRequest, Fetcher};
use crate::models::{
    CachifyOptions, ErrorCallback, GetOptions, PostSync, RemoveOptions, SetOptions, SyncCallback,
};
use crate::storage::{KvStore, Lookup, StoreAdapter};
use crate::tasks::RefreshScheduler;

/// Everything a refresh needs, detached from the call that created it.
#[derive(Clone)]
struct RefreshContext {
    request: FetchRequest,
    key: String,
    lifetime_ms: Option<u64>,
    secret: Option<String>,
    error_callback: Option<ErrorCallback>,
}

/// Post-sync options with their durations parsed.
struct SyncPlan {
    callback: SyncCallback,
    timeout: Option<Duration>,
    interval: Option<Duration>,
}

impl SyncPlan {
    fn parse(post_sync: &PostSync) -> Result<Self> {
        let timeout = post_sync
            .sync_timeout
            .as_ref()
            .map(Lifetime::to_duration)
            .transpose()?;
        let interval = post_sync
            .sync_interval
            .as_ref()
            .map(Lifetime::to_duration)
            .transpose()?;

        if interval == Some(Duration::ZERO) {
            return Err(CacheError::InvalidDuration(
                "sync interval must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            callback: post_sync.callback.clone(),
            timeout,
            interval,
        })
    }
}

struct EngineInner {
    adapter: StoreAdapter,
    fetcher: Arc<dyn Fetcher>,
    keymap: KeyMapManager,
    expirations: ExpirationManager,
    scheduler: RefreshScheduler,
    config: EngineConfig,
    /// Serializes read-modify-write cycles of the key map
    map_lock: Mutex<()>,
    /// One async lock per logical key, held for a whole operation
    key_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    stats: Mutex<CacheStats>,
}

// == Engine Builder ==
pub struct EngineBuilder {
    store: Arc<dyn KvStore>,
    fetcher: Arc<dyn Fetcher>,
    cipher: Arc<dyn Cipher>,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Replaces the default AES-GCM cipher.
    pub fn cipher(mut self, cipher: Arc<dyn Cipher>) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> CacheEngine {
        let adapter = StoreAdapter::new(self.store, self.cipher);
        let inner = EngineInner {
            keymap: KeyMapManager::new(adapter.clone(), self.config.default_lifetime_ms),
            expirations: ExpirationManager::new(
                adapter.clone(),
                self.config.default_lifetime_ms,
                self.config.housekeeping_horizon_ms,
            ),
            adapter,
            fetcher: self.fetcher,
            scheduler: RefreshScheduler::new(),
            config: self.config,
            map_lock: Mutex::new(()),
            key_locks: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::new()),
        };
        CacheEngine {
            inner: Arc::new(inner),
        }
    }
}

// == Cache Engine ==
/// Client-side response cache over an injected store and fetcher.
///
/// Cloning is cheap and clones share all state. Operations on the same
/// logical key are serialized; background timers are cancelled once the last
/// clone is dropped or [`CacheEngine::shutdown`] is called.
#[derive(Clone)]
pub struct CacheEngine {
    inner: Arc<EngineInner>,
}

impl CacheEngine {
    // == Constructors ==
    /// Creates an engine with default configuration and AES-GCM encryption.
    pub fn new(store: Arc<dyn KvStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::builder(store, fetcher).build()
    }

    pub fn builder(store: Arc<dyn KvStore>, fetcher: Arc<dyn Fetcher>) -> EngineBuilder {
        EngineBuilder {
            store,
            fetcher,
            cipher: Arc::new(AesGcmCipher::new()),
            config: EngineConfig::default(),
        }
    }

    // == Cachify ==
    /// Serves `request` from the cache, fetching it when nothing is stored.
    ///
    /// Returns `Ok(None)` without doing anything when no options are given,
    /// the key is unusable or the request is not a GET; these are logged.
    /// Refresh failures go to the error callback when one is configured and
    /// are returned otherwise.
    pub async fn cachify(
        &self,
        request: FetchRequest,
        options: impl Into<Option<CachifyOptions>>,
    ) -> Result<Option<Lookup>> {
        let options: Option<CachifyOptions> = options.into();
        let Some(options) = options else {
            error!("No cache configuration supplied for {}", request.url);
            return Ok(None);
        };
        if !request.is_get() {
            error!(
                "Refusing to cache {} {}: not a GET request",
                request.method, request.url
            );
            return Ok(None);
        }
        if let Err(e) = validate_key(&options.key) {
            error!("{}", e);
            return Ok(None);
        }

        let sync_plan = options.post_sync.as_ref().map(SyncPlan::parse).transpose()?;
        let ctx = RefreshContext {
            request,
            lifetime_ms: parse_lifetime(options.lifetime.as_ref())?,
            secret: options.encryption.map(|e| e.secret_key),
            error_callback: options.error_callback,
            key: options.key,
        };

        let _guard = self.lock_key(&ctx.key).await;
        let physical_key = self.prepare(&ctx.key, ctx.secret.is_some())?;

        if options.pre_sync {
            self.refresh(&ctx, &physical_key).await?;
            return self.read(&physical_key, ctx.secret.as_deref()).map(Some);
        }

        let mut response = self.read(&physical_key, ctx.secret.as_deref())?;
        self.record_lookup(&response);

        let hit = response.is_found();
        if !hit {
            self.refresh(&ctx, &physical_key).await?;
            response = self.read(&physical_key, ctx.secret.as_deref())?;
        }

        // One-shot syncs follow hits only; recurring syncs are registered either way
        if let Some(plan) = sync_plan {
            if let (true, Some(delay)) = (hit, plan.timeout) {
                self.schedule_once(ctx.clone(), delay, plan.callback.clone());
            }
            if let Some(period) = plan.interval {
                self.schedule_recurring(ctx, period, plan.callback);
            }
        }

        Ok(Some(response))
    }

    // == Get ==
    /// Reads the value of a key and extends its lifetime. Never fetches.
    ///
    /// Without an explicit lifetime the key keeps the one it was last given.
    pub async fn get_cache(&self, options: GetOptions) -> Result<Lookup> {
        validate_key(&options.key)?;
        let lifetime_ms = parse_lifetime(options.lifetime.as_ref())?;
        let secret = options.encryption.map(|e| e.secret_key);

        let _guard = self.lock_key(&options.key).await;
        let physical_key = self.prepare(&options.key, secret.is_some())?;
        self.touch(&options.key, &physical_key, lifetime_ms)?;

        let lookup = self.read(&physical_key, secret.as_deref())?;
        self.record_lookup(&lookup);
        Ok(lookup)
    }

    // == Set ==
    /// Stores `value` under a key and extends its lifetime, then hands the
    /// re-read value to the `after` callback if one is given.
    pub async fn set_cache(&self, options: SetOptions, value: Value) -> Result<()> {
        validate_key(&options.key)?;
        let lifetime_ms = parse_lifetime(options.lifetime.as_ref())?;
        let secret = options.encryption.map(|e| e.secret_key);

        let guard = self.lock_key(&options.key).await;
        let physical_key = self.prepare(&options.key, secret.is_some())?;
        self.touch(&options.key, &physical_key, lifetime_ms)?;
        self.inner
            .adapter
            .write(&physical_key, &value, secret.as_deref())?;

        if let Some(after) = options.after {
            let stored = self.read(&physical_key, secret.as_deref())?;
            drop(guard);
            after(stored);
        }
        Ok(())
    }

    /// Same as [`CacheEngine::set_cache`], for keys that already exist.
    pub async fn update_cache(&self, options: SetOptions, value: Value) -> Result<()> {
        self.set_cache(options, value).await
    }

    // == Remove ==
    /// Deletes the stored value of a key and drops its key map entry.
    pub async fn remove_cache(&self, options: RemoveOptions) -> Result<()> {
        validate_key(&options.key)?;

        let _guard = self.lock_key(&options.key).await;
        let physical_key = self.prepare(&options.key, false)?;

        let _map = self.inner.map_lock.lock();
        self.inner.adapter.remove(&physical_key)?;
        self.inner.keymap.remove_entry(&options.key)?;
        info!("Removed '{}'", options.key);
        Ok(())
    }

    // == Introspection ==
    pub fn stats(&self) -> CacheStats {
        self.inner.stats.lock().clone()
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.inner.scheduler
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Returns the expiration timestamp (Unix ms) of a key, if mapped.
    pub fn expiration_of(&self, key: &str) -> Result<Option<i64>> {
        let _map = self.inner.map_lock.lock();
        self.inner.expirations.expiration_of(key)
    }

    /// Cancels every background refresh timer.
    pub fn shutdown(&self) {
        let cancelled = self.inner.scheduler.cancel_all();
        if cancelled > 0 {
            info!("Cancelled {} background refresh timers", cancelled);
        }
    }

    // == Internals ==
    async fn lock_key(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .inner
            .key_locks
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Resolves the physical key, then sweeps expired entries.
    fn prepare(&self, key: &str, encrypted: bool) -> Result<String> {
        let _map = self.inner.map_lock.lock();

        let physical_key = self.inner.keymap.resolve(key, encrypted)?;
        let purged = self.inner.expirations.sweep(key)?;
        if !purged.is_empty() {
            self.inner.stats.lock().record_purged(purged.len());
        }

        Ok(physical_key)
    }

    fn touch(&self, key: &str, physical_key: &str, lifetime_ms: Option<u64>) -> Result<()> {
        let _map = self.inner.map_lock.lock();
        self.inner.expirations.touch(key, physical_key, lifetime_ms)
    }

    fn read(&self, physical_key: &str, secret: Option<&str>) -> Result<Lookup> {
        self.inner.adapter.read(physical_key, secret)
    }

    fn record_lookup(&self, lookup: &Lookup) {
        let mut stats = self.inner.stats.lock();
        if lookup.is_found() {
            stats.record_hit();
        } else {
            stats.record_miss();
        }
    }

    // == Refresh ==
    /// Fetches and stores a fresh value. A failure is handed to the error
    /// callback if configured, otherwise returned.
    async fn refresh(&self, ctx: &RefreshContext, physical_key: &str) -> Result<()> {
        let outcome = match self.inner.fetcher.fetch(&ctx.request).await {
            Ok(Some(body)) => self.store_fresh(ctx, physical_key, &body),
            Ok(None) => Err(CacheError::EmptyResponse(ctx.request.url.clone())),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                self.inner.stats.lock().record_refresh();
                info!("Refreshed '{}' from {}", ctx.key, ctx.request.url);
                Ok(())
            }
            Err(e) => {
                self.inner.stats.lock().record_refresh_failure();
                match &ctx.error_callback {
                    Some(callback) => {
                        warn!("Refresh of '{}' failed: {}", ctx.key, e);
                        callback(&e);
                        Ok(())
                    }
                    None => Err(e),
                }
            }
        }
    }

    fn store_fresh(&self, ctx: &RefreshContext, physical_key: &str, body: &Value) -> Result<()> {
        let _map = self.inner.map_lock.lock();
        self.inner
            .expirations
            .touch(&ctx.key, physical_key, ctx.lifetime_ms)?;
        self.inner
            .adapter
            .write(physical_key, body, ctx.secret.as_deref())
    }

    // == Background Sync ==
    fn schedule_once(&self, ctx: RefreshContext, delay: Duration, callback: SyncCallback) {
        let engine = Arc::downgrade(&self.inner);
        let key = ctx.key.clone();
        self.inner.scheduler.schedule_once(&key, delay, move || {
            background_sync(engine, ctx, callback)
        });
    }

    fn schedule_recurring(&self, ctx: RefreshContext, period: Duration, callback: SyncCallback) {
        let engine = Arc::downgrade(&self.inner);
        let key = ctx.key.clone();
        self.inner.scheduler.schedule_recurring(&key, period, move || {
            background_sync(engine.clone(), ctx.clone(), callback.clone())
        });
    }

    async fn sync_now(&self, ctx: &RefreshContext) -> Result<Lookup> {
        let _guard = self.lock_key(&ctx.key).await;
        let physical_key = self.prepare(&ctx.key, ctx.secret.is_some())?;
        self.refresh(ctx, &physical_key).await?;
        self.read(&physical_key, ctx.secret.as_deref())
    }
}

/// One firing of a post-sync timer. Failures cannot reach the original
/// caller, so without an error callback they are only logged.
async fn background_sync(engine: Weak<EngineInner>, ctx: RefreshContext, callback: SyncCallback) {
    let Some(inner) = engine.upgrade() else {
        return;
    };
    let engine = CacheEngine { inner };

    match engine.sync_now(&ctx).await {
        Ok(lookup) => callback(lookup),
        Err(e) => warn!("Background refresh of '{}' failed: {}", ctx.key, e),
    }
}

fn parse_lifetime(lifetime: Option<&Lifetime>) -> Result<Option<u64>> {
    lifetime.map(Lifetime::to_ms).transpose()
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidConfig(
            "cache key must not be empty".to_string(),
        ));
    }
    if key.starts_with(MASTER_KEY) {
        return Err(CacheError::InvalidConfig(format!(
            "cache key '{}' uses the reserved prefix '{}'",
            key, MASTER_KEY
        )));
    }
    Ok(())
}
