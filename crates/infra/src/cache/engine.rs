//! Cache engine: concurrent entry map, GC scheduler, and the
//! store/fetch/evict/close surface.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use groundwork_common::error::context::ensure_live;
use groundwork_common::error::{Error, ErrorKind, Result};
use groundwork_common::resilience::{Clock, SystemClock};
use groundwork_common::time::Interval;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::config::CacheConfig;
use super::entry::CacheEntry;
use super::fs::CacheFilesystem;
use super::provider::EntryProvider;

/// Jitter fraction applied to the GC period so co-located caches do not
/// collect in lockstep.
const GC_JITTER: f64 = 0.1;

/// Map, provider, and closed flag, guarded by one read-write lock.
///
/// Mutations (store, fetch, evict, close, every GC tick) take the write
/// side; `has` takes the read side.
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    provider: Box<dyn EntryProvider>,
    closed: bool,
}

/// Filesystem-backed, TTL-governed cache of opaque artifacts.
///
/// Entries are materialised by the injected [`EntryProvider`], live under
/// the configured cache directory, and expire on a sliding window renewed by
/// every successful [`FileCache::fetch`]. A background collector runs every
/// `gc_period` until [`FileCache::close`] cancels it.
pub struct FileCache<C: Clock + Clone = SystemClock> {
    state: Arc<RwLock<CacheState>>,
    config: CacheConfig,
    fs: Arc<dyn CacheFilesystem>,
    clock: C,
    gc_token: CancellationToken,
}

impl FileCache<SystemClock> {
    /// Create a cache and start its collector.
    ///
    /// The provider is bound to the cache filesystem and directory here;
    /// both hooks must succeed before any store is accepted.
    pub async fn new(
        config: CacheConfig,
        fs: Arc<dyn CacheFilesystem>,
        provider: Box<dyn EntryProvider>,
    ) -> Result<Self> {
        Self::with_clock(config, fs, provider, SystemClock).await
    }
}

impl<C: Clock + Clone> FileCache<C> {
    /// Create a cache with a custom clock (useful for expiry tests).
    pub async fn with_clock(
        config: CacheConfig,
        fs: Arc<dyn CacheFilesystem>,
        mut provider: Box<dyn EntryProvider>,
        clock: C,
    ) -> Result<Self> {
        config.validate()?;

        provider.set_cache_filesystem(Arc::clone(&fs));
        provider.set_cache_dir(&config.cache_dir)?;
        fs.create_dir_all(&config.cache_dir).await?;

        let cache = Self {
            state: Arc::new(RwLock::new(CacheState {
                entries: HashMap::new(),
                provider,
                closed: false,
            })),
            config,
            fs,
            clock,
            gc_token: CancellationToken::new(),
        };
        cache.spawn_collector();
        Ok(cache)
    }

    /// Materialise and record the artifact for `key`.
    ///
    /// Fails with `conflict` when the cache is closed, `already-exists` when
    /// the key is present, `empty` for an empty key. On provider failure the
    /// staging path is best-effort cleaned and the entry map is untouched.
    #[instrument(skip(self, token))]
    pub async fn store(&self, token: &CancellationToken, key: &str) -> Result<()> {
        validate_key(key)?;
        ensure_live(token)?;

        let mut state = self.state.write().await;
        if state.closed {
            return Err(Error::new(ErrorKind::Conflict, "cache is closed"));
        }
        if self.config.ttl.is_zero() {
            return Err(Error::new(ErrorKind::Invalid, "cache ttl is zero"));
        }
        if state.entries.contains_key(key) {
            return Err(Error::new(ErrorKind::AlreadyExists, format!("key {key:?}")));
        }

        match state.provider.fetch_entry(token, key).await {
            Ok(path) => {
                let entry = CacheEntry::new(path, self.config.ttl, self.clock.now());
                state.entries.insert(key.to_string(), entry);
                debug!(key, "stored cache entry");
                Ok(())
            }
            Err(err) => {
                let staging = self.config.cache_dir.join(format!("{key}-tmp"));
                if let Err(cleanup) = self.fs.remove_all(&staging).await {
                    debug!(key, error = %cleanup, "staging cleanup failed");
                }
                Err(err)
            }
        }
    }

    /// Copy the cached artifact for `key` to `dest_path` in `dest_fs` and
    /// renew the entry's expiry.
    ///
    /// The copy lands in a temporary directory inside the destination
    /// filesystem and is atomically moved to `dest_path`, so an interrupted
    /// fetch can leave a temporary directory behind but never a partial
    /// destination. The writer lock is held for the duration of the copy so
    /// eviction cannot race a renewal in progress.
    #[instrument(skip(self, token, dest_fs, dest_path), fields(dest = %dest_path.display()))]
    pub async fn fetch(
        &self,
        token: &CancellationToken,
        key: &str,
        dest_fs: &dyn CacheFilesystem,
        dest_path: &Path,
    ) -> Result<()> {
        validate_key(key)?;
        ensure_live(token)?;

        let mut state = self.state.write().await;
        if state.closed {
            return Err(Error::new(ErrorKind::Conflict, "cache is closed"));
        }
        let Some(entry) = state.entries.get_mut(key) else {
            return Err(Error::new(ErrorKind::NotFound, format!("key {key:?}")));
        };

        let Some(parent) = dest_path.parent() else {
            return Err(Error::new(
                ErrorKind::InvalidDestination,
                format!("destination {} has no parent directory", dest_path.display()),
            ));
        };
        let Some(name) = dest_path.file_name() else {
            return Err(Error::new(
                ErrorKind::InvalidDestination,
                format!("destination {} has no file name", dest_path.display()),
            ));
        };

        let tmp_dir = dest_fs.make_temp_dir(parent, ".cache-fetch-").await?;
        let staged = tmp_dir.join(name);

        if let Err(err) = dest_fs.copy(token, entry.path(), &staged).await {
            let _ = dest_fs.remove_all(&tmp_dir).await;
            return Err(err);
        }
        if let Err(err) = dest_fs.remove_all(dest_path).await {
            let _ = dest_fs.remove_all(&tmp_dir).await;
            return Err(err);
        }
        if let Err(err) = dest_fs.rename(&staged, dest_path).await {
            let _ = dest_fs.remove_all(&tmp_dir).await;
            return Err(err);
        }
        let _ = dest_fs.remove_all(&tmp_dir).await;

        entry.touch(self.clock.now());
        debug!(key, "fetched cache entry and renewed expiry");
        Ok(())
    }

    /// Whether `key` is present. Fails with `conflict` when closed.
    pub async fn has(&self, token: &CancellationToken, key: &str) -> Result<bool> {
        ensure_live(token)?;
        let state = self.state.read().await;
        if state.closed {
            return Err(Error::new(ErrorKind::Conflict, "cache is closed"));
        }
        Ok(state.entries.contains_key(key))
    }

    /// Remove `key`'s backing path and map entry.
    ///
    /// A missing key is a silent success. A backing-path removal failure
    /// propagates as `unexpected` and leaves the entry in place.
    #[instrument(skip(self, token))]
    pub async fn evict(&self, token: &CancellationToken, key: &str) -> Result<()> {
        ensure_live(token)?;
        let mut state = self.state.write().await;
        if state.closed {
            return Err(Error::new(ErrorKind::Conflict, "cache is closed"));
        }
        let Some(path) = state.entries.get(key).map(|entry| entry.path().to_path_buf()) else {
            return Ok(());
        };

        self.fs
            .remove_all(&path)
            .await
            .map_err(|err| Error::wrap(ErrorKind::Unexpected, err, "removing backing path"))?;
        state.entries.remove(key);
        debug!(key, "evicted cache entry");
        Ok(())
    }

    /// Close the cache: stop the collector, drop every entry, and remove
    /// the backing paths.
    ///
    /// Idempotent; after the first call every mutating operation returns
    /// `conflict`. When individual removals fail, a forced recursive delete
    /// of the cache root is attempted as a fallback; if that also fails the
    /// accumulated removal errors are joined into one `unexpected` error.
    pub async fn close(&self) -> Result<()> {
        self.gc_token.cancel();

        let mut state = self.state.write().await;
        if state.closed {
            return Ok(());
        }
        state.closed = true;

        let mut failures = Vec::new();
        for (key, entry) in state.entries.drain() {
            if let Err(err) = self.fs.remove_all(entry.path()).await {
                failures.push(format!("{key}: {err}"));
            }
        }

        if failures.is_empty() {
            info!("cache closed");
            return Ok(());
        }

        warn!(failed = failures.len(), "entry removal failed, forcing cache root removal");
        if let Err(err) = self.fs.remove_all_forced(&self.config.cache_dir).await {
            failures.push(format!("cache root: {err}"));
            return Err(Error::new(
                ErrorKind::Unexpected,
                format!("closing cache: {}", failures.join("; ")),
            ));
        }

        info!("cache closed after forced root removal");
        Ok(())
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Collector task: every `gc_period` (jittered), drop expired entries
    /// and best-effort delete their backing paths. A failed removal is
    /// tolerated silently; the entry stays and is retried next tick.
    fn spawn_collector(&self) {
        let state = Arc::clone(&self.state);
        let fs = Arc::clone(&self.fs);
        let clock = self.clock.clone();
        let period = self.config.gc_period;
        let token = self.gc_token.clone();

        tokio::spawn(async move {
            let mut interval = Interval::with_jitter(period, GC_JITTER);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let mut state = state.write().await;
                if state.closed {
                    break;
                }

                let now = clock.now();
                let expired: Vec<String> = state
                    .entries
                    .iter()
                    .filter(|(_, entry)| entry.is_expired(now))
                    .map(|(key, _)| key.clone())
                    .collect();

                for key in expired {
                    let Some(path) =
                        state.entries.get(&key).map(|entry| entry.path().to_path_buf())
                    else {
                        continue;
                    };
                    match fs.remove_all(&path).await {
                        Ok(()) => {
                            state.entries.remove(&key);
                            debug!(key, "collected expired entry");
                        }
                        Err(err) => {
                            debug!(key, error = %err, "collection failed, will retry next tick");
                        }
                    }
                }
            }
        });
    }
}

impl<C: Clock + Clone> Drop for FileCache<C> {
    fn drop(&mut self) {
        // Stops the collector; artifact cleanup requires an explicit close.
        self.gc_token.cancel();
    }
}

/// Keys are opaque non-empty strings that must not escape the cache
/// directory.
fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::new(ErrorKind::Empty, "cache key is empty"));
    }
    if key.contains('/') || key.contains('\\') || key == "." || key == ".." {
        return Err(Error::new(
            ErrorKind::Invalid,
            format!("cache key {key:?} must not contain path separators"),
        ));
    }
    Ok(())
}
