//! Process-wide split cache managers, shared per distinct cache configuration.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, RwLock};

use ssp_common::{CacheConfig, CloudCredentials, Result, SplitId, SspError, global_metrics};
use tracing::{debug, info, warn};

/// Identity of a cache manager: every sizing field plus every credential field.
///
/// Two configurations that differ only in credentials map to different
/// managers; sharing one would leak data across principals.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_config(config: &CacheConfig) -> Self {
        let CloudCredentials {
            aws_access_key_id,
            aws_secret_access_key,
            aws_session_token,
            aws_region,
            aws_endpoint,
            azure_account_name,
            azure_account_key,
            azure_endpoint,
            gcs_endpoint,
        } = &config.credentials;
        let opt = |v: &Option<String>| v.as_deref().unwrap_or("").to_string();
        let parts = [
            config.name.clone(),
            config.max_size_bytes.to_string(),
            config.max_concurrent_loads.to_string(),
            opt(aws_access_key_id),
            opt(aws_secret_access_key),
            opt(aws_session_token),
            opt(aws_region),
            opt(aws_endpoint),
            opt(azure_account_name),
            opt(azure_account_key),
            opt(azure_endpoint),
            opt(gcs_endpoint),
        ];
        // length-prefixed so field boundaries cannot collide
        let canonical = parts
            .iter()
            .map(|p| format!("{}:{p}", p.len()))
            .collect::<Vec<_>>()
            .join("|");
        Self(canonical)
    }

    /// Short stable digest for logs; the canonical form carries secrets.
    pub fn fingerprint(&self) -> String {
        let mut h = DefaultHasher::new();
        self.0.hash(&mut h);
        format!("{:016x}", h.finish())
    }
}

impl std::fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CacheKey({})", self.fingerprint())
    }
}

#[derive(Debug, Default)]
struct Residency {
    order: VecDeque<(SplitId, u64)>,
    members: HashSet<SplitId>,
    used_bytes: u64,
    closed: bool,
}

/// In-process split cache bookkeeping: which splits are resident and how many
/// bytes they hold. Eviction is oldest-admitted first.
pub struct CacheManager {
    key: CacheKey,
    config: CacheConfig,
    state: Mutex<Residency>,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("name", &self.config.name)
            .field("key", &self.key)
            .field("max_size_bytes", &self.config.max_size_bytes)
            .finish()
    }
}

impl CacheManager {
    fn new(key: CacheKey, config: CacheConfig) -> Self {
        Self {
            key,
            config,
            state: Mutex::new(Residency::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Marks `split` resident, evicting the oldest splits until it fits.
    ///
    /// Returns the evicted splits. Admitting an already resident split is a no-op.
    ///
    /// # Errors
    /// [`SspError::Execution`] when the manager is closed or the split alone
    /// exceeds capacity.
    pub fn admit(&self, split: &SplitId, size_bytes: u64) -> Result<Vec<SplitId>> {
        let mut st = self.state.lock().expect("cache manager lock poisoned");
        if st.closed {
            return Err(SspError::Execution(format!(
                "cache manager '{}' is closed",
                self.config.name
            )));
        }
        if st.members.contains(split) {
            return Ok(Vec::new());
        }
        if size_bytes > self.config.max_size_bytes {
            return Err(SspError::Execution(format!(
                "split {split} ({size_bytes} bytes) exceeds cache '{}' capacity of {} bytes",
                self.config.name, self.config.max_size_bytes
            )));
        }
        let mut evicted = Vec::new();
        while st.used_bytes + size_bytes > self.config.max_size_bytes {
            let Some((old, bytes)) = st.order.pop_front() else {
                break;
            };
            st.members.remove(&old);
            st.used_bytes -= bytes;
            evicted.push(old);
        }
        st.order.push_back((split.clone(), size_bytes));
        st.members.insert(split.clone());
        st.used_bytes += size_bytes;
        if !evicted.is_empty() {
            debug!(
                cache = %self.config.name,
                admitted = %split,
                evicted = evicted.len(),
                operator = "CacheManager",
                "evicted oldest splits to admit split"
            );
        }
        Ok(evicted)
    }

    pub fn contains(&self, split: &SplitId) -> bool {
        self.state
            .lock()
            .expect("cache manager lock poisoned")
            .members
            .contains(split)
    }

    pub fn resident_bytes(&self) -> u64 {
        self.state.lock().expect("cache manager lock poisoned").used_bytes
    }

    /// Resident splits, oldest first.
    pub fn resident_splits(&self) -> Vec<SplitId> {
        self.state
            .lock()
            .expect("cache manager lock poisoned")
            .order
            .iter()
            .map(|(s, _)| s.clone())
            .collect()
    }

    /// Drops every resident split and returns how many there were.
    ///
    /// # Errors
    /// [`SspError::Execution`] when the manager is closed.
    pub fn flush(&self) -> Result<usize> {
        let mut st = self.state.lock().expect("cache manager lock poisoned");
        if st.closed {
            return Err(SspError::Execution(format!(
                "cannot flush closed cache manager '{}'",
                self.config.name
            )));
        }
        let n = st.order.len();
        st.order.clear();
        st.members.clear();
        st.used_bytes = 0;
        Ok(n)
    }

    /// Releases the cache. A manager closes exactly once.
    ///
    /// # Errors
    /// [`SspError::Execution`] on a second close.
    pub fn close(&self) -> Result<()> {
        let mut st = self.state.lock().expect("cache manager lock poisoned");
        if st.closed {
            return Err(SspError::Execution(format!(
                "cache manager '{}' already closed",
                self.config.name
            )));
        }
        st.closed = true;
        st.order.clear();
        st.members.clear();
        st.used_bytes = 0;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().expect("cache manager lock poisoned").closed
    }
}

/// Registry of live cache managers keyed by [`CacheKey`].
#[derive(Default)]
pub struct CacheManagerRegistry {
    inner: RwLock<HashMap<CacheKey, Arc<CacheManager>>>,
}

impl std::fmt::Debug for CacheManagerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.inner.read().map(|m| m.len()).unwrap_or_default();
        f.debug_struct("CacheManagerRegistry")
            .field("managers", &count)
            .finish()
    }
}

impl CacheManagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared manager for `config`, creating it on first use.
    ///
    /// # Errors
    /// [`SspError::InvalidConfig`] for a zero capacity or zero load concurrency.
    pub fn get_or_create(&self, config: &CacheConfig) -> Result<Arc<CacheManager>> {
        if config.max_size_bytes == 0 {
            return Err(SspError::InvalidConfig(format!(
                "cache '{}' must have a non-zero max size",
                config.name
            )));
        }
        if config.max_concurrent_loads == 0 {
            return Err(SspError::InvalidConfig(format!(
                "cache '{}' must allow at least one concurrent load",
                config.name
            )));
        }
        let key = CacheKey::from_config(config);
        if let Some(m) = self
            .inner
            .read()
            .expect("cache registry lock poisoned")
            .get(&key)
        {
            return Ok(Arc::clone(m));
        }

        let mut managers = self.inner.write().expect("cache registry lock poisoned");
        if let Some(m) = managers.get(&key) {
            return Ok(Arc::clone(m));
        }
        let manager = Arc::new(CacheManager::new(key.clone(), config.clone()));
        managers.insert(key.clone(), Arc::clone(&manager));
        global_metrics().inc_cache_manager_event("created");
        info!(
            cache = %config.name,
            key = %key.fingerprint(),
            max_size_bytes = config.max_size_bytes,
            operator = "CacheManagerRegistry",
            "cache manager created"
        );
        Ok(manager)
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheManager>> {
        self.inner
            .read()
            .expect("cache registry lock poisoned")
            .get(key)
            .cloned()
    }

    /// Closes every manager and empties the registry.
    ///
    /// Each manager is attempted independently; failures are logged. Returns
    /// the number of managers the registry held.
    pub fn close_all(&self) -> usize {
        let drained = self.drain();
        let total = drained.len();
        let mut failed = 0usize;
        for m in drained {
            match m.close() {
                Ok(()) => global_metrics().inc_cache_manager_event("closed"),
                Err(e) => {
                    failed += 1;
                    global_metrics().inc_cache_manager_event("close_failed");
                    warn!(
                        cache = %m.name(),
                        key = %m.key().fingerprint(),
                        error = %e,
                        operator = "CacheManagerRegistry",
                        "closing cache manager failed"
                    );
                }
            }
        }
        info!(
            managers = total,
            failed,
            operator = "CacheManagerRegistry",
            "closed all cache managers"
        );
        total
    }

    /// Flushes every manager's contents and empties the registry.
    ///
    /// Outstanding handles remain usable; the next `get_or_create` builds a
    /// fresh manager. Returns the number of managers the registry held.
    pub fn flush_all(&self) -> usize {
        let drained = self.drain();
        let total = drained.len();
        let mut flushed_splits = 0usize;
        for m in drained {
            match m.flush() {
                Ok(n) => {
                    flushed_splits += n;
                    global_metrics().inc_cache_manager_event("flushed");
                }
                Err(e) => {
                    global_metrics().inc_cache_manager_event("flush_failed");
                    warn!(
                        cache = %m.name(),
                        key = %m.key().fingerprint(),
                        error = %e,
                        operator = "CacheManagerRegistry",
                        "flushing cache manager failed"
                    );
                }
            }
        }
        info!(
            managers = total,
            flushed_splits,
            operator = "CacheManagerRegistry",
            "flushed all cache managers"
        );
        total
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("cache registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn drain(&self) -> Vec<Arc<CacheManager>> {
        let mut managers = self.inner.write().expect("cache registry lock poisoned");
        std::mem::take(&mut *managers).into_values().collect()
    }
}
