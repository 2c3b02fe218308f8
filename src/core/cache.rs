use sha2::{Digest, Sha256};
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Keys longer than this are collapsed to a content hash.
pub const MAX_KEY_LEN: usize = 200;

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    created_at: Instant,
    ttl: Option<Duration>,
}

/// Snapshot of the store's state for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub total_items: usize,
    pub default_ttl_secs: u64,
}

/// Thread-safe TTL store for memoized query results.
///
/// Values of any `Send + Sync` type can be stored; reading with a different
/// type than was written behaves like a miss. Every operation takes the same
/// lock for its whole duration. A disabled store accepts every call and keeps
/// nothing.
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<Mutex<HashMap<String, CacheEntry>>>,
    default_ttl: Duration,
    enabled: bool,
}

impl CacheStore {
    pub fn new(default_ttl: Duration) -> Self {
        info!(
            "Cache initialized: enabled=true, ttl={}s",
            default_ttl.as_secs()
        );
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            default_ttl,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        info!("Cache initialized: enabled=false");
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            default_ttl: DEFAULT_TTL,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // Entries stay structurally valid even if a holder panicked.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.created_at) > entry.ttl.unwrap_or(self.default_ttl)
    }

    /// Returns the value for `key` unless it is missing, expired or of
    /// another type. Expired entries are purged on the way.
    pub fn get<V: Clone + 'static>(&self, key: &str) -> Option<V> {
        if !self.enabled {
            return None;
        }
        let mut cache = self.entries();
        let Some(entry) = cache.get(key) else {
            debug!("Cache MISS: {}", key);
            return None;
        };
        if self.is_expired(entry, Instant::now()) {
            cache.remove(key);
            debug!("Cache EXPIRED: {}", key);
            return None;
        }
        match entry.value.downcast_ref::<V>() {
            Some(value) => {
                debug!("Cache HIT: {}", key);
                Some(value.clone())
            }
            None => {
                debug!("Cache MISS: {} (type mismatch)", key);
                None
            }
        }
    }

    /// Stores `value` under `key`. `ttl` of `None` means the store default.
    pub fn set<V: Send + Sync + 'static>(&self, key: &str, value: V, ttl: Option<Duration>) {
        if !self.enabled {
            return;
        }
        let entry = CacheEntry {
            value: Arc::new(value),
            created_at: Instant::now(),
            ttl,
        };
        let mut cache = self.entries();
        debug!(
            "Cache SET: {} (ttl={}s)",
            key,
            ttl.unwrap_or(self.default_ttl).as_secs_f64()
        );
        cache.insert(key.to_string(), entry);
    }

    pub fn delete(&self, key: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let removed = self.entries().remove(key).is_some();
        if removed {
            debug!("Cache DELETE: {}", key);
        }
        removed
    }

    pub fn clear(&self) {
        if !self.enabled {
            return;
        }
        let mut cache = self.entries();
        let count = cache.len();
        cache.clear();
        info!("Cache CLEAR: {} items removed", count);
    }

    /// Removes every key matching `pattern` and returns how many went.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        self.invalidate_many(&[pattern])
    }

    /// Removes the union of keys matched by any of `patterns` under a single
    /// lock acquisition.
    pub fn invalidate_many<S: AsRef<str>>(&self, patterns: &[S]) -> usize {
        if !self.enabled || patterns.is_empty() {
            return 0;
        }
        let mut cache = self.entries();
        let doomed: Vec<String> = cache
            .keys()
            .filter(|key| patterns.iter().any(|p| matches_pattern(key, p.as_ref())))
            .cloned()
            .collect();
        for key in &doomed {
            cache.remove(key);
        }
        let joined: Vec<&str> = patterns.iter().map(AsRef::as_ref).collect();
        info!(
            "Cache CLEAR PATTERN {:?}: {} items",
            joined,
            doomed.len()
        );
        doomed.len()
    }

    /// Sweeps every expired entry.
    pub fn cleanup_expired(&self) -> usize {
        if !self.enabled {
            return 0;
        }
        let now = Instant::now();
        let mut cache = self.entries();
        let before = cache.len();
        cache.retain(|_, entry| !self.is_expired(entry, now));
        let removed = before - cache.len();
        if removed > 0 {
            info!("Cache CLEANUP: {} expired items removed", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            enabled: self.enabled,
            total_items: self.len(),
            default_ttl_secs: self.default_ttl.as_secs(),
        }
    }

    /// Cache-aside lookup: returns the cached value for `key`, or runs
    /// `compute`, stores its `Ok` value and returns it. Errors are never
    /// cached. The lock is not held while `compute` runs.
    pub fn get_or_insert_with<V, E, F>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<V, E>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get::<V>(key) {
            return Ok(value);
        }
        let started = Instant::now();
        let value = compute()?;
        debug!("Computed {} in {:?}", key, started.elapsed());
        self.set(key, value.clone(), ttl);
        Ok(value)
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// `"abc*"` matches by prefix, `"*abc"` by suffix, anything else by
/// substring.
pub fn matches_pattern(key: &str, pattern: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix('*') {
        key.starts_with(prefix)
    } else if let Some(suffix) = pattern.strip_prefix('*') {
        key.ends_with(suffix)
    } else {
        key.contains(pattern)
    }
}

/// Builds a deterministic key `prefix:identity:args:kwargs`. Positional
/// arguments are joined with `_`, keyword arguments are sorted by name and
/// rendered as `name=value`. Empty parts are skipped. Keys longer than
/// [`MAX_KEY_LEN`] become `prefix:identity:<sha256>`.
pub fn key_for(
    identity: &str,
    args: &[&dyn Display],
    kwargs: &[(&str, &dyn Display)],
    prefix: &str,
) -> String {
    let args_str = args
        .iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join("_");

    let mut sorted_kwargs: Vec<&(&str, &dyn Display)> = kwargs.iter().collect();
    sorted_kwargs.sort_by(|a, b| a.0.cmp(b.0));
    let kwargs_str = sorted_kwargs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("_");

    let key = [prefix, identity, &args_str, &kwargs_str]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(":");

    if key.len() > MAX_KEY_LEN {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        return [prefix, identity, &digest]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(":");
    }
    key
}
