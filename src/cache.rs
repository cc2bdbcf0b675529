//! Score cache: memoizes the last aggregate bundle under a fixed key.
//!
//! Staleness is purely time-based and global: an entry is fresh while
//! `now - timestamp < ttl`. There is no content hashing of the inputs. Corrupt
//! entries are logged and treated as a miss; they never reach the caller.
//!
//! Storage and time are pluggable (`CacheStore`, `Clock`) so the TTL logic is
//! testable without the wall clock.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::{ProductScore, ScoreBundle, ScoredTransaction};

pub const SCORE_CACHE_KEY: &str = "leafcart_scored_transactions";
pub const DEFAULT_TTL_MS: i64 = 24 * 60 * 60 * 1000;

// ------------------------------------------------------------
// Clock
// ------------------------------------------------------------

pub trait Clock: Send + Sync {
    /// Milliseconds since the UNIX epoch.
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Test clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ------------------------------------------------------------
// Stores
// ------------------------------------------------------------

pub trait CacheStore: Send + Sync {
    fn load(&self, key: &str) -> io::Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// One JSON file per key under `dir`, written via tmp + rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let _ = fs::create_dir_all(&dir); // best-effort
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl CacheStore for FileStore {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(value.as_bytes())?;
        f.sync_all()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        let g = self.inner.lock().map_err(|_| poisoned())?;
        Ok(g.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> io::Result<()> {
        let mut g = self.inner.lock().map_err(|_| poisoned())?;
        g.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut g = self.inner.lock().map_err(|_| poisoned())?;
        g.remove(key);
        Ok(())
    }
}

fn poisoned() -> io::Error {
    io::Error::other("memory store mutex poisoned")
}

// ------------------------------------------------------------
// TTL + cache
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub ttl_ms: i64,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL_MS,
        }
    }
}

impl TtlPolicy {
    pub fn from_ms(ttl_ms: i64) -> Self {
        Self { ttl_ms }
    }

    /// Age of an entry, `None` when it overflows or lies in the future.
    pub fn age_ms(stored_at_ms: i64, now_ms: i64) -> Option<i64> {
        now_ms.checked_sub(stored_at_ms).filter(|age| *age >= 0)
    }

    pub fn is_fresh(&self, stored_at_ms: i64, now_ms: i64) -> bool {
        Self::age_ms(stored_at_ms, now_ms).is_some_and(|age| age < self.ttl_ms)
    }
}

/// Persisted shape: the bundle fields plus the write timestamp (epoch ms).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    scored_transactions: Vec<ScoredTransaction>,
    overall_score: u8,
    product_scores: Vec<ProductScore>,
    timestamp: i64,
}

impl CacheEntry {
    fn new(bundle: &ScoreBundle, timestamp: i64) -> Self {
        Self {
            scored_transactions: bundle.scored_transactions.clone(),
            overall_score: bundle.overall_score,
            product_scores: bundle.product_scores.clone(),
            timestamp,
        }
    }

    fn into_bundle(self) -> ScoreBundle {
        ScoreBundle {
            scored_transactions: self.scored_transactions,
            overall_score: self.overall_score,
            product_scores: self.product_scores,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

pub struct ScoreCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    ttl: TtlPolicy,
    key: String,
}

impl ScoreCache {
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, ttl: TtlPolicy) -> Self {
        Self {
            store,
            clock,
            ttl,
            key: SCORE_CACHE_KEY.to_string(),
        }
    }

    /// In-memory cache on the system clock with the default 24h TTL.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock), TtlPolicy::default())
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn ttl(&self) -> TtlPolicy {
        self.ttl
    }

    /// Fresh cached bundle, if any. Unreadable or stale entries yield `None`.
    pub fn lookup(&self) -> Option<ScoreBundle> {
        let raw = match self.store.load(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(target: "leafcart::cache", error = %e, key = %self.key, "score cache read failed");
                return None;
            }
        };
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(target: "leafcart::cache", error = %e, key = %self.key, "score cache entry corrupt, recomputing");
                return None;
            }
        };
        let now = self.clock.now_ms();
        if !self.ttl.is_fresh(entry.timestamp, now) {
            debug!(
                target: "leafcart::cache",
                stored_at = entry.timestamp,
                age_ms = ?TtlPolicy::age_ms(entry.timestamp, now),
                "score cache entry expired"
            );
            return None;
        }
        Some(entry.into_bundle())
    }

    /// Persist `bundle` stamped with the current clock time.
    pub fn store(&self, bundle: &ScoreBundle) -> anyhow::Result<()> {
        let entry = CacheEntry::new(bundle, self.clock.now_ms());
        let json = serde_json::to_string(&entry)?;
        self.store.save(&self.key, &json)?;
        Ok(())
    }

    pub fn get_or_compute<F>(&self, compute: F) -> (ScoreBundle, CacheStatus)
    where
        F: FnOnce() -> ScoreBundle,
    {
        if let Some(hit) = self.lookup() {
            counter!("leafcart_score_cache_hits_total").increment(1);
            return (hit, CacheStatus::Hit);
        }
        counter!("leafcart_score_cache_misses_total").increment(1);

        let fresh = compute();
        if let Err(e) = self.store(&fresh) {
            warn!(target: "leafcart::cache", error = %e, "failed to persist score bundle");
        }
        (fresh, CacheStatus::Miss)
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            warn!(target: "leafcart::cache", error = %e, "failed to clear score cache");
        }
    }
}
