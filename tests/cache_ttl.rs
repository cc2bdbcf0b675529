//! Score cache lifecycle against a controllable clock.
//!
//! Covered:
//! - MISS → HIT within 24h returns a byte-identical bundle
//! - recompute once the entry is 24h + 1ms old
//! - clear() forces a recompute
//! - file-backed store survives a new cache instance (restart)

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use leafcart::aggregate::Aggregator;
use leafcart::cache::{CacheStatus, FileStore, ManualClock, MemoryStore, ScoreCache, TtlPolicy, DEFAULT_TTL_MS};
use leafcart::fixtures::load_catalog;
use leafcart::{classify, ScoreBundle};

fn compute(counter: &AtomicUsize) -> ScoreBundle {
    counter.fetch_add(1, Ordering::SeqCst);
    let catalog = load_catalog().unwrap();
    Aggregator::default().score_merchants(&catalog, classify)
}

#[test]
fn hit_within_ttl_is_byte_identical() {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let cache = ScoreCache::new(Arc::new(MemoryStore::new()), clock.clone(), TtlPolicy::default());
    let calls = AtomicUsize::new(0);

    let (first, st) = cache.get_or_compute(|| compute(&calls));
    assert_eq!(st, CacheStatus::Miss);

    clock.advance(DEFAULT_TTL_MS - 1);
    let (second, st) = cache.get_or_compute(|| compute(&calls));
    assert_eq!(st, CacheStatus::Hit);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[test]
fn recomputes_after_ttl() {
    let clock = Arc::new(ManualClock::new(0));
    let cache = ScoreCache::new(Arc::new(MemoryStore::new()), clock.clone(), TtlPolicy::default());
    let calls = AtomicUsize::new(0);

    cache.get_or_compute(|| compute(&calls));
    clock.advance(DEFAULT_TTL_MS + 1);
    let (_, st) = cache.get_or_compute(|| compute(&calls));
    assert_eq!(st, CacheStatus::Miss);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // the recomputed entry is fresh again
    let (_, st) = cache.get_or_compute(|| compute(&calls));
    assert_eq!(st, CacheStatus::Hit);
}

#[test]
fn short_ttl_policy() {
    let clock = Arc::new(ManualClock::new(0));
    let cache = ScoreCache::new(Arc::new(MemoryStore::new()), clock.clone(), TtlPolicy::from_ms(500));
    let calls = AtomicUsize::new(0);

    cache.get_or_compute(|| compute(&calls));
    clock.advance(499);
    assert!(cache.lookup().is_some());
    clock.advance(1);
    assert!(cache.lookup().is_none());
}

#[test]
fn clear_then_miss() {
    let cache = ScoreCache::in_memory();
    let calls = AtomicUsize::new(0);
    cache.get_or_compute(|| compute(&calls));
    cache.clear();
    assert!(cache.lookup().is_none());
    let (_, st) = cache.get_or_compute(|| compute(&calls));
    assert_eq!(st, CacheStatus::Miss);
}

#[test]
fn file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(10_000));
    let calls = AtomicUsize::new(0);

    let first = {
        let cache = ScoreCache::new(Arc::new(FileStore::new(dir.path())), clock.clone(), TtlPolicy::default());
        cache.get_or_compute(|| compute(&calls)).0
    };
    assert!(dir.path().join("leafcart_scored_transactions.json").exists());

    let cache = ScoreCache::new(Arc::new(FileStore::new(dir.path())), clock.clone(), TtlPolicy::default());
    let (again, st) = cache.get_or_compute(|| compute(&calls));
    assert_eq!(st, CacheStatus::Hit);
    assert_eq!(again, first);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn corrupt_file_is_recomputed() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("leafcart_scored_transactions.json"), "{\"scoredTransactions\": 3").unwrap();

    let cache = ScoreCache::new(
        Arc::new(FileStore::new(dir.path())),
        Arc::new(ManualClock::new(0)),
        TtlPolicy::default(),
    );
    let calls = AtomicUsize::new(0);
    let (bundle, st) = cache.get_or_compute(|| compute(&calls));
    assert_eq!(st, CacheStatus::Miss);
    assert!(!bundle.scored_transactions.is_empty());
}
