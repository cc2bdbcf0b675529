// src/lib.rs
// Public library surface for the service binary and integration tests.

pub mod advice;
pub mod aggregate;
pub mod ai;
pub mod api;
pub mod cache;
pub mod classify;
pub mod config;
pub mod fixtures;
pub mod metrics;
pub mod model;
pub mod ratings;
pub mod rewards;
pub mod session;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{aggregate_transaction, Aggregator};
pub use crate::api::{router, AppState};
pub use crate::cache::ScoreCache;
pub use crate::classify::{classify, Classifier};
pub use crate::model::{Merchant, ProductScore, ScoreBundle, ScoredTransaction, Transaction};

use axum::Router;
use tracing::{info, warn};

use crate::config::{AiConfig, ScoringConfig};

/// Build the full router from config files, env and the bundled fixtures.
pub async fn app() -> anyhow::Result<Router> {
    let scoring = ScoringConfig::load()?;
    let ai = AiConfig::load_default().unwrap_or_else(|e| {
        warn!(error = %e, "AI config unusable, running without AI");
        AiConfig::default()
    });
    let merchants = fixtures::load_catalog()?;
    info!(merchants = merchants.len(), "fixtures loaded");

    let state = AppState::from_config(&scoring, &ai, merchants)?;
    let mut router = api::router(state);

    if metrics::enabled_from_env() {
        let m = metrics::Metrics::init(scoring.cache.ttl_ms)?;
        router = router.merge(m.router());
    }
    Ok(router)
}
