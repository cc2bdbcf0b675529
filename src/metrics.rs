use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const ENV_METRICS: &str = "LEAFCART_METRICS";

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and publish the cache TTL.
    pub fn init(ttl_ms: i64) -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                let handle = PrometheusBuilder::new().install_recorder()?;
                describe();
                anyhow::Ok(handle)
            })?
            .clone();

        gauge!("leafcart_score_cache_ttl_ms").set(ttl_ms as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

pub fn enabled_from_env() -> bool {
    std::env::var(ENV_METRICS).is_ok_and(|v| v == "1")
}

fn describe() {
    describe_counter!("leafcart_score_cache_hits_total", "Score bundle served from cache.");
    describe_counter!("leafcart_score_cache_misses_total", "Score bundle recomputed.");
    describe_counter!(
        "leafcart_classifier_fallback_total",
        "Products scored by a default bucket instead of a rule."
    );
    describe_counter!("leafcart_ai_fallback_total", "AI calls that degraded to a fallback.");
    describe_gauge!("leafcart_score_cache_ttl_ms", "Configured score cache TTL.");
}
