//! LeafCart scoring service: binary entrypoint.
//! Boots the Axum HTTP server over the scoring library.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default, JSON when LEAFCART_LOG_JSON=1.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("leafcart=info,warn"));
    let json = std::env::var("LEAFCART_LOG_JSON").is_ok_and(|v| v == "1");

    // Shuttle may have installed a subscriber already; keep it if so.
    let _ = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let router = leafcart::app().await?;
    Ok(router.into())
}
