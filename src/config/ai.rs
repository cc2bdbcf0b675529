// src/config/ai.rs
use std::sync::Arc;
use std::time::Duration;
use std::{env, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ai::{Advisor, DisabledProvider, DynProvider, GeminiProvider, MockProvider, OpenAiProvider};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_AI_CONFIG_PATH: &str = "LEAFCART_AI_CONFIG";

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_batch_size() -> usize {
    10
}
fn default_batch_pause_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// "gemini" | "openai" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// "ENV" means: read from GEMINI_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: None,
            api_key: String::new(),
            batch_size: default_batch_size(),
            batch_pause_ms: default_batch_pause_ms(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> anyhow::Result<Self> {
        let mut cfg: AiConfig = serde_json::from_str(data)?;

        cfg.provider = cfg.provider.trim().to_lowercase();

        if cfg.enabled && cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = match cfg.provider.as_str() {
                "gemini" => env::var("GEMINI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing GEMINI_API_KEY env var"))?,
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        if cfg.batch_size == 0 {
            cfg.batch_size = default_batch_size();
        }

        Ok(cfg)
    }

    /// `$LEAFCART_AI_CONFIG` or `config/ai.json`; a missing file means AI is off.
    pub fn load_default() -> anyhow::Result<Self> {
        let path = env::var(ENV_AI_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_AI_CONFIG_PATH.to_string());
        if !Path::new(&path).exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(&path)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

/// Pick the provider for `cfg`.
///
/// * `AI_TEST_MODE=mock` → deterministic mock.
/// * `enabled == false` → disabled.
/// * Otherwise the configured remote provider; build errors degrade to disabled.
pub fn build_provider(cfg: &AiConfig) -> DynProvider {
    if env::var("AI_TEST_MODE").map(|v| v == "mock").unwrap_or(false) {
        return Arc::new(MockProvider::fixed("Neutral advice (mock)"));
    }
    if !cfg.enabled {
        return Arc::new(DisabledProvider);
    }

    let built: anyhow::Result<DynProvider> = match cfg.provider.as_str() {
        "gemini" => GeminiProvider::new(cfg.api_key.clone(), cfg.model.as_deref())
            .map(|p| Arc::new(p) as DynProvider),
        "openai" => OpenAiProvider::new(cfg.api_key.clone(), cfg.model.as_deref())
            .map(|p| Arc::new(p) as DynProvider),
        other => Err(anyhow::anyhow!("unsupported provider '{other}'")),
    };
    match built {
        Ok(p) => {
            info!(provider = p.name(), "AI provider ready");
            p
        }
        Err(e) => {
            warn!(error = %e, "AI provider unavailable, running without it");
            Arc::new(DisabledProvider)
        }
    }
}

pub fn build_advisor(cfg: &AiConfig) -> Advisor {
    Advisor::new(build_provider(cfg)).with_batching(cfg.batch_size, cfg.batch_pause())
}
