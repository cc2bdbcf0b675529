// src/config/scoring.rs
//! Engine settings from `config/leafcart.toml`, with env overrides.
//!
//! Resolution:
//! 1) $LEAFCART_CONFIG_PATH (must exist)
//! 2) config/leafcart.toml
//! 3) built-in defaults
//!
//! Then `LEAFCART_CACHE_TTL_MS` and `LEAFCART_CACHE_DIR` override the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::{Aggregator, MerchantWeighting, DEFAULT_EMPTY_TRANSACTION_SCORE};
use crate::cache::{FileStore, ScoreCache, SystemClock, TtlPolicy, DEFAULT_TTL_MS};
use crate::classify::{load_rules_file, Classifier, FallbackMode, RuleTable};

pub const DEFAULT_CONFIG_PATH: &str = "config/leafcart.toml";
pub const ENV_CONFIG_PATH: &str = "LEAFCART_CONFIG_PATH";
pub const ENV_CACHE_TTL_MS: &str = "LEAFCART_CACHE_TTL_MS";
pub const ENV_CACHE_DIR: &str = "LEAFCART_CACHE_DIR";

fn default_ttl_ms() -> i64 {
    DEFAULT_TTL_MS
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/scores")
}
fn default_empty_score() -> u8 {
    DEFAULT_EMPTY_TRANSACTION_SCORE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: i64,
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            dir: default_cache_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringSection {
    #[serde(default = "default_empty_score")]
    pub empty_transaction_score: u8,
    #[serde(default)]
    pub merchant_weighting: MerchantWeighting,
    #[serde(default)]
    pub fallback: FallbackMode,
    /// JSON rule table replacing the built-in one.
    #[serde(default)]
    pub rules_path: Option<PathBuf>,
}

impl Default for ScoringSection {
    fn default() -> Self {
        Self {
            empty_transaction_score: default_empty_score(),
            merchant_weighting: MerchantWeighting::default(),
            fallback: FallbackMode::default(),
            rules_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub scoring: ScoringSection,
}

impl ScoringConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: ScoringConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// File (per the resolution order above) plus env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
            if pb.exists() {
                Self::load_from(&pb)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        cfg.validate()?;
        info!(
            ttl_ms = cfg.cache.ttl_ms,
            cache_dir = %cfg.cache.dir.display(),
            weighting = ?cfg.scoring.merchant_weighting,
            "scoring config loaded"
        );
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Ok(raw) = std::env::var(ENV_CACHE_TTL_MS) {
            match parse_ttl(&raw) {
                Some(ttl) => self.cache.ttl_ms = ttl,
                None => warn!(value = %raw, "ignoring invalid {ENV_CACHE_TTL_MS}"),
            }
        }
        if let Ok(dir) = std::env::var(ENV_CACHE_DIR) {
            if !dir.trim().is_empty() {
                self.cache.dir = PathBuf::from(dir);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.ttl_ms <= 0 {
            bail!("cache.ttl_ms must be positive, got {}", self.cache.ttl_ms);
        }
        if self.scoring.empty_transaction_score > 100 {
            bail!(
                "scoring.empty_transaction_score must be within [0,100], got {}",
                self.scoring.empty_transaction_score
            );
        }
        Ok(())
    }

    pub fn classifier(&self) -> Result<Classifier> {
        let table = match &self.scoring.rules_path {
            Some(p) => load_rules_file(p)?,
            None => RuleTable::builtin(),
        };
        Ok(Classifier::new(table, self.scoring.fallback))
    }

    pub fn aggregator(&self) -> Aggregator {
        Aggregator {
            empty_transaction_score: self.scoring.empty_transaction_score,
            merchant_weighting: self.scoring.merchant_weighting,
        }
    }

    /// File-backed cache under `cache.dir` on the system clock.
    pub fn score_cache(&self) -> ScoreCache {
        ScoreCache::new(
            Arc::new(FileStore::new(self.cache.dir.clone())),
            Arc::new(SystemClock),
            TtlPolicy::from_ms(self.cache.ttl_ms),
        )
    }
}

fn parse_ttl(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = ScoringConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, ScoringConfig::default());
        assert_eq!(cfg.cache.ttl_ms, 86_400_000);
        assert_eq!(cfg.aggregator(), Aggregator::default());
    }

    #[test]
    fn parses_sections() {
        let cfg = ScoringConfig::from_toml_str(
            r#"
            [cache]
            ttl_ms = 60000

            [scoring]
            empty_transaction_score = 40
            merchant_weighting = "by_product_count"
            fallback = { mode = "jitter", seed = 7 }
            "#,
        )
        .unwrap();
        assert_eq!(cfg.cache.ttl_ms, 60_000);
        assert_eq!(cfg.cache.dir, PathBuf::from("cache/scores"));
        assert_eq!(cfg.scoring.merchant_weighting, MerchantWeighting::ByProductCount);
        assert_eq!(cfg.scoring.fallback, FallbackMode::Jitter { seed: 7 });
        assert_eq!(cfg.aggregator().empty_transaction_score, 40);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ScoringConfig::from_toml_str("[cache]\nttl_ms = 0").is_err());
        assert!(ScoringConfig::from_toml_str("[scoring]\nempty_transaction_score = 101").is_err());
        assert!(ScoringConfig::from_toml_str("[scoring]\nmerchant_weighting = \"weird\"").is_err());
    }

    #[test]
    fn ttl_env_parsing() {
        assert_eq!(parse_ttl(" 1000 "), Some(1000));
        assert_eq!(parse_ttl("0"), None);
        assert_eq!(parse_ttl("-5"), None);
        assert_eq!(parse_ttl("soon"), None);
    }

    #[serial_test::serial]
    #[test]
    fn load_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_CACHE_TTL_MS);
        env::remove_var(ENV_CACHE_DIR);

        // no file in the temp CWD: defaults
        assert_eq!(ScoringConfig::load().unwrap(), ScoringConfig::default());

        fs::create_dir_all("config").unwrap();
        fs::write(DEFAULT_CONFIG_PATH, "[cache]\nttl_ms = 5000\n").unwrap();
        assert_eq!(ScoringConfig::load().unwrap().cache.ttl_ms, 5000);

        env::set_var(ENV_CACHE_TTL_MS, "7000");
        env::set_var(ENV_CACHE_DIR, "/tmp/leafcart-test-cache");
        let cfg = ScoringConfig::load().unwrap();
        assert_eq!(cfg.cache.ttl_ms, 7000);
        assert_eq!(cfg.cache.dir, PathBuf::from("/tmp/leafcart-test-cache"));

        env::set_var(ENV_CONFIG_PATH, "does/not/exist.toml");
        assert!(ScoringConfig::load().is_err());

        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_CACHE_TTL_MS);
        env::remove_var(ENV_CACHE_DIR);
        env::set_current_dir(old).unwrap();
    }
}
