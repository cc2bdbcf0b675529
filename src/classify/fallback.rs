//! Default scoring for names no rule matched.
//!
//! Coarse buckets first (sustainable keywords, paper, personal care, animal
//! products, beverages). Everything else lands in the General bucket, whose score
//! sits in [45,65) with an offset derived from a SHA-256 of the folded name, so
//! the same name always gets the same score.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::rules::contains_any;
use crate::model::{clamp_score, ProductScore, SustainabilityFactors};

const GENERAL_BASE: i32 = 55;
const GENERAL_SPREAD: u64 = 20;

/// How the General bucket derives its per-name offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FallbackMode {
    /// Offset from a hash of the name only.
    #[default]
    Hashed,
    /// Offset from a hash of `seed` + name; reproducible per seed.
    Jitter { seed: u64 },
}

/// Score `name` (already normalized as `folded`) without the rule table.
pub fn default_score(name: &str, folded: &str, mode: FallbackMode) -> ProductScore {
    let bucket = |rule: &str, score: u8, reasoning: &str, category: &str, f: SustainabilityFactors| {
        ProductScore {
            product_name: name.to_string(),
            score,
            reasoning: reasoning.to_string(),
            category: category.to_string(),
            factors: f,
            rule: Some(rule.to_string()),
        }
    };

    if contains_any(folded, &["organic", "natural", "sustainable", "eco-friendly", "biodegradable"]) {
        return bucket(
            "default:sustainable",
            82,
            "Eco-friendly materials with minimal environmental impact",
            "Sustainable Products",
            SustainabilityFactors::new(88, 75, 80, 85, 82),
        );
    }
    if contains_any(folded, &["paper", "tissue", "towel"]) {
        return bucket(
            "default:paper",
            64,
            "Biodegradable but requires tree harvesting and processing energy",
            "Paper Products",
            SustainabilityFactors::new(68, 55, 45, 82, 62),
        );
    }
    if contains_any(folded, &["shampoo", "soap", "lotion", "cosmetic"]) {
        return bucket(
            "default:personal-care",
            56,
            "Varies by ingredients and packaging; often contains chemicals",
            "Personal Care",
            SustainabilityFactors::new(52, 48, 60, 54, 58),
        );
    }
    if contains_any(folded, &["beef", "meat", "pork", "dairy", "cheese", "milk"]) {
        return bucket(
            "default:animal-products",
            38,
            "High carbon footprint from livestock farming and methane emissions",
            "Animal Products",
            SustainabilityFactors::new(35, 45, 30, 28, 25),
        );
    }
    if contains_any(folded, &["soda", "juice", "water", "beverage"]) {
        return bucket(
            "default:beverages",
            48,
            "Plastic/glass bottles require significant resources and transportation",
            "Beverages",
            SustainabilityFactors::new(42, 38, 55, 65, 45),
        );
    }

    let base = GENERAL_BASE + name_offset(folded, mode);
    bucket(
        "default:general",
        clamp_score(base),
        "Product sustainability varies by materials, packaging, and production methods",
        "General",
        SustainabilityFactors::clamped(base + 5, base - 8, base + 3, base - 5, base),
    )
}

/// Stable offset in [-10, 9] for the General bucket.
pub fn name_offset(folded: &str, mode: FallbackMode) -> i32 {
    let mut hasher = Sha256::new();
    if let FallbackMode::Jitter { seed } = mode {
        hasher.update(seed.to_le_bytes());
    }
    hasher.update(folded.as_bytes());
    let digest = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let bucket = u64::from_le_bytes(head) % GENERAL_SPREAD;
    bucket as i32 - 10
}
