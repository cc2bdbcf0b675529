// src/classify/mod.rs
//! Product classifier: free-text product name → `ProductScore`.
//!
//! Order:
//! 1) Ordered keyword rules (first match wins, specific before general)
//! 2) Default-score buckets when no rule matches
//!
//! Pure: no I/O, never fails.

pub mod category;
pub mod fallback;
pub mod rules;

use metrics::counter;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::model::ProductScore;

pub use category::infer_category;
pub use fallback::FallbackMode;
pub use rules::{load_rules_file, Profile, Rule, RuleTable, When};

static BUILTIN: Lazy<Classifier> = Lazy::new(Classifier::default);

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: RuleTable,
    fallback: FallbackMode,
}

impl Classifier {
    pub fn new(table: RuleTable, fallback: FallbackMode) -> Self {
        Self { table, fallback }
    }

    pub fn with_fallback(mut self, fallback: FallbackMode) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn classify(&self, product_name: &str) -> ProductScore {
        if let Some((rule, p)) = self.table.first_match(product_name) {
            return ProductScore {
                product_name: product_name.to_string(),
                score: p.score.min(100),
                reasoning: p.reasoning.clone(),
                category: p.category.clone(),
                factors: p.factors,
                rule: Some(rule.name.clone()),
            };
        }

        let folded = rules::normalize(product_name);
        let out = fallback::default_score(product_name, &folded, self.fallback);
        debug!(
            target: "leafcart::classify",
            bucket = out.rule.as_deref().unwrap_or_default(),
            score = out.score,
            "no rule matched, used default bucket"
        );
        counter!("leafcart_classifier_fallback_total").increment(1);
        out
    }
}

/// Classify with the built-in rule table and hashed fallback.
pub fn classify(product_name: &str) -> ProductScore {
    BUILTIN.classify(product_name)
}
