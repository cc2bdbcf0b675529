// src/ai/mod.rs
//! Model-backed advisor: alternative suggestions, chat, and batch product scoring.
//!
//! Nothing here is fatal. Every provider failure degrades to a fixed string or
//! to the neutral default score, and bumps `leafcart_ai_fallback_total`.

pub mod prompt;
pub mod provider;

use std::time::Duration;

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::aggregate::Aggregator;
use crate::classify::infer_category;
use crate::model::{clamp_score, Merchant, ProductScore, ScoreBundle, ScoredTransaction, SustainabilityFactors};

pub use provider::{
    DisabledProvider, DynProvider, GeminiProvider, MockProvider, OpenAiProvider, Provider,
};

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(1000);

pub const SUGGEST_UNAVAILABLE: &str = "I'm having trouble connecting right now. Generally, look for products made with organic materials, minimal packaging, and recognized eco-certifications! 🌿";
pub const SUGGEST_EMPTY: &str = "I couldn't find better alternatives right now. Try looking for products with eco-certifications like GOTS, FSC, or Fair Trade! 🌱";
pub const CHAT_UNAVAILABLE: &str = "I'm having trouble connecting right now. Please try again in a moment. In the meantime, remember that every sustainable choice makes a difference! 🌱";
pub const CHAT_EMPTY: &str = "I'm here to help you make sustainable choices! 🌱";

const NEUTRAL_SCORE: u8 = 50;
const UNKNOWN_CATEGORY: &str = "Unknown";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    pub product_name: String,
    pub current_score: u8,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    #[serde(default)]
    pub recent_transactions: Vec<ScoredTransaction>,
    #[serde(default)]
    pub overall_score: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub context: Option<ChatContext>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchItem {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl BatchItem {
    pub fn new(name: impl Into<String>, category: Option<&str>) -> Self {
        Self {
            name: name.into(),
            category: category.map(str::to_string),
        }
    }

    fn category_or_unknown(&self) -> &str {
        self.category.as_deref().unwrap_or(UNKNOWN_CATEGORY)
    }
}

#[derive(Clone)]
pub struct Advisor {
    provider: DynProvider,
    batch_size: usize,
    batch_pause: Duration,
}

impl Advisor {
    pub fn new(provider: DynProvider) -> Self {
        Self {
            provider,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause: DEFAULT_BATCH_PAUSE,
        }
    }

    pub fn disabled() -> Self {
        Self::new(std::sync::Arc::new(DisabledProvider))
    }

    pub fn with_batching(mut self, batch_size: usize, batch_pause: Duration) -> Self {
        self.batch_size = batch_size.max(1);
        self.batch_pause = batch_pause;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.name() != "disabled"
    }

    pub async fn suggest(&self, req: &SuggestRequest) -> String {
        let p = prompt::suggest(&req.product_name, req.current_score, req.category.as_deref());
        match self.provider.complete(&p).await {
            Ok(text) if text.trim().is_empty() => SUGGEST_EMPTY.to_string(),
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                fallback("suggest", &e);
                SUGGEST_UNAVAILABLE.to_string()
            }
        }
    }

    pub async fn chat(&self, req: &ChatRequest) -> String {
        let ctx = req.context.clone().unwrap_or_default();
        let p = prompt::chat(&req.message, &ctx.recent_transactions, ctx.overall_score);
        match self.provider.complete(&p).await {
            Ok(text) if text.trim().is_empty() => CHAT_EMPTY.to_string(),
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                fallback("chat", &e);
                CHAT_UNAVAILABLE.to_string()
            }
        }
    }

    /// Score `items` with one model call. The result has exactly one entry per
    /// item, aligned by position.
    pub async fn score_batch(&self, items: &[BatchItem]) -> Vec<ProductScore> {
        if items.is_empty() {
            return Vec::new();
        }
        let pairs: Vec<(&str, &str)> = items
            .iter()
            .map(|i| (i.name.as_str(), i.category_or_unknown()))
            .collect();
        let p = prompt::batch(&pairs);

        let parsed = match self.provider.complete(&p).await {
            Ok(text) => parse_batch_reply(&text),
            Err(e) => Err(e),
        };
        match parsed {
            Ok(values) => items
                .iter()
                .enumerate()
                .map(|(i, item)| score_from_value(item, values.get(i)))
                .collect(),
            Err(e) => {
                fallback("score_batch", &e);
                items.iter().map(unavailable_score).collect()
            }
        }
    }

    /// Score `items` in chunks of `batch_size`, pausing `pause` between calls.
    pub async fn score_in_batches(
        &self,
        items: &[BatchItem],
        batch_size: usize,
        pause: Duration,
    ) -> Vec<ProductScore> {
        let mut pacer = Pacer::new(pause);
        self.score_paced(items, batch_size, &mut pacer).await
    }

    /// Score every merchant's transactions through the model and aggregate
    /// them with `aggregator`, the same way the classifier path does.
    pub async fn score_merchants_with_advisor<'a, I>(
        &self,
        aggregator: &Aggregator,
        merchants: I,
    ) -> ScoreBundle
    where
        I: IntoIterator<Item = &'a Merchant>,
    {
        let mut pacer = Pacer::new(self.batch_pause);
        let mut scored = Vec::new();
        for m in merchants {
            for t in &m.transactions {
                let items: Vec<BatchItem> = t
                    .products
                    .iter()
                    .map(|p| BatchItem::new(p.name.clone(), Some(infer_category(&p.name))))
                    .collect();
                let products = self.score_paced(&items, self.batch_size, &mut pacer).await;
                scored.push(aggregator.score_transaction(&m.name, t, products));
            }
        }
        debug!(transactions = scored.len(), provider = self.provider_name(), "advisor scoring done");
        aggregator.bundle(scored)
    }

    async fn score_paced(
        &self,
        items: &[BatchItem],
        batch_size: usize,
        pacer: &mut Pacer,
    ) -> Vec<ProductScore> {
        let mut out = Vec::with_capacity(items.len());
        for chunk in items.chunks(batch_size.max(1)) {
            pacer.wait().await;
            out.extend(self.score_batch(chunk).await);
        }
        out
    }
}

/// Spaces out provider calls: no wait before the first, `pause` before each later one.
struct Pacer {
    pause: Duration,
    started: bool,
}

impl Pacer {
    fn new(pause: Duration) -> Self {
        Self {
            pause,
            started: false,
        }
    }

    async fn wait(&mut self) {
        if self.started && !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
        }
        self.started = true;
    }
}

fn fallback(op: &'static str, err: &anyhow::Error) {
    warn!(op, error = %err, "AI provider failed, using fallback");
    counter!("leafcart_ai_fallback_total", "op" => op).increment(1);
}

static JSON_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

/// First `[`..last `]` span of the reply, parsed as a JSON array.
fn parse_batch_reply(text: &str) -> anyhow::Result<Vec<Value>> {
    let span = JSON_ARRAY
        .find(text)
        .ok_or_else(|| anyhow::anyhow!("no JSON array in model reply"))?;
    let values: Vec<Value> = serde_json::from_str(span.as_str())?;
    Ok(values)
}

/// Build a score from one array element; each missing field gets its own default.
fn score_from_value(item: &BatchItem, value: Option<&Value>) -> ProductScore {
    let obj = value.and_then(Value::as_object);
    let field = |k: &str| obj.and_then(|o| o.get(k));

    let score = field("score")
        .and_then(Value::as_f64)
        .map(|s| clamp_score(s.round() as i32))
        .unwrap_or(NEUTRAL_SCORE);
    let reasoning = field("reasoning")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or("Unable to analyze")
        .to_string();
    let category = field("category")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(item.category_or_unknown())
        .to_string();
    let factors = field("sustainabilityFactors")
        .and_then(Value::as_object)
        .map(|f| {
            let get = |k: &str| {
                f.get(k)
                    .and_then(Value::as_f64)
                    .map(|v| clamp_score(v.round() as i32))
                    .unwrap_or(NEUTRAL_SCORE)
            };
            SustainabilityFactors::new(
                get("materials"),
                get("packaging"),
                get("durability"),
                get("recyclability"),
                get("carbonFootprint"),
            )
        })
        .unwrap_or(SustainabilityFactors::uniform(NEUTRAL_SCORE));

    ProductScore {
        product_name: item.name.clone(),
        score,
        reasoning,
        category,
        factors,
        rule: Some("ai".to_string()),
    }
}

fn unavailable_score(item: &BatchItem) -> ProductScore {
    ProductScore {
        product_name: item.name.clone(),
        score: NEUTRAL_SCORE,
        reasoning: "Unable to analyze product with AI".to_string(),
        category: item.category_or_unknown().to_string(),
        factors: SustainabilityFactors::uniform(NEUTRAL_SCORE),
        rule: Some("ai:unavailable".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> BatchItem {
        BatchItem::new(name, Some("Food"))
    }

    #[test]
    fn parses_array_inside_prose() {
        let v = parse_batch_reply("Sure!\n```json\n[{\"score\": 80}, {}]\n```").unwrap();
        assert_eq!(v.len(), 2);
        assert!(parse_batch_reply("no array here").is_err());
        assert!(parse_batch_reply("[not json]").is_err());
    }

    #[test]
    fn per_field_defaults() {
        let v: Value = serde_json::json!({
            "score": 130,
            "sustainabilityFactors": {"materials": 90}
        });
        let s = score_from_value(&item("Apple"), Some(&v));
        assert_eq!(s.score, 100);
        assert_eq!(s.reasoning, "Unable to analyze");
        assert_eq!(s.category, "Food");
        assert_eq!(s.factors, SustainabilityFactors::new(90, 50, 50, 50, 50));

        let missing = score_from_value(&BatchItem::new("X", None), None);
        assert_eq!(missing.score, 50);
        assert_eq!(missing.category, "Unknown");
    }

    #[test]
    fn unavailable_is_neutral() {
        let s = unavailable_score(&item("Apple"));
        assert_eq!(s.score, 50);
        assert_eq!(s.reasoning, "Unable to analyze product with AI");
        assert_eq!(s.factors, SustainabilityFactors::uniform(50));
    }
}
