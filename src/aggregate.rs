//! # Aggregator
//! Reduces product scores to transaction, merchant and overall scores.
//! No I/O, suitable for unit tests and offline evaluation.
//!
//! Policy:
//! - transaction = rounded mean of its product scores (empty → default, 50)
//! - merchant    = rounded mean of its transaction scores, each transaction once
//!   (or weighted by product count when configured)
//! - overall     = rounded mean of every product score (product-weighted)
//!
//! Every view reads the overall score from `aggregate_overall`; there is no
//! second definition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Merchant, ProductScore, ScoreAggregate, ScoreBundle, ScoredTransaction, Transaction};

pub const DEFAULT_EMPTY_TRANSACTION_SCORE: u8 = 50;

/// Anything that carries a 0–100 score: classified products or raw hints.
pub trait Scored {
    fn score(&self) -> u8;
}

impl Scored for u8 {
    fn score(&self) -> u8 {
        *self
    }
}

impl Scored for ProductScore {
    fn score(&self) -> u8 {
        self.score
    }
}

impl Scored for ScoredTransaction {
    fn score(&self) -> u8 {
        self.transaction_score
    }
}

impl<T: Scored + ?Sized> Scored for &T {
    fn score(&self) -> u8 {
        (**self).score()
    }
}

/// How a merchant's transactions are weighted against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MerchantWeighting {
    /// Each transaction counts once regardless of size.
    #[default]
    PerTransaction,
    /// Each transaction counts once per product it contains.
    ByProductCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregator {
    pub empty_transaction_score: u8,
    pub merchant_weighting: MerchantWeighting,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            empty_transaction_score: DEFAULT_EMPTY_TRANSACTION_SCORE,
            merchant_weighting: MerchantWeighting::PerTransaction,
        }
    }
}

impl Aggregator {
    pub fn aggregate_transaction<T: Scored>(&self, products: &[T]) -> u8 {
        rounded_mean(products.iter().map(|p| (p.score(), 1)))
            .unwrap_or(self.empty_transaction_score)
    }

    pub fn aggregate_merchant(&self, transactions: &[ScoredTransaction]) -> ScoreAggregate {
        let weighted = transactions.iter().map(|t| {
            let w = match self.merchant_weighting {
                MerchantWeighting::PerTransaction => 1,
                MerchantWeighting::ByProductCount => t.products.len() as u64,
            };
            (t.transaction_score, w)
        });
        ScoreAggregate {
            score: rounded_mean(weighted).unwrap_or(0),
            counted_transactions: transactions.len(),
            counted_products: transactions.iter().map(|t| t.products.len()).sum(),
        }
    }

    /// Product-weighted mean across every scored transaction.
    pub fn aggregate_overall(&self, transactions: &[ScoredTransaction]) -> ScoreAggregate {
        let products = transactions.iter().flat_map(|t| t.products.iter());
        ScoreAggregate {
            score: rounded_mean(products.map(|p| (p.score, 1))).unwrap_or(0),
            counted_transactions: transactions.len(),
            counted_products: transactions.iter().map(|t| t.products.len()).sum(),
        }
    }

    pub fn score_transaction(
        &self,
        merchant_name: &str,
        transaction: &Transaction,
        products: Vec<ProductScore>,
    ) -> ScoredTransaction {
        ScoredTransaction {
            transaction_id: transaction.external_id.clone(),
            merchant_name: merchant_name.to_string(),
            transaction_score: self.aggregate_transaction(&products),
            products,
            total_amount: transaction.price.total,
            date: transaction.date_time,
        }
    }

    /// Score every transaction of every merchant, in order, with `scorer`.
    pub fn score_merchants<'a, I, F>(&self, merchants: I, mut scorer: F) -> ScoreBundle
    where
        I: IntoIterator<Item = &'a Merchant>,
        F: FnMut(&str) -> ProductScore,
    {
        let mut scored = Vec::new();
        for m in merchants {
            for t in &m.transactions {
                let products = t.products.iter().map(|p| scorer(&p.name)).collect();
                scored.push(self.score_transaction(&m.name, t, products));
            }
        }
        self.bundle(scored)
    }

    /// Wrap scored transactions into a bundle with the canonical overall score.
    pub fn bundle(&self, scored_transactions: Vec<ScoredTransaction>) -> ScoreBundle {
        let overall = self.aggregate_overall(&scored_transactions);
        let product_scores = scored_transactions
            .iter()
            .flat_map(|t| t.products.iter().cloned())
            .collect();
        ScoreBundle {
            scored_transactions,
            overall_score: overall.score,
            product_scores,
        }
    }

    /// Group a bundle's transactions by merchant name (sorted by name).
    pub fn merchant_aggregates(&self, bundle: &ScoreBundle) -> BTreeMap<String, ScoreAggregate> {
        let mut groups: BTreeMap<String, Vec<ScoredTransaction>> = BTreeMap::new();
        for t in &bundle.scored_transactions {
            groups.entry(t.merchant_name.clone()).or_default().push(t.clone());
        }
        groups
            .into_iter()
            .map(|(name, txs)| (name, self.aggregate_merchant(&txs)))
            .collect()
    }
}

/// Transaction count and spend across a merchant set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub transactions: usize,
    pub spent: f64,
}

pub fn totals<'a, I>(merchants: I) -> Totals
where
    I: IntoIterator<Item = &'a Merchant>,
{
    merchants.into_iter().fold(Totals::default(), |acc, m| Totals {
        transactions: acc.transactions + m.transactions.len(),
        spent: acc.spent + m.transactions.iter().map(|t| t.price.total).sum::<f64>(),
    })
}

/// Free-function form of `Aggregator::default().aggregate_transaction`.
pub fn aggregate_transaction<T: Scored>(products: &[T]) -> u8 {
    Aggregator::default().aggregate_transaction(products)
}

/// Mean of `(score, weight)` pairs rounded half-up; `None` when total weight is 0.
fn rounded_mean<I>(items: I) -> Option<u8>
where
    I: IntoIterator<Item = (u8, u64)>,
{
    let (sum, n) = items
        .into_iter()
        .fold((0u64, 0u64), |(s, n), (score, w)| (s + score as u64 * w, n + w));
    if n == 0 {
        return None;
    }
    // (2*sum + n) / (2n) == floor(sum/n + 0.5)
    Some(((2 * sum + n) / (2 * n)).min(100) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SustainabilityFactors;
    use chrono::{TimeZone, Utc};

    fn ps(score: u8) -> ProductScore {
        ProductScore {
            product_name: format!("p{score}"),
            score,
            reasoning: String::new(),
            category: "General".into(),
            factors: SustainabilityFactors::uniform(score),
            rule: None,
        }
    }

    fn stx(merchant: &str, scores: &[u8]) -> ScoredTransaction {
        let agg = Aggregator::default();
        let products: Vec<ProductScore> = scores.iter().map(|s| ps(*s)).collect();
        ScoredTransaction {
            transaction_id: format!("{merchant}-{}", scores.len()),
            merchant_name: merchant.into(),
            transaction_score: agg.aggregate_transaction(&products),
            products,
            total_amount: 10.0,
            date: Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_transaction_uses_default() {
        let empty: [u8; 0] = [];
        assert_eq!(aggregate_transaction(&empty), 50);
        let agg = Aggregator {
            empty_transaction_score: 60,
            ..Default::default()
        };
        assert_eq!(agg.aggregate_transaction(&empty), 60);
    }

    #[test]
    fn identical_scores_average_to_themselves() {
        for s in [0u8, 1, 37, 50, 99, 100] {
            assert_eq!(aggregate_transaction(&[s; 7]), s);
        }
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(aggregate_transaction(&[90u8, 40, 60]), 63);
        assert_eq!(aggregate_transaction(&[50u8, 51]), 51);
        assert_eq!(aggregate_transaction(&[10u8, 10, 11]), 10);
    }

    #[test]
    fn merchant_mean_counts_each_transaction_once() {
        let txs = vec![stx("A", &[100]), stx("A", &[0, 0, 0])];
        let agg = Aggregator::default();
        assert_eq!(agg.aggregate_merchant(&txs).score, 50);

        let by_products = Aggregator {
            merchant_weighting: MerchantWeighting::ByProductCount,
            ..Default::default()
        };
        assert_eq!(by_products.aggregate_merchant(&txs).score, 25);
    }

    #[test]
    fn overall_is_product_weighted() {
        let txs = vec![stx("A", &[100]), stx("B", &[0, 0, 0])];
        let overall = Aggregator::default().aggregate_overall(&txs);
        assert_eq!(overall.score, 25);
        assert_eq!(overall.counted_products, 4);
        assert_eq!(overall.counted_transactions, 2);
    }

    #[test]
    fn empty_collections_default_to_zero() {
        let agg = Aggregator::default();
        assert_eq!(agg.aggregate_merchant(&[]).score, 0);
        assert_eq!(agg.aggregate_overall(&[]).score, 0);
        assert_eq!(agg.aggregate_overall(&[stx("A", &[])]).score, 0);
    }

    #[test]
    fn merchant_aggregates_group_by_name() {
        let agg = Aggregator::default();
        let bundle = agg.bundle(vec![stx("A", &[90]), stx("B", &[40]), stx("A", &[60])]);
        let groups = agg.merchant_aggregates(&bundle);
        assert_eq!(groups["A"].score, 75);
        assert_eq!(groups["A"].counted_transactions, 2);
        assert_eq!(groups["B"].score, 40);
        assert_eq!(bundle.product_scores.len(), 3);
    }
}
