// src/fixtures.rs
//! Bundled merchant order history.
//!
//! Each merchant's transactions live in `fixtures/<id>.json` and are compiled
//! into the binary. `TransactionSource` is the seam a live order feed would
//! plug into; `MockSource` serves the bundled data with a simulated delay.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::model::{Merchant, Transaction};

struct MerchantFixture {
    id: &'static str,
    name: &'static str,
    color: &'static str,
    json: &'static str,
}

const MERCHANTS: &[MerchantFixture] = &[
    MerchantFixture {
        id: "amazon",
        name: "Amazon",
        color: "#FF9900",
        json: include_str!("../fixtures/amazon.json"),
    },
    MerchantFixture {
        id: "walmart",
        name: "Walmart",
        color: "#0071CE",
        json: include_str!("../fixtures/walmart.json"),
    },
    MerchantFixture {
        id: "target",
        name: "Target",
        color: "#CC0000",
        json: include_str!("../fixtures/target.json"),
    },
    MerchantFixture {
        id: "doordash",
        name: "DoorDash",
        color: "#FF3008",
        json: include_str!("../fixtures/doordash.json"),
    },
    MerchantFixture {
        id: "costco",
        name: "Costco",
        color: "#0468B1",
        json: include_str!("../fixtures/costco.json"),
    },
    MerchantFixture {
        id: "ubereats",
        name: "Uber Eats",
        color: "#000000",
        json: include_str!("../fixtures/ubereats.json"),
    },
    MerchantFixture {
        id: "instacart",
        name: "Instacart",
        color: "#43B02A",
        json: include_str!("../fixtures/instacart.json"),
    },
];

/// Ids of every bundled merchant, in catalog order.
pub fn merchant_ids() -> impl Iterator<Item = &'static str> {
    MERCHANTS.iter().map(|m| m.id)
}

/// Parse the bundled catalog. Every merchant starts out connected.
pub fn load_catalog() -> Result<Vec<Merchant>> {
    MERCHANTS
        .iter()
        .map(|f| {
            let transactions: Vec<Transaction> = serde_json::from_str(f.json)
                .with_context(|| format!("parsing bundled fixture for merchant '{}'", f.id))?;
            Ok(Merchant {
                id: f.id.to_string(),
                name: f.name.to_string(),
                color: f.color.to_string(),
                connected: true,
                transactions,
            })
        })
        .collect()
}

#[async_trait]
pub trait TransactionSource {
    /// Up to `limit` transactions for `merchant_id`, newest first.
    async fn fetch(&self, merchant_id: &str, limit: usize) -> Result<Vec<Transaction>>;
    fn name(&self) -> &'static str;
}

/// Serves the bundled catalog after a fixed artificial latency.
pub struct MockSource {
    catalog: Vec<Merchant>,
    delay: Duration,
}

impl MockSource {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

    pub fn new(catalog: Vec<Merchant>) -> Self {
        Self {
            catalog,
            delay: Self::DEFAULT_DELAY,
        }
    }

    pub fn bundled() -> Result<Self> {
        Ok(Self::new(load_catalog()?))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl TransactionSource for MockSource {
    async fn fetch(&self, merchant_id: &str, limit: usize) -> Result<Vec<Transaction>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let merchant = self
            .catalog
            .iter()
            .find(|m| m.id == merchant_id)
            .ok_or_else(|| anyhow!("unknown merchant '{merchant_id}'"))?;

        let mut txs = merchant.transactions.clone();
        txs.sort_by(|a, b| b.date_time.cmp(&a.date_time));
        txs.truncate(limit);
        debug!(merchant = merchant_id, count = txs.len(), "mock source served transactions");
        Ok(txs)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
