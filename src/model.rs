//! Value records shared by the classifier, aggregator and cache.
//!
//! Field names serialize in camelCase so the bundled merchant fixtures and the
//! persisted cache entry keep the same JSON shape the dashboard reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Price block attached to a single product line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPrice {
    #[serde(default)]
    pub sub_total: f64,
    pub total: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub unit_price: f64,
}

/// One purchased product line. Owned exclusively by its transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub external_id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "one")]
    pub quantity: u32,
    pub price: ProductPrice,
    #[serde(default)]
    pub eligibility: Vec<String>,
}

/// Order status as reported by the merchant feed.
///
/// Unknown strings are kept verbatim in `Other` so a fixture round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Ordered,
    Delivered,
    Other(String),
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "ORDERED" => OrderStatus::Ordered,
            "DELIVERED" => OrderStatus::Delivered,
            _ => OrderStatus::Other(raw),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Ordered => "ORDERED".to_string(),
            OrderStatus::Delivered => "DELIVERED".to_string(),
            OrderStatus::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    #[serde(default)]
    pub external_id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub last_four: String,
    #[serde(default)]
    pub transaction_amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAdjustment {
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPrice {
    #[serde(default)]
    pub sub_total: f64,
    #[serde(default)]
    pub adjustments: Vec<PriceAdjustment>,
    pub total: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

/// A single order. Owned by exactly one merchant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub external_id: String,
    pub date_time: DateTime<Utc>,
    #[serde(default)]
    pub url: String,
    pub order_status: OrderStatus,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethod>,
    pub price: TransactionPrice,
    #[serde(default)]
    pub products: Vec<Product>,
}

/// Aggregate root: a merchant and the transactions loaded for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    pub id: String,
    pub name: String,
    /// Display colour hint, e.g. `#FF9900`.
    pub color: String,
    pub connected: bool,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// Five sub-scores behind a product score, each in [0,100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SustainabilityFactors {
    pub materials: u8,
    pub packaging: u8,
    pub durability: u8,
    pub recyclability: u8,
    pub carbon_footprint: u8,
}

impl SustainabilityFactors {
    pub const fn new(
        materials: u8,
        packaging: u8,
        durability: u8,
        recyclability: u8,
        carbon_footprint: u8,
    ) -> Self {
        Self {
            materials,
            packaging,
            durability,
            recyclability,
            carbon_footprint,
        }
    }

    /// Every factor set to the same value.
    pub const fn uniform(value: u8) -> Self {
        Self::new(value, value, value, value, value)
    }

    /// Build from signed values, clamping each into [0,100].
    pub fn clamped(
        materials: i32,
        packaging: i32,
        durability: i32,
        recyclability: i32,
        carbon_footprint: i32,
    ) -> Self {
        Self::new(
            clamp_score(materials),
            clamp_score(packaging),
            clamp_score(durability),
            clamp_score(recyclability),
            clamp_score(carbon_footprint),
        )
    }
}

/// Sustainability verdict for one product name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductScore {
    pub product_name: String,
    pub score: u8,
    pub reasoning: String,
    pub category: String,
    #[serde(rename = "sustainabilityFactors")]
    pub factors: SustainabilityFactors,
    /// Classifier rule (or fallback bucket) that produced this score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

/// Per-transaction slice of the aggregate bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredTransaction {
    pub transaction_id: String,
    pub merchant_name: String,
    pub products: Vec<ProductScore>,
    pub transaction_score: u8,
    pub total_amount: f64,
    pub date: DateTime<Utc>,
}

/// Output of scoring every included transaction; this is what the cache stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBundle {
    pub scored_transactions: Vec<ScoredTransaction>,
    pub overall_score: u8,
    pub product_scores: Vec<ProductScore>,
}

/// Derived score plus the counts it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScoreAggregate {
    pub score: u8,
    pub counted_transactions: usize,
    pub counted_products: usize,
}

/// Clamp any signed score into the [0,100] range used by product scores.
pub fn clamp_score(value: i32) -> u8 {
    value.clamp(0, 100) as u8
}

fn default_currency() -> String {
    "USD".to_string()
}

fn one() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transaction_parses_fixture_shape() {
        let raw = json!({
            "externalId": "A-100",
            "dateTime": "2025-09-30T18:22:10Z",
            "url": "https://example.com/orders/A-100",
            "orderStatus": "DELIVERED",
            "paymentMethods": [
                {"externalId": "pm1", "type": "CARD", "brand": "VISA", "lastFour": "4242", "transactionAmount": "12.50"}
            ],
            "price": {"subTotal": 11.0, "adjustments": [{"type": "TAX", "label": "Tax", "amount": 1.5}], "total": 12.5, "currency": "USD"},
            "products": [
                {"externalId": "p1", "name": "Bamboo Toothbrush", "url": "", "quantity": 2,
                 "price": {"subTotal": 11.0, "total": 11.0, "currency": "USD", "unitPrice": 5.5},
                 "eligibility": []}
            ]
        });

        let t: Transaction = serde_json::from_value(raw).unwrap();
        assert_eq!(t.order_status, OrderStatus::Delivered);
        assert_eq!(t.products.len(), 1);
        assert_eq!(t.products[0].quantity, 2);
        assert_eq!(t.payment_methods[0].kind, "CARD");
        assert!((t.price.total - 12.5).abs() < 1e-9);
    }

    #[test]
    fn unknown_status_is_preserved() {
        let s: OrderStatus = serde_json::from_value(json!("SHIPPED")).unwrap();
        assert_eq!(s, OrderStatus::Other("SHIPPED".into()));
        assert_eq!(serde_json::to_value(&s).unwrap(), json!("SHIPPED"));

        let s: OrderStatus = serde_json::from_value(json!("ordered")).unwrap();
        assert_eq!(s, OrderStatus::Ordered);
    }

    #[test]
    fn factors_clamp_out_of_range_values() {
        let f = SustainabilityFactors::clamped(105, -3, 50, 100, 0);
        assert_eq!(f, SustainabilityFactors::new(100, 0, 50, 100, 0));
    }

    #[test]
    fn product_score_uses_dashboard_field_names() {
        let s = ProductScore {
            product_name: "Organic Apples".into(),
            score: 85,
            reasoning: "r".into(),
            category: "Organic".into(),
            factors: SustainabilityFactors::uniform(50),
            rule: None,
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["productName"], json!("Organic Apples"));
        assert_eq!(v["sustainabilityFactors"]["carbonFootprint"], json!(50));
        assert!(v.get("rule").is_none());
    }
}
