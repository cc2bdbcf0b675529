//! Single-user session: who is signed in and which merchants they linked.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fixtures;
use crate::model::Merchant;

pub const TEST_USER_ID: &str = "test-user-001";
pub const TEST_USER_EMAIL: &str = "user@example.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub connected_merchants: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            connected_merchants: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    /// The demo user, linked to every bundled merchant.
    pub fn test_user() -> Self {
        let mut s = Self::new(TEST_USER_ID, TEST_USER_EMAIL);
        for id in fixtures::merchant_ids() {
            s.connect(id);
        }
        s
    }

    /// Returns false if the merchant was already connected.
    pub fn connect(&mut self, merchant_id: &str) -> bool {
        self.connected_merchants.insert(merchant_id.to_string())
    }

    /// Returns false if the merchant was not connected.
    pub fn disconnect(&mut self, merchant_id: &str) -> bool {
        self.connected_merchants.remove(merchant_id)
    }

    pub fn is_connected(&self, merchant_id: &str) -> bool {
        self.connected_merchants.contains(merchant_id)
    }

    /// Merchants flagged connected in the catalog and linked in this session,
    /// in catalog order.
    pub fn connected_merchants<'a>(&self, catalog: &'a [Merchant]) -> Vec<&'a Merchant> {
        catalog
            .iter()
            .filter(|m| m.connected && self.is_connected(&m.id))
            .collect()
    }
}
