// src/advice.rs
//! Offline advice that needs no model: swap hints for low scorers, a short
//! recommendation list, a score-band insight line and keyword chat replies.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::classify::rules::{contains_any, normalize};

/// Products at or above this score get no alternative hints.
pub const ALTERNATIVES_BELOW: u8 = 70;
pub const MAX_RECOMMENDATIONS: usize = 3;
const DEFAULT_BOOST: u8 = 25;

/// Concrete swap suggestions for a product scoring below 70.
pub fn alternatives(product_name: &str, score: u8) -> Vec<&'static str> {
    if score >= ALTERNATIVES_BELOW {
        return Vec::new();
    }
    let text = normalize(product_name);
    let mut out = Vec::new();

    if contains_any(&text, &["plastic"]) {
        out.push("Look for products made from bamboo, glass, or stainless steel");
        out.push("Consider reusable alternatives instead of single-use items");
    }
    if contains_any(&text, &["clean", "detergent"]) {
        out.push("Try eco-friendly cleaners with plant-based ingredients");
        out.push("Look for brands like Seventh Generation or Method");
    }
    if contains_any(&text, &["electronic"]) {
        out.push("Consider refurbished electronics to extend product lifecycle");
        out.push("Look for Energy Star certified devices");
    }
    if contains_any(&text, &["clothing", "apparel"]) {
        out.push("Choose organic cotton or recycled fabric clothing");
        out.push("Support sustainable fashion brands like Patagonia or Everlane");
    }
    if out.is_empty() {
        out.push("Look for products with eco-certifications (GOTS, FSC, Fair Trade)");
        out.push("Choose items with minimal or recyclable packaging");
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub product_name: String,
    pub current_score: u8,
    pub recommended_alternative: &'static str,
    pub alternative_score: u8,
    pub score_difference: u8,
    pub reason: &'static str,
}

struct Swap {
    replaces: &'static str,
    alternative: &'static str,
    boost: u8,
    reason: &'static str,
}

const SWAPS: &[Swap] = &[
    Swap {
        replaces: "conventional produce",
        alternative: "organic produce",
        boost: 40,
        reason: "Organic eliminates synthetic pesticides and is often locally sourced",
    },
    Swap {
        replaces: "imported fruit",
        alternative: "local seasonal fruit",
        boost: 35,
        reason: "Reduces transportation emissions significantly",
    },
    Swap {
        replaces: "conventional dairy",
        alternative: "grass-fed dairy",
        boost: 25,
        reason: "Better animal welfare and lower carbon footprint",
    },
    Swap {
        replaces: "packaged snacks",
        alternative: "bulk alternatives",
        boost: 20,
        reason: "Reduces packaging waste and often from sustainable sources",
    },
    Swap {
        replaces: "conventional almonds",
        alternative: "local nuts or seeds",
        boost: 15,
        reason: "Reduces water usage and transportation",
    },
];

/// One recommendation per product for the first three `(name, score)` pairs.
pub fn recommend<S: AsRef<str>>(low_scoring: &[(S, u8)]) -> Vec<Recommendation> {
    low_scoring
        .iter()
        .take(MAX_RECOMMENDATIONS)
        .map(|(name, score)| {
            let name = name.as_ref();
            let text = normalize(name);
            let (alternative, boost, reason) = SWAPS
                .iter()
                .find(|s| text.contains(s.replaces))
                .map(|s| (s.alternative, s.boost, s.reason))
                .unwrap_or((
                    "organic alternative",
                    DEFAULT_BOOST,
                    "Choose organic or locally-sourced versions when available",
                ));
            Recommendation {
                product_name: name.to_string(),
                current_score: *score,
                recommended_alternative: alternative,
                alternative_score: score.saturating_add(boost).min(100),
                score_difference: boost,
                reason,
            }
        })
        .collect()
}

pub fn insight(overall_score: u8) -> &'static str {
    match overall_score {
        80.. => "Excellent! You're making highly sustainable choices. Keep up the great work and inspire others!",
        65..=79 => "Good progress! Focus on the low-scoring items in your cart and consider sustainable alternatives.",
        50..=64 => "There's room for improvement. Try switching to organic, local, or fair-trade options for better impact.",
        _ => "Start small: pick one category (like produce) and commit to more sustainable choices this week.",
    }
}

// --- canned chat ---

static PRODUCT_IN_QUESTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:for|to|about|instead of)\s+(.+?)(?:\?|$)").unwrap());

const ALTERNATIVE_WORDS: &[&str] = &["alternative", "instead", "better", "replace", "substitute"];
const SCORE_WORDS: &[&str] = &["score", "rating", "how sustainable", "impact"];
const TIP_WORDS: &[&str] = &["tip", "advice", "help", "how to", "improve"];
const FARM_WORDS: &[&str] = &["farm", "where from", "origin", "local"];
const WATER_WORDS: &[&str] = &["water", "environmental impact", "carbon", "resources"];

const TIPS_REPLY: &str = "Here are practical ways to improve your sustainability:

1. Buy seasonal produce - reduces transportation emissions
2. Choose local farms over imported goods
3. Buy organic when possible (less water/pesticides)
4. Reduce meat consumption or choose grass-fed options
5. Buy in bulk to reduce packaging waste
6. Choose products with minimal or recyclable packaging
7. Support fair-trade certified products
8. Plan meals to reduce food waste

Start with one change this week!";

const FARMS_REPLY: &str = "Farm transparency matters! Look for:

• Local farms (lowest carbon footprint)
• Certified organic farms
• Regenerative agriculture practices
• Fair trade certifications
• Direct-to-consumer farms";

const WATER_REPLY: &str = "Water usage varies significantly by product:

HIGH water usage:
• Almonds: ~1.1 gallons per nut
• Meat & dairy: Significant water requirements
• Avocados: ~60 gallons per fruit

LOWER water usage:
• Leafy greens
• Beans and lentils
• Root vegetables
• Local seasonal produce

Reducing meat/dairy is one of the biggest water-saving changes!";

pub const DEFAULT_REPLY: &str = "I can help you with:
• Sustainable product alternatives
• Understanding your sustainability score
• Tips to improve your impact
• Information about farms and sourcing
• Environmental impact of different foods

What would you like to know?";

/// Keyword-matched reply used when no model is configured.
/// Topics are checked in order: alternatives, score, tips, farms, water.
pub fn canned_reply(message: &str, overall_score: Option<u8>) -> String {
    let text = normalize(message);

    if contains_any(&text, ALTERNATIVE_WORDS) {
        let product = PRODUCT_IN_QUESTION
            .captures(message.trim())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .unwrap_or("this product");
        return format!(
            "For \"{product}\", consider these sustainable alternatives:

• Buy from local farms or farmers markets
• Choose organic or fair-trade certified options
• Look for minimal or compostable packaging
• Buy in bulk to reduce packaging waste
• Check for certifications like USDA Organic or Rainforest Alliance

These options typically have scores 20-30 points higher!"
        );
    }
    if contains_any(&text, SCORE_WORDS) {
        let current = match overall_score {
            Some(s) => format!("Your current overall score is {s}. {}", insight(s)),
            None => "Connect a merchant to see your current score.".to_string(),
        };
        return format!(
            "Your sustainability score averages the scores of every product you bought. \
Each product is rated on materials, production, durability, recyclability and carbon footprint.

{current}"
        );
    }
    if contains_any(&text, TIP_WORDS) {
        return TIPS_REPLY.to_string();
    }
    if contains_any(&text, FARM_WORDS) {
        return FARMS_REPLY.to_string();
    }
    if contains_any(&text, WATER_WORDS) {
        return WATER_REPLY.to_string();
    }
    DEFAULT_REPLY.to_string()
}
