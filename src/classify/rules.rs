//! Ordered keyword rule table for product classification.
//!
//! Minimal JSON DSL for conditions over the product name (case-insensitive,
//! whitespace-condensed substring matching):
//! - `any_contains`:     match if ANY of the phrases appears (required)
//! - `and_any_contains`: additionally require ANY of these phrases
//! - `not_contains`:     match only if NONE of these phrases appear
//!
//! A matching rule binds to a `profile` (fixed score + factor bundle).
//! Rules are evaluated in order and the first match wins, so multi-keyword
//! rules ("organic" + "cotton") must come before the single-keyword ones.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::model::SustainabilityFactors;

/// Fixed verdict a rule resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub score: u8,
    pub reasoning: String,
    pub category: String,
    pub factors: SustainabilityFactors,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct When {
    pub any_contains: Option<Vec<String>>,
    pub and_any_contains: Option<Vec<String>>,
    pub not_contains: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub when: When,
    /// Id of the profile in the same table.
    pub profile: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    pub profiles: Vec<Profile>,
    pub rules: Vec<Rule>,
}

impl RuleTable {
    /// The shipped rule table.
    pub fn builtin() -> Self {
        let profiles = vec![
            profile("organic", 85, "Made from certified organic materials with minimal environmental impact", "Organic", (95, 75, 80, 85, 85)),
            profile("bamboo", 88, "Bamboo is highly renewable and biodegradable", "Sustainable Materials", (95, 80, 85, 90, 88)),
            profile("recycled", 82, "Made from recycled materials, reducing waste and resource consumption", "Recycled", (90, 75, 75, 95, 80)),
            profile("electronic", 45, "High energy consumption in production, contains rare earth metals, limited recyclability", "Electronics", (35, 40, 70, 35, 45)),
            profile("plastic", 25, "Made from non-renewable petroleum, not biodegradable, contributes to pollution", "Plastic", (15, 20, 50, 30, 20)),
            profile("single-use-plastic", 15, "Single-use plastic is highly wasteful and harmful to the environment", "Disposable", (10, 10, 5, 15, 10)),
            profile("fresh-produce", 75, "Minimal processing, biodegradable, often locally sourced", "Food", (80, 60, 50, 95, 85)),
            profile("processed-food", 40, "High processing energy, excessive packaging, long supply chains", "Food", (35, 30, 40, 40, 35)),
            profile("eco-friendly-cleaner", 78, "Plant-based ingredients, biodegradable, minimal chemical impact", "Cleaning", (85, 70, 75, 80, 78)),
            profile("chemical-cleaner", 35, "Contains harsh chemicals, plastic packaging, potential water pollution", "Cleaning", (30, 25, 60, 30, 35)),
            profile("organic-cotton", 80, "Certified organic cotton, sustainable farming practices, biodegradable", "Textiles", (90, 70, 80, 85, 75)),
            profile("fast-fashion", 25, "Low quality, synthetic materials, poor labor practices, high waste", "Clothing", (20, 25, 15, 25, 30)),
        ];

        let rules = vec![
            rule("organic-cotton", &["organic"], &["cotton"], &[], "organic-cotton"),
            rule("organic", &["organic"], &[], &[], "organic"),
            rule("bamboo", &["bamboo"], &[], &[], "bamboo"),
            rule("recycled", &["recycled", "recycle"], &[], &[], "recycled"),
            rule("eco-friendly", &["eco-friendly", "eco friendly"], &[], &[], "eco-friendly-cleaner"),
            rule("fresh-produce", &["fruit", "vegetable", "fresh", "produce"], &[], &[], "fresh-produce"),
            rule("processed-food", &["frozen", "packaged", "processed", "snack"], &[], &[], "processed-food"),
            rule(
                "electronics",
                &["phone", "computer", "laptop", "tablet", "electronic", "charger", "cable"],
                &[],
                &[],
                "electronic",
            ),
            rule(
                "single-use-plastic",
                &["disposable", "single-use", "plastic bag", "straw"],
                &[],
                &[],
                "single-use-plastic",
            ),
            rule("plastic", &["plastic"], &[], &["free"], "plastic"),
            rule(
                "chemical-cleaner",
                &["clean", "detergent", "soap"],
                &["chemical", "bleach", "toxic"],
                &[],
                "chemical-cleaner",
            ),
            rule("cleaner", &["clean", "detergent", "soap"], &[], &[], "eco-friendly-cleaner"),
            rule(
                "fast-fashion",
                &["shirt", "pant", "dress", "clothing", "apparel"],
                &["cheap", "fashion"],
                &[],
                "fast-fashion",
            ),
        ];

        Self { profiles, rules }
    }

    /// Check that every rule has a positive condition and points at a known profile.
    pub fn validate(&self) -> Result<()> {
        for p in &self.profiles {
            if p.score > 100 {
                bail!("profile '{}' has score {} outside [0,100]", p.id, p.score);
            }
        }
        for r in &self.rules {
            let has_terms = r.when.any_contains.as_ref().is_some_and(|v| !v.is_empty());
            if !has_terms {
                bail!("rule '{}' has no any_contains terms", r.name);
            }
            if self.profile(&r.profile).is_none() {
                bail!("rule '{}' references unknown profile '{}'", r.name, r.profile);
            }
        }
        Ok(())
    }

    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// First rule (in table order) whose condition holds for `name`.
    pub fn first_match(&self, name: &str) -> Option<(&Rule, &Profile)> {
        let text = normalize(name);
        self.rules
            .iter()
            .filter(|r| matches_when(&text, &r.when))
            .find_map(|r| self.profile(&r.profile).map(|p| (r, p)))
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

pub fn load_rules_file(path: &Path) -> Result<RuleTable> {
    let bytes =
        fs::read(path).with_context(|| format!("reading classifier rules from {}", path.display()))?;
    let table: RuleTable = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing classifier rules from {}", path.display()))?;
    table.validate()?;
    Ok(table)
}

/// True if any of `phrases` occurs in the already-normalized `text`.
pub(crate) fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| contains(text, p))
}

// --- internals ---

fn matches_when(text: &str, w: &When) -> bool {
    if let Some(v) = &w.any_contains {
        if !v.iter().any(|p| contains(text, p)) {
            return false;
        }
    }
    if let Some(v) = &w.and_any_contains {
        if !v.iter().any(|p| contains(text, p)) {
            return false;
        }
    }
    if let Some(v) = &w.not_contains {
        if v.iter().any(|p| contains(text, p)) {
            return false;
        }
    }
    true
}

fn contains(text: &str, pat: &str) -> bool {
    let p = normalize(pat);
    if p.is_empty() {
        return false;
    }
    text.contains(p.as_str())
}

/// Lowercase and condense whitespace runs to a single space.
pub(crate) fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.extend(ch.to_lowercase());
            last_space = false;
        }
    }
    out.trim().to_string()
}

fn profile(
    id: &str,
    score: u8,
    reasoning: &str,
    category: &str,
    (m, p, d, r, c): (u8, u8, u8, u8, u8),
) -> Profile {
    Profile {
        id: id.to_string(),
        score,
        reasoning: reasoning.to_string(),
        category: category.to_string(),
        factors: SustainabilityFactors::new(m, p, d, r, c),
    }
}

fn rule(name: &str, any: &[&str], and_any: &[&str], not: &[&str], profile: &str) -> Rule {
    fn opt(v: &[&str]) -> Option<Vec<String>> {
        (!v.is_empty()).then(|| v.iter().map(|s| s.to_string()).collect())
    }
    Rule {
        name: name.to_string(),
        when: When {
            any_contains: opt(any),
            and_any_contains: opt(and_any),
            not_contains: opt(not),
        },
        profile: profile.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_is_valid() {
        RuleTable::builtin().validate().unwrap();
    }

    #[test]
    fn conjunction_requires_both_groups() {
        let t = RuleTable::builtin();
        let (r, _) = t.first_match("Bleach Cleaning Spray").unwrap();
        assert_eq!(r.name, "chemical-cleaner");
        let (r, _) = t.first_match("Dish Soap").unwrap();
        assert_eq!(r.name, "cleaner");
    }

    #[test]
    fn exclusion_skips_rule() {
        let t = RuleTable::builtin();
        assert_eq!(t.first_match("Plastic Storage Box").unwrap().0.name, "plastic");
        assert!(t.first_match("BPA plastic free bottle").is_none());
    }

    #[test]
    fn case_and_whitespace_insensitive() {
        let t = RuleTable::builtin();
        let (r, _) = t.first_match("  PLASTIC \t BAG  roll").unwrap();
        assert_eq!(r.name, "single-use-plastic");
    }

    #[test]
    fn validate_rejects_unknown_profile() {
        let mut t = RuleTable::builtin();
        t.rules[0].profile = "nope".into();
        assert!(t.validate().is_err());
    }

    #[test]
    fn validate_rejects_rule_without_terms() {
        let mut t = RuleTable::builtin();
        t.rules[1].when = When::default();
        assert!(t.validate().is_err());
    }

    #[test]
    fn table_round_trips_through_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let mut t = RuleTable::builtin();
        t.rules.truncate(2);
        fs::write(&path, serde_json::to_vec(&t).unwrap()).unwrap();

        let loaded = load_rules_file(&path).unwrap();
        assert_eq!(loaded, t);
    }
}
