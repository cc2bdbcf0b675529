//! Shopping-category inference used as a hint for AI batch scoring.

use super::rules::{contains_any, normalize};

pub const OTHER: &str = "Other";

/// Ordered (category, keywords) table; first hit wins.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Food & Groceries",
        &[
            "food", "grocery", "fruit", "vegetable", "meat", "dairy", "bread", "milk", "cheese", "egg",
            "organic", "snack", "cereal",
        ],
    ),
    (
        "Household & Cleaning",
        &["clean", "detergent", "soap", "tissue", "paper", "towel", "trash", "bag", "laundry", "dish"],
    ),
    (
        "Personal Care",
        &["shampoo", "deodorant", "toothpaste", "lotion", "cosmetic", "skincare", "beauty", "hygiene"],
    ),
    (
        "Electronics",
        &[
            "electronic", "phone", "computer", "laptop", "tablet", "camera", "charger", "cable", "headphone",
            "speaker",
        ],
    ),
    (
        "Clothing & Apparel",
        &["shirt", "pant", "dress", "shoe", "sock", "jacket", "coat", "clothing", "apparel", "fashion"],
    ),
    (
        "Home & Garden",
        &["furniture", "decor", "garden", "plant", "tool", "hardware", "bedding", "pillow", "curtain"],
    ),
    ("Baby & Kids", &["baby", "diaper", "formula", "toy", "kids", "children"]),
    ("Pet Supplies", &["pet", "dog", "cat", "animal", "treat"]),
    ("Books & Media", &["book", "magazine", "movie", "music", "dvd", "cd", "game"]),
];

pub fn infer_category(product_name: &str) -> &'static str {
    let text = normalize(product_name);
    CATEGORIES
        .iter()
        .find(|(_, keys)| contains_any(&text, keys))
        .map(|(cat, _)| *cat)
        .unwrap_or(OTHER)
}
