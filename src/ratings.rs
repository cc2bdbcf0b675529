//! Static brand-level sustainability ratings (1–5), independent of the
//! transaction-derived score. Joined to merchants by case-insensitive name.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::model::Merchant;

/// Title/description/colour for one rating level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatingInfo {
    pub level: u8,
    pub title: &'static str,
    pub description: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantRating {
    pub id: u32,
    pub name: &'static str,
    pub sustainability_score: u8,
    pub title: &'static str,
    pub description: &'static str,
    pub color: &'static str,
}

const LEVELS: [RatingInfo; 5] = [
    RatingInfo {
        level: 1,
        title: "Avoid if You Can",
        description: "Made from non-renewable, non-recycled, non-biodegradable materials.",
        color: "from-red-500 to-rose-600",
    },
    RatingInfo {
        level: 2,
        title: "Some Problems Here",
        description: "Minimal effort towards sustainability, mostly non-renewable materials.",
        color: "from-orange-500 to-red-500",
    },
    RatingInfo {
        level: 3,
        title: "It's a Start",
        description: "Some effort towards sustainable materials but overall impact is negligible.",
        color: "from-yellow-400 to-orange-400",
    },
    RatingInfo {
        level: 4,
        title: "Pretty Good",
        description: "Made from majority sustainable, recycled materials, or partly biodegradable.",
        color: "from-green-400 to-emerald-500",
    },
    RatingInfo {
        level: 5,
        title: "Great",
        description: "Made from 100% sustainably grown, recycled, or biodegradable materials with recognized certifications.",
        color: "from-emerald-500 to-green-600",
    },
];

const CATALOG: &[(u32, &str, u8)] = &[
    (4, "Max", 3),
    (7, "Best Buy", 2),
    (8, "Disney+", 3),
    (10, "Uber", 2),
    (16, "Netflix", 3),
    (18, "Hulu", 3),
    (19, "DoorDash", 2),
    (20, "Domino's", 2),
    (23, "Peacock", 3),
    (25, "YouTube TV", 3),
    (27, "Audible", 4),
    (29, "DIRECTV", 2),
    (30, "Prime Video", 3),
    (31, "Crunchyroll", 3),
    (32, "Amazon Music", 3),
    (36, "Uber Eats", 2),
    (37, "Postmates", 2),
    (39, "Seamless", 2),
    (42, "Lyft", 3),
    (44, "Amazon", 2),
    (48, "Macy's", 3),
    (58, "Chewy", 3),
    (59, "eBay", 4),
    (60, "Apple", 4),
    (129, "Google", 4),
    (175, "Microsoft", 4),
    (386, "Burger King", 1),
    (615, "Dell", 3),
    (625, "Dollar General", 2),
    (898, "Caviar", 3),
    (976, "The New York Times", 4),
    (987, "YouTube Premium", 3),
    (991, "Apple TV+", 4),
    (2125, "Shop Pay", 3),
    (2126, "Prime", 2),
    (2131, "STARZ", 3),
    (2264, "Bloomingdale's", 3),
    (2322, "YouTube", 3),
    (2325, "7-Eleven", 1),
];

static RATINGS: Lazy<Vec<MerchantRating>> = Lazy::new(|| {
    CATALOG
        .iter()
        .map(|&(id, name, level)| {
            let info = rating_info(level);
            MerchantRating {
                id,
                name,
                sustainability_score: info.level,
                title: info.title,
                description: info.description,
                color: info.color,
            }
        })
        .collect()
});

/// Info for a rating level; out-of-range levels resolve to level 3.
pub fn rating_info(level: u8) -> RatingInfo {
    match level {
        1..=5 => LEVELS[(level - 1) as usize],
        _ => LEVELS[2],
    }
}

pub fn all() -> &'static [MerchantRating] {
    &RATINGS
}

pub fn by_id(id: u32) -> Option<&'static MerchantRating> {
    RATINGS.iter().find(|r| r.id == id)
}

pub fn by_name(name: &str) -> Option<&'static MerchantRating> {
    let wanted = name.trim();
    RATINGS.iter().find(|r| r.name.eq_ignore_ascii_case(wanted))
}

pub fn for_merchant(merchant: &Merchant) -> Option<&'static MerchantRating> {
    by_name(&merchant.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_complete_and_in_range() {
        assert_eq!(all().len(), 39);
        assert!(all().iter().all(|r| (1..=5).contains(&r.sustainability_score)));
    }

    #[test]
    fn lookup_by_name_ignores_case() {
        let r = by_name("uber eats").unwrap();
        assert_eq!(r.id, 36);
        assert_eq!(r.sustainability_score, 2);
        assert_eq!(r.title, "Some Problems Here");
        assert!(by_name("Walmart").is_none());
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(by_id(2325).unwrap().name, "7-Eleven");
        assert!(by_id(1).is_none());
    }

    #[test]
    fn unknown_level_falls_back_to_three() {
        assert_eq!(rating_info(0).title, "It's a Start");
        assert_eq!(rating_info(9).level, 3);
        assert_eq!(rating_info(5).title, "Great");
    }
}
