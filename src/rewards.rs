//! Rewards: coupon tiers and achievement badges unlocked by the overall score.
//!
//! Pure threshold tables, recomputed on every read. The evaluation date is
//! passed in so coupon expiry is deterministic.

use chrono::{Days, NaiveDate};
use serde::Serialize;

pub const COUPON_VALIDITY_DAYS: u64 = 30;

struct CouponTier {
    id: u32,
    min_score: u8,
    code: &'static str,
    title: &'static str,
    description: &'static str,
    discount: &'static str,
    merchants: &'static [&'static str],
}

const COUPON_TIERS: &[CouponTier] = &[
    CouponTier {
        id: 1,
        min_score: 50,
        code: "LEAFCART10",
        title: "10% Off Your Next Purchase",
        description: "Congratulations on reaching a sustainability score of 50+!",
        discount: "10% OFF",
        merchants: &["Amazon", "Walmart", "Target"],
    },
    CouponTier {
        id: 2,
        min_score: 60,
        code: "GREENLEAF15",
        title: "15% Off Eco-Friendly Products",
        description: "Amazing! Your score of 60+ unlocks this exclusive reward!",
        discount: "15% OFF",
        merchants: &["All Eco-Friendly Items"],
    },
    CouponTier {
        id: 3,
        min_score: 70,
        code: "ECOCHAMP20",
        title: "20% Off + Free Shipping",
        description: "Exceptional sustainability! You've earned our premium reward!",
        discount: "20% OFF",
        merchants: &["All Merchants"],
    },
    CouponTier {
        id: 4,
        min_score: 80,
        code: "SUSTAINHERO25",
        title: "25% Off Everything!",
        description: "You're a sustainability hero! Enjoy our highest reward!",
        discount: "25% OFF",
        merchants: &["All Merchants + Free Gift"],
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: u32,
    pub code: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub discount: &'static str,
    pub min_score: u8,
    pub merchants: Vec<&'static str>,
    pub expires_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: u32,
    pub title: &'static str,
    pub description: &'static str,
    pub earned: bool,
}

/// Inputs the achievement table looks at.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RewardProgress {
    pub overall_score: u8,
    pub transactions: usize,
    pub total_spent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rewards {
    pub overall_score: u8,
    pub headline: &'static str,
    pub next_reward: Option<&'static str>,
    pub coupons: Vec<Coupon>,
    pub achievements: Vec<Achievement>,
}

/// Every coupon tier whose threshold `score` reaches, lowest tier first.
pub fn coupons_for(score: u8, today: NaiveDate) -> Vec<Coupon> {
    let expires_on = today
        .checked_add_days(Days::new(COUPON_VALIDITY_DAYS))
        .unwrap_or(NaiveDate::MAX);
    COUPON_TIERS
        .iter()
        .filter(|t| score >= t.min_score)
        .map(|t| Coupon {
            id: t.id,
            code: t.code,
            title: t.title,
            description: t.description,
            discount: t.discount,
            min_score: t.min_score,
            merchants: t.merchants.to_vec(),
            expires_on,
        })
        .collect()
}

pub fn achievements_for(p: &RewardProgress) -> Vec<Achievement> {
    let badge = |id, title, description, earned| Achievement {
        id,
        title,
        description,
        earned,
    };
    vec![
        badge(1, "First Steps", "Made your first sustainable purchase", p.transactions >= 1),
        badge(2, "Eco Warrior", "Reached sustainability score of 50+", p.overall_score >= 50),
        badge(3, "Green Champion", "Reached sustainability score of 70+", p.overall_score >= 70),
        badge(4, "Planet Protector", "Reached sustainability score of 80+", p.overall_score >= 80),
        badge(5, "Shopping Streak", "Made 10+ sustainable purchases", p.transactions >= 10),
        badge(6, "Eco Spender", "Spent $500+ on sustainable products", p.total_spent >= 500.0),
    ]
}

pub fn headline(score: u8) -> &'static str {
    match score {
        80.. => "Outstanding! You're a sustainability champion!",
        70..=79 => "Excellent work! Keep it up!",
        60..=69 => "Great progress! You're making a difference!",
        50..=59 => "Good start! Keep improving!",
        _ => "Start your journey to unlock rewards!",
    }
}

/// Hint for the next locked tier; `None` once every tier is unlocked.
pub fn next_reward(score: u8) -> Option<&'static str> {
    match score {
        80.. => None,
        70..=79 => Some("Reach a score of 80 to unlock 25% off everything!"),
        60..=69 => Some("Reach a score of 70 to unlock 20% off + free shipping!"),
        50..=59 => Some("Reach a score of 60 to unlock 15% off eco-friendly products!"),
        _ => Some("Reach a score of 50 to unlock your first coupon (10% off)!"),
    }
}

pub fn evaluate(progress: &RewardProgress, today: NaiveDate) -> Rewards {
    Rewards {
        overall_score: progress.overall_score,
        headline: headline(progress.overall_score),
        next_reward: next_reward(progress.overall_score),
        coupons: coupons_for(progress.overall_score, today),
        achievements: achievements_for(progress),
    }
}
