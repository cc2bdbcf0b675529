// src/config/mod.rs
pub mod ai;
pub mod scoring;

pub use ai::{build_advisor, build_provider, AiConfig};
pub use scoring::ScoringConfig;
