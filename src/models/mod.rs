pub mod config;
pub mod data;

pub use config::{
    ExpiryConfig, LineCriteria, LocatorConfig, MatchThresholds, VerifierConfig,
    TD3_LINE_LENGTH, TD3_TOTAL_LENGTH,
};
pub use data::*;
