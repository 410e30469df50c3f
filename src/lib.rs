pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::adapters::{HttpOracle, LocalRuleDirectory};
pub use crate::config::toml_config::ReliefConfig;
pub use crate::core::{
    engine::{EngineSettings, Expansion, RecommendationEngine, ThresholdPolicy},
    resolver::{MatchStrategy, ProfessionResolver, Resolution},
    rule_store::RuleStore,
};
pub use crate::domain::catalog::ProfessionCatalog;
pub use crate::domain::model::{Questions, TaxRule};
pub use crate::utils::error::{ReliefError, Result};
