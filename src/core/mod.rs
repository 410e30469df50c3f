pub mod cache;
pub mod corpus;
pub mod engine;
pub mod resolver;
pub mod rule_store;
pub mod similarity;

pub use crate::domain::model::{Classification, ClassificationRequest, Questions, TaxRule};
pub use crate::domain::ports::{CorpusDocument, RelevanceOracle, RuleSource};
pub use crate::utils::error::Result;
