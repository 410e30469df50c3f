// Adapters layer: concrete implementations of the domain ports (local rule files, HTTP oracle).

pub mod http_oracle;
pub mod local;

pub use http_oracle::HttpOracle;
pub use local::LocalRuleDirectory;
