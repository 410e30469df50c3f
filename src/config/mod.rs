#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "relief-finder")]
#[command(about = "Recommend UK tax reliefs for a profession and a description of expenses")]
pub struct CliConfig {
    #[arg(long, short, help = "Profession or job title, e.g. \"Chef\"")]
    pub profession: String,

    #[arg(long, short, help = "Free-text description of expenses or questions")]
    pub questions: Option<String>,

    #[arg(
        long = "answer",
        value_name = "KEY=VALUE",
        help = "Named sub-answer, may be repeated; joined in key order"
    )]
    pub answers: Vec<String>,

    #[arg(long, short, help = "Path to a TOML configuration file")]
    pub config: Option<String>,

    #[arg(long, help = "Override [corpus].directory")]
    pub corpus_dir: Option<String>,

    #[arg(long, help = "Override [oracle].endpoint")]
    pub oracle_endpoint: Option<String>,

    #[arg(long, help = "Print the result as JSON")]
    pub json: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(long, short, help = "Enable verbose output")]
    pub verbose: bool,
}
