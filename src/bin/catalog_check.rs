use anyhow::{bail, Context, Result};
use clap::Parser;
use relief_finder::core::corpus::Corpus;
use relief_finder::utils::logger;
use relief_finder::{LocalRuleDirectory, ProfessionCatalog, ReliefConfig, RuleStore};

#[derive(Parser)]
#[command(name = "catalog_check")]
#[command(about = "Check the profession catalog against the tax rule corpus")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Override [corpus].directory
    #[arg(long)]
    corpus_dir: Option<String>,

    /// Treat catalog entries missing from the corpus as errors
    #[arg(long)]
    strict: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Default)]
struct CatalogReport {
    members_missing: Vec<(String, String)>,
    aliases_missing: Vec<String>,
    ungrouped: Vec<String>,
}

impl CatalogReport {
    fn build(catalog: &ProfessionCatalog, corpus: &Corpus) -> Self {
        let known = corpus.professions();
        let mut report = Self::default();

        for group in &catalog.groups {
            for member in &group.members {
                if known.find_ignore_case(member).is_none() {
                    report
                        .members_missing
                        .push((group.name.clone(), member.clone()));
                }
            }
        }

        for alias in &catalog.aliases {
            if known.find_ignore_case(&alias.canonical).is_none() {
                report.aliases_missing.push(alias.canonical.clone());
            }
        }

        let members = catalog.all_members();
        for label in known.labels() {
            if !members.iter().any(|m| m.eq_ignore_ascii_case(label)) {
                report.ungrouped.push(label.clone());
            }
        }

        report
    }

    fn has_gaps(&self) -> bool {
        !self.members_missing.is_empty() || !self.aliases_missing.is_empty()
    }

    fn print(&self) {
        println!("📋 Catalog check:");
        println!("  Group members missing from corpus: {}", self.members_missing.len());
        for (group, member) in &self.members_missing {
            println!("    - {} ({})", member, group);
        }
        println!("  Alias targets missing from corpus: {}", self.aliases_missing.len());
        for canonical in &self.aliases_missing {
            println!("    - {}", canonical);
        }
        println!("  Corpus professions outside every group: {}", self.ungrouped.len());
        for label in &self.ungrouped {
            println!("    - {}", label);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let mut config = match &args.config {
        Some(path) => ReliefConfig::from_file(path)
            .with_context(|| format!("Failed to load config file '{}'", path))?,
        None => ReliefConfig::default(),
    };
    if let Some(directory) = args.corpus_dir {
        config.corpus.directory = directory;
    }

    // 別名衝突是設定錯誤，必須先處理
    let catalog = config.catalog();
    catalog.validate().context("Profession catalog is invalid")?;

    let store = RuleStore::new(LocalRuleDirectory::with_suffix(
        &config.corpus.directory,
        &config.corpus.file_suffix,
    ));
    let corpus = store
        .corpus()
        .await
        .with_context(|| format!("Failed to load tax rules from '{}'", config.corpus.directory))?;

    let report = CatalogReport::build(&catalog, &corpus);
    report.print();

    if args.strict && report.has_gaps() {
        bail!("Catalog refers to professions that are not in the corpus");
    }

    println!("✅ Catalog is consistent");
    Ok(())
}
