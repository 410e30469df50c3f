use clap::Parser;
use relief_finder::utils::error::{ErrorSeverity, ReliefError};
use relief_finder::utils::{logger, validation::Validate};
use relief_finder::{
    CliConfig, HttpOracle, LocalRuleDirectory, ProfessionResolver, RecommendationEngine,
    ReliefConfig, RuleStore,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct RecommendationReport {
    profession: String,
    resolved_profession: Option<String>,
    match_strategy: Option<&'static str>,
    recommendations: Vec<String>,
    generated_at: chrono::DateTime<chrono::Utc>,
}

fn exit_code(e: &ReliefError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: &ReliefError) -> ! {
    tracing::error!(
        "❌ {} (Kind: {:?}, Severity: {:?})",
        e,
        e.kind(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(e));
}

fn build_oracle(config: &ReliefConfig) -> Result<HttpOracle, ReliefError> {
    let token = config.oracle.api_token().map(str::to_string);
    if config.oracle.timeout_seconds > 0 {
        HttpOracle::with_timeout(&config.oracle.endpoint, token, config.oracle.timeout())
    } else {
        Ok(HttpOracle::new(&config.oracle.endpoint, token))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting relief-finder CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證參數與配置
    let config = match cli.validate().and_then(|_| cli.load_config()) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    if let Err(e) = config.validate() {
        fail(&e);
    }
    let questions = match cli.questions() {
        Ok(questions) => questions,
        Err(e) => fail(&e),
    };

    let resolver = match ProfessionResolver::new(config.catalog()) {
        Ok(resolver) => resolver,
        Err(e) => fail(&e),
    };

    let source =
        LocalRuleDirectory::with_suffix(&config.corpus.directory, &config.corpus.file_suffix);
    let store = Arc::new(RuleStore::with_cache_capacity(
        source,
        config.corpus.rule_cache_capacity,
    ));

    // 啟動時預先載入規則，失敗則直接結束
    if config.corpus.eager_load {
        if let Err(e) = store.warm_up().await {
            fail(&e);
        }
        tracing::info!("📚 Tax rules loaded from {}", config.corpus.directory);
    }

    let oracle = match build_oracle(&config) {
        Ok(oracle) => oracle,
        Err(e) => fail(&e),
    };
    let engine = RecommendationEngine::new(store, resolver, oracle, config.engine_settings());

    let recommendations = match engine.recommend_questions(&cli.profession, &questions).await {
        Ok(recommendations) => recommendations,
        Err(e) => fail(&e),
    };

    if cli.json {
        let resolution = engine.resolve_profession(&cli.profession).await.ok();
        let report = RecommendationReport {
            profession: cli.profession.clone(),
            resolved_profession: resolution
                .as_ref()
                .filter(|r| r.is_resolved())
                .map(|r| r.label.clone()),
            match_strategy: resolution.as_ref().map(|r| r.strategy.name()),
            recommendations,
            generated_at: chrono::Utc::now(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in &recommendations {
            println!("{}", line);
        }
    }

    Ok(())
}
