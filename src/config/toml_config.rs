use crate::adapters::local::DEFAULT_RULE_FILE_SUFFIX;
use crate::core::engine::{
    EngineSettings, Expansion, ThresholdPolicy, DEFAULT_ADAPTIVE_MULTIPLIER,
    DEFAULT_HYPOTHESIS_TEMPLATE, DEFAULT_THRESHOLD,
};
use crate::core::rule_store::DEFAULT_RULE_CACHE_CAPACITY;
use crate::domain::catalog::ProfessionCatalog;
use crate::utils::error::{ReliefError, Result};
use crate::utils::validation::{
    validate_hypothesis_template, validate_non_empty_string, validate_path,
    validate_positive_number, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ORACLE_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-mnli";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReliefConfig {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    /// Replaces the built-in profession catalog when present.
    pub professions: Option<ProfessionCatalog>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub directory: String,
    pub file_suffix: String,
    pub eager_load: bool,
    pub rule_cache_capacity: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            directory: "data/tax_rules".to_string(),
            file_suffix: DEFAULT_RULE_FILE_SUFFIX.to_string(),
            eager_load: true,
            rule_cache_capacity: DEFAULT_RULE_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub endpoint: String,
    pub api_token: Option<String>,
    pub timeout_seconds: u64,
    pub hypothesis_template: Option<String>,
    pub multi_label: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ORACLE_ENDPOINT.to_string(),
            api_token: None,
            timeout_seconds: 30,
            hypothesis_template: Some(DEFAULT_HYPOTHESIS_TEMPLATE.to_string()),
            multi_label: true,
        }
    }
}

impl OracleConfig {
    /// The token, unless empty or an unsubstituted `${VAR}` placeholder.
    pub fn api_token(&self) -> Option<&str> {
        self.api_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && !t.starts_with("${"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPolicyKind {
    #[default]
    Fixed,
    Adaptive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub threshold_policy: ThresholdPolicyKind,
    /// Fixed threshold, or the ceiling of the adaptive one.
    pub threshold: f32,
    pub adaptive_multiplier: f32,
    pub include_confidence: bool,
    pub introduction: bool,
    pub expansion: Expansion,
    pub result_cache_capacity: usize,
    pub oracle_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold_policy: ThresholdPolicyKind::Fixed,
            threshold: DEFAULT_THRESHOLD,
            adaptive_multiplier: DEFAULT_ADAPTIVE_MULTIPLIER,
            include_confidence: true,
            introduction: true,
            expansion: Expansion::None,
            result_cache_capacity: 1024,
            oracle_cache_capacity: 1024,
        }
    }
}

impl ReliefConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ReliefError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ReliefError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${HF_API_TOKEN})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ReliefError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn threshold_policy(&self) -> ThresholdPolicy {
        match self.engine.threshold_policy {
            ThresholdPolicyKind::Fixed => ThresholdPolicy::Fixed {
                threshold: self.engine.threshold,
            },
            ThresholdPolicyKind::Adaptive => ThresholdPolicy::Adaptive {
                ceiling: self.engine.threshold,
                multiplier: self.engine.adaptive_multiplier,
            },
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            threshold_policy: self.threshold_policy(),
            include_confidence: self.engine.include_confidence,
            introduction: self.engine.introduction,
            expansion: self.engine.expansion,
            multi_label: self.oracle.multi_label,
            hypothesis_template: self.oracle.hypothesis_template.clone(),
            oracle_timeout: (self.oracle.timeout_seconds > 0).then(|| self.oracle.timeout()),
            result_cache_capacity: self.engine.result_cache_capacity,
            oracle_cache_capacity: self.engine.oracle_cache_capacity,
        }
    }

    pub fn catalog(&self) -> ProfessionCatalog {
        self.professions.clone().unwrap_or_default()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_path("corpus.directory", &self.corpus.directory)?;
        validate_non_empty_string("corpus.file_suffix", &self.corpus.file_suffix)?;
        validate_positive_number("corpus.rule_cache_capacity", self.corpus.rule_cache_capacity, 1)?;

        validate_url("oracle.endpoint", &self.oracle.endpoint)?;
        if let Some(template) = &self.oracle.hypothesis_template {
            validate_hypothesis_template("oracle.hypothesis_template", template)?;
        }

        validate_range("engine.threshold", self.engine.threshold, 0.0, 1.0)?;
        if self.engine.threshold_policy == ThresholdPolicyKind::Adaptive {
            validate_range(
                "engine.adaptive_multiplier",
                self.engine.adaptive_multiplier,
                0.0,
                10.0,
            )?;
        }
        validate_positive_number(
            "engine.result_cache_capacity",
            self.engine.result_cache_capacity,
            1,
        )?;
        validate_positive_number(
            "engine.oracle_cache_capacity",
            self.engine.oracle_cache_capacity,
            1,
        )?;

        if let Some(catalog) = &self.professions {
            catalog.validate()?;
        }

        Ok(())
    }
}

impl Validate for ReliefConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ReliefConfig::from_toml_str("").unwrap();

        assert_eq!(config.corpus.directory, "data/tax_rules");
        assert_eq!(config.corpus.file_suffix, "_rules.json");
        assert_eq!(config.oracle.endpoint, DEFAULT_ORACLE_ENDPOINT);
        assert_eq!(
            config.threshold_policy(),
            ThresholdPolicy::Fixed { threshold: 0.3 }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[corpus]
directory = "./rules"
eager_load = false

[oracle]
endpoint = "http://localhost:8080/classify"
timeout_seconds = 5
multi_label = false

[engine]
threshold_policy = "adaptive"
threshold = 0.25
adaptive_multiplier = 2.0
include_confidence = false
expansion = "related_categories"

[[professions.groups]]
name = "Hospitality"
members = ["Chef", "Waiter"]

[[professions.aliases]]
canonical = "Chef"
synonyms = ["cook"]
"#;

        let config = ReliefConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.corpus.directory, "./rules");
        assert!(!config.corpus.eager_load);
        assert_eq!(config.corpus.file_suffix, "_rules.json");

        let settings = config.engine_settings();
        assert_eq!(
            settings.threshold_policy,
            ThresholdPolicy::Adaptive {
                ceiling: 0.25,
                multiplier: 2.0
            }
        );
        assert!(!settings.include_confidence);
        assert!(!settings.multi_label);
        assert_eq!(settings.expansion, Expansion::RelatedCategories);
        assert_eq!(settings.oracle_timeout, Some(Duration::from_secs(5)));

        let catalog = config.catalog();
        assert_eq!(catalog.groups.len(), 1);
        assert_eq!(catalog.aliases[0].synonyms, vec!["cook"]);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("RELIEF_TEST_TOKEN", "hf_abc123");

        let toml_content = r#"
[oracle]
api_token = "${RELIEF_TEST_TOKEN}"
"#;
        let config = ReliefConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.oracle.api_token(), Some("hf_abc123"));

        std::env::remove_var("RELIEF_TEST_TOKEN");
    }

    #[test]
    fn test_unset_token_placeholder_is_ignored() {
        let toml_content = r#"
[oracle]
api_token = "${RELIEF_TEST_TOKEN_THAT_IS_NEVER_SET}"
"#;
        let config = ReliefConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.oracle.api_token(), None);
    }

    #[test]
    fn test_config_validation() {
        let bad_endpoint = ReliefConfig::from_toml_str(
            r#"
[oracle]
endpoint = "invalid-url"
"#,
        )
        .unwrap();
        assert!(bad_endpoint.validate().is_err());

        let bad_threshold = ReliefConfig::from_toml_str(
            r#"
[engine]
threshold = 1.5
"#,
        )
        .unwrap();
        assert!(bad_threshold.validate().is_err());

        let ambiguous = ReliefConfig::from_toml_str(
            r#"
[[professions.aliases]]
canonical = "Chef"
synonyms = ["cook"]

[[professions.aliases]]
canonical = "Kitchen Porter"
synonyms = ["Cook"]
"#,
        )
        .unwrap();
        assert!(matches!(
            ambiguous.validate(),
            Err(ReliefError::AmbiguousAliasError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[corpus]\ndirectory = \"/srv/rules\"\n")
            .unwrap();

        let config = ReliefConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.corpus.directory, "/srv/rules");
    }
}
