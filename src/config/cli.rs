use crate::config::toml_config::ReliefConfig;
use crate::config::CliConfig;
use crate::domain::model::Questions;
use crate::utils::error::{ReliefError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use std::collections::BTreeMap;

impl CliConfig {
    /// Free text wins over `--answer` pairs; one of the two is required.
    pub fn questions(&self) -> Result<Questions> {
        if let Some(text) = &self.questions {
            return Ok(Questions::Text(text.clone()));
        }

        if self.answers.is_empty() {
            return Err(ReliefError::MissingConfigError {
                field: "questions".to_string(),
            });
        }

        let mut answers = BTreeMap::new();
        for pair in &self.answers {
            let (key, value) =
                pair.split_once('=')
                    .ok_or_else(|| ReliefError::InvalidConfigValueError {
                        field: "answer".to_string(),
                        value: pair.clone(),
                        reason: "Expected KEY=VALUE".to_string(),
                    })?;
            answers.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(Questions::Answers(answers))
    }

    /// Loads the config file (or defaults) and applies command-line overrides.
    pub fn load_config(&self) -> Result<ReliefConfig> {
        let mut config = match &self.config {
            Some(path) => ReliefConfig::from_file(path)?,
            None => ReliefConfig::default(),
        };

        if let Some(directory) = &self.corpus_dir {
            config.corpus.directory = directory.clone();
        }
        if let Some(endpoint) = &self.oracle_endpoint {
            config.oracle.endpoint = endpoint.clone();
        }

        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("profession", &self.profession)?;
        let questions = self.questions()?;
        validate_non_empty_string("questions", &questions.joined())
    }
}
