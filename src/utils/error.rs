use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReliefError {
    #[error("Corpus location '{location}' is unreadable: {source}")]
    CorpusUnreadable {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corpus file '{file}' is not a valid rule array: {source}")]
    CorpusParseError {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Corpus file '{file}' entry #{index} is malformed: {reason}")]
    MalformedRule {
        file: String,
        index: usize,
        reason: String,
    },

    #[error("Oracle request failed: {0}")]
    OracleRequestError(#[from] reqwest::Error),

    #[error("Oracle responded with status {status}: {body}")]
    OracleStatusError { status: u16, body: String },

    #[error("Oracle did not respond within {after:?}")]
    OracleTimeout { after: Duration },

    #[error("Oracle response is unusable: {reason}")]
    OracleResponseError { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration field '{field}' is invalid: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field '{field}'")]
    MissingConfigError { field: String },

    #[error("Alias '{alias}' maps to both '{first}' and '{second}'")]
    AmbiguousAliasError {
        alias: String,
        first: String,
        second: String,
    },
}

/// Which part of the system an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    CorpusLoad,
    Oracle,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReliefError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReliefError::CorpusUnreadable { .. }
            | ReliefError::CorpusParseError { .. }
            | ReliefError::MalformedRule { .. } => ErrorKind::CorpusLoad,
            ReliefError::OracleRequestError(_)
            | ReliefError::OracleStatusError { .. }
            | ReliefError::OracleTimeout { .. }
            | ReliefError::OracleResponseError { .. } => ErrorKind::Oracle,
            ReliefError::ConfigError { .. }
            | ReliefError::ConfigValidationError { .. }
            | ReliefError::InvalidConfigValueError { .. }
            | ReliefError::MissingConfigError { .. }
            | ReliefError::AmbiguousAliasError { .. } => ErrorKind::Configuration,
            ReliefError::IoError(_) | ReliefError::SerializationError(_) => ErrorKind::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.kind() {
            // 評分服務可能只是暫時不可用
            ErrorKind::Oracle => ErrorSeverity::Medium,
            ErrorKind::Configuration => ErrorSeverity::High,
            ErrorKind::CorpusLoad | ErrorKind::System => ErrorSeverity::Critical,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ReliefError::OracleTimeout { .. } | ReliefError::OracleRequestError(_) => true,
            ReliefError::OracleStatusError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.kind() {
            ErrorKind::CorpusLoad => {
                "The tax relief rules could not be loaded.".to_string()
            }
            ErrorKind::Oracle => {
                "The relevance scoring service is currently unavailable.".to_string()
            }
            ErrorKind::Configuration => format!("The configuration is invalid: {}", self),
            ErrorKind::System => format!("An unexpected system error occurred: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ReliefError::CorpusUnreadable { .. } => {
                "Check that [corpus].directory exists and is readable"
            }
            ReliefError::CorpusParseError { .. } | ReliefError::MalformedRule { .. } => {
                "Fix the rule file so every entry has non-empty profession, name and criteria"
            }
            ReliefError::OracleTimeout { .. } => {
                "Increase [oracle].timeout_seconds or retry later"
            }
            ReliefError::OracleStatusError { status, .. } if *status == 401 || *status == 403 => {
                "Check [oracle].api_token"
            }
            ReliefError::OracleRequestError(_)
            | ReliefError::OracleStatusError { .. }
            | ReliefError::OracleResponseError { .. } => {
                "Check that [oracle].endpoint points at a zero-shot classification service"
            }
            ReliefError::AmbiguousAliasError { .. } => {
                "Keep each alias under exactly one canonical profession"
            }
            ReliefError::ConfigError { .. }
            | ReliefError::ConfigValidationError { .. }
            | ReliefError::InvalidConfigValueError { .. }
            | ReliefError::MissingConfigError { .. } => "Review the configuration file",
            ReliefError::IoError(_) | ReliefError::SerializationError(_) => {
                "Re-run with --verbose for details"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ReliefError>;
