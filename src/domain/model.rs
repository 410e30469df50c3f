use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single relief entry from the corpus. Identity is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxRule {
    pub profession: String,
    pub name: String,
    pub criteria: String,
}

impl TaxRule {
    pub fn new(
        profession: impl Into<String>,
        name: impl Into<String>,
        criteria: impl Into<String>,
    ) -> Self {
        Self {
            profession: profession.into(),
            name: name.into(),
            criteria: criteria.into(),
        }
    }
}

/// User questions, either free text or named sub-answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Questions {
    Text(String),
    Answers(BTreeMap<String, String>),
}

impl Questions {
    /// Sub-answers are joined with single spaces in ascending key order.
    pub fn joined(&self) -> String {
        match self {
            Questions::Text(text) => text.clone(),
            Questions::Answers(answers) => answers
                .values()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl From<&str> for Questions {
    fn from(text: &str) -> Self {
        Questions::Text(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub sequence: String,
    pub candidate_labels: Vec<String>,
    pub multi_label: bool,
    pub hypothesis_template: Option<String>,
}

/// Oracle output. `labels[i]` is the label that `scores[i]` belongs to; the
/// order is whatever the oracle chose and must not be assumed to match the
/// request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub labels: Vec<String>,
    pub scores: Vec<f32>,
}
