use crate::domain::model::TaxRule;
use crate::domain::ports::CorpusDocument;
use crate::utils::error::{ReliefError, Result};
use serde_json::Value;
use std::collections::HashMap;

const REQUIRED_FIELDS: [&str; 3] = ["profession", "name", "criteria"];

/// Distinct profession labels in corpus load order.
#[derive(Debug, Clone, Default)]
pub struct ProfessionIndex {
    labels: Vec<String>,
    by_lowercase: HashMap<String, usize>,
}

impl ProfessionIndex {
    pub fn from_rules(rules: &[TaxRule]) -> Self {
        let mut index = Self::default();
        for rule in rules {
            index.insert(&rule.profession);
        }
        index
    }

    pub fn from_labels<I, L>(labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let mut index = Self::default();
        for label in labels {
            index.insert(label.as_ref());
        }
        index
    }

    fn insert(&mut self, label: &str) {
        if self.labels.iter().any(|l| l == label) {
            return;
        }
        self.by_lowercase
            .entry(label.to_lowercase())
            .or_insert(self.labels.len());
        self.labels.push(label.to_string());
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Case-sensitive lookup.
    pub fn exact(&self, label: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.as_str() == label)
            .map(String::as_str)
    }

    /// Case-insensitive lookup returning the label as the corpus spells it.
    /// When several spellings differ only by case the first loaded wins.
    pub fn find_ignore_case(&self, label: &str) -> Option<&str> {
        self.by_lowercase
            .get(&label.to_lowercase())
            .map(|&i| self.labels[i].as_str())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// An immutable snapshot of the loaded rules.
#[derive(Debug, Clone)]
pub struct Corpus {
    generation: u64,
    rules: Vec<TaxRule>,
    professions: ProfessionIndex,
}

impl Corpus {
    pub fn new(generation: u64, rules: Vec<TaxRule>) -> Self {
        let professions = ProfessionIndex::from_rules(&rules);
        Self {
            generation,
            rules,
            professions,
        }
    }

    /// Parses and validates every document. Any malformed entry fails the
    /// whole load.
    pub fn from_documents(generation: u64, documents: &[CorpusDocument]) -> Result<Self> {
        let mut rules = Vec::new();
        for document in documents {
            rules.extend(parse_document(document)?);
        }
        Ok(Self::new(generation, rules))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rules(&self) -> &[TaxRule] {
        &self.rules
    }

    pub fn professions(&self) -> &ProfessionIndex {
        &self.professions
    }

    /// Rules whose profession equals `label`, ignoring case.
    pub fn rules_for_label(&self, label: &str) -> Vec<TaxRule> {
        let wanted = label.to_lowercase();
        self.rules
            .iter()
            .filter(|rule| rule.profession.to_lowercase() == wanted)
            .cloned()
            .collect()
    }
}

fn parse_document(document: &CorpusDocument) -> Result<Vec<TaxRule>> {
    let entries: Vec<Value> =
        serde_json::from_slice(&document.data).map_err(|source| ReliefError::CorpusParseError {
            file: document.name.clone(),
            source,
        })?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_entry(&document.name, index, entry))
        .collect()
}

fn parse_entry(file: &str, index: usize, entry: &Value) -> Result<TaxRule> {
    let malformed = |reason: String| ReliefError::MalformedRule {
        file: file.to_string(),
        index,
        reason,
    };

    let object = entry
        .as_object()
        .ok_or_else(|| malformed("entry is not an object".to_string()))?;

    let mut fields = Vec::with_capacity(REQUIRED_FIELDS.len());
    for field in REQUIRED_FIELDS {
        let value = match object.get(field) {
            Some(Value::String(s)) => s,
            Some(_) => return Err(malformed(format!("field '{}' is not a string", field))),
            None => return Err(malformed(format!("missing field '{}'", field))),
        };
        if value.trim().is_empty() {
            return Err(malformed(format!("field '{}' is empty", field)));
        }
        fields.push(value.trim().to_string());
    }

    Ok(TaxRule {
        profession: fields[0].clone(),
        name: fields[1].clone(),
        criteria: fields[2].clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, json: &str) -> CorpusDocument {
        CorpusDocument {
            name: name.to_string(),
            data: json.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_documents_are_concatenated_in_order() {
        let corpus = Corpus::from_documents(
            1,
            &[
                doc(
                    "hospitality_rules.json",
                    r#"[{"profession": "Chef", "name": "Uniform Relief", "criteria": "cleaning own chef uniform"}]"#,
                ),
                doc(
                    "construction_rules.json",
                    r#"[{"profession": "Builder", "name": "Tools", "criteria": "replacing hand tools"},
                        {"profession": "chef", "name": "Knives", "criteria": "buying own knives"}]"#,
                ),
            ],
        )
        .unwrap();

        assert_eq!(corpus.rules().len(), 3);
        assert_eq!(corpus.rules()[1].profession, "Builder");
        assert_eq!(corpus.professions().labels(), &["Chef", "Builder", "chef"]);
        assert_eq!(corpus.professions().find_ignore_case("CHEF"), Some("Chef"));
        assert_eq!(corpus.rules_for_label("CHEF").len(), 2);
    }

    #[test]
    fn test_missing_field_fails_whole_load() {
        let result = Corpus::from_documents(
            1,
            &[doc(
                "it_rules.json",
                r#"[{"profession": "Programmer", "name": "Home Office", "criteria": "working from home"},
                    {"profession": "Programmer", "name": "Equipment"}]"#,
            )],
        );

        match result {
            Err(ReliefError::MalformedRule { file, index, reason }) => {
                assert_eq!(file, "it_rules.json");
                assert_eq!(index, 1);
                assert!(reason.contains("criteria"));
            }
            other => panic!("expected malformed rule, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_or_non_string_fields_are_rejected() {
        let empty = Corpus::from_documents(
            1,
            &[doc("a.json", r#"[{"profession": " ", "name": "x", "criteria": "y"}]"#)],
        );
        assert!(matches!(empty, Err(ReliefError::MalformedRule { .. })));

        let numeric = Corpus::from_documents(
            1,
            &[doc("a.json", r#"[{"profession": "Chef", "name": 3, "criteria": "y"}]"#)],
        );
        assert!(matches!(numeric, Err(ReliefError::MalformedRule { .. })));
    }

    #[test]
    fn test_non_array_document_is_a_parse_error() {
        let result = Corpus::from_documents(1, &[doc("a.json", r#"{"profession": "Chef"}"#)]);
        assert!(matches!(result, Err(ReliefError::CorpusParseError { .. })));
    }
}
