//! Maps free-text profession input onto a profession label known to the corpus.
//!
//! Strategies run in a fixed order and the first success wins:
//!
//! 1. direct match against corpus labels (case-sensitive, then insensitive)
//! 2. alias table
//! 3. best similarity over every catalog group member (> 0.8)
//! 4. closest match inside groups sharing a word with the input (>= 0.6)
//! 5. closest match over all corpus labels (>= 0.7)
//!
//! When everything fails the original input is returned unchanged.

use crate::core::corpus::ProfessionIndex;
use crate::core::similarity::{closest_match, normalize_whitespace, ratio, word_tokens};
use crate::domain::catalog::{ProfessionCatalog, ProfessionGroup};
use crate::utils::error::Result;
use std::collections::{HashMap, HashSet};

pub const GROUP_SIMILARITY_CUTOFF: f64 = 0.8;
pub const WORD_OVERLAP_CUTOFF: f64 = 0.6;
pub const GLOBAL_FUZZY_CUTOFF: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchStrategy {
    Direct,
    Alias,
    GroupSimilarity { score: f64 },
    WordOverlap { score: f64 },
    GlobalFuzzy { score: f64 },
    Unresolved,
}

impl MatchStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            MatchStrategy::Direct => "direct",
            MatchStrategy::Alias => "alias",
            MatchStrategy::GroupSimilarity { .. } => "group_similarity",
            MatchStrategy::WordOverlap { .. } => "word_overlap",
            MatchStrategy::GlobalFuzzy { .. } => "global_fuzzy",
            MatchStrategy::Unresolved => "unresolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub label: String,
    pub strategy: MatchStrategy,
}

impl Resolution {
    fn matched(label: &str, strategy: MatchStrategy) -> Self {
        Self {
            label: label.to_string(),
            strategy,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.strategy != MatchStrategy::Unresolved
    }
}

pub struct ProfessionResolver {
    catalog: ProfessionCatalog,
    synonyms: HashMap<String, String>,
}

impl ProfessionResolver {
    /// Fails on catalogs with ambiguous aliases or dangling relations.
    pub fn new(catalog: ProfessionCatalog) -> Result<Self> {
        catalog.validate()?;
        let synonyms = catalog.synonym_index()?;
        Ok(Self { catalog, synonyms })
    }

    pub fn catalog(&self) -> &ProfessionCatalog {
        &self.catalog
    }

    pub fn resolve(&self, input: &str, known: &ProfessionIndex) -> String {
        self.resolve_detailed(input, known).label
    }

    pub fn resolve_detailed(&self, input: &str, known: &ProfessionIndex) -> Resolution {
        let trimmed = input.trim();

        let resolution = if trimmed.is_empty() {
            None
        } else {
            self.direct_match(trimmed, known)
                .or_else(|| self.alias_match(trimmed, known))
                .or_else(|| self.group_similarity_match(trimmed, known))
                .or_else(|| self.word_overlap_match(trimmed, known))
                .or_else(|| self.global_fuzzy_match(trimmed, known))
        };

        match resolution {
            Some(resolution) => {
                if resolution.strategy != MatchStrategy::Direct {
                    tracing::info!(
                        "Mapped profession '{}' to '{}' via {}",
                        input,
                        resolution.label,
                        resolution.strategy.name()
                    );
                }
                resolution
            }
            None => {
                tracing::warn!("No profession mapping found for '{}'", input);
                Resolution {
                    label: input.to_string(),
                    strategy: MatchStrategy::Unresolved,
                }
            }
        }
    }

    fn direct_match(&self, input: &str, known: &ProfessionIndex) -> Option<Resolution> {
        known
            .exact(input)
            .or_else(|| known.find_ignore_case(input))
            .map(|label| Resolution::matched(label, MatchStrategy::Direct))
    }

    fn alias_match(&self, input: &str, known: &ProfessionIndex) -> Option<Resolution> {
        let canonical = self.synonyms.get(&input.to_lowercase())?;
        known
            .find_ignore_case(canonical)
            .map(|label| Resolution::matched(label, MatchStrategy::Alias))
    }

    fn group_similarity_match(&self, input: &str, known: &ProfessionIndex) -> Option<Resolution> {
        let input = input.to_lowercase();
        let mut best: Option<(&str, f64)> = None;

        for group in &self.catalog.groups {
            for member in &group.members {
                let score = ratio(&input, &member.to_lowercase());
                // strict comparison keeps the first candidate on ties
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((member.as_str(), score));
                }
            }
        }

        let (candidate, score) = best?;
        if score <= GROUP_SIMILARITY_CUTOFF {
            return None;
        }
        known
            .find_ignore_case(candidate)
            .map(|label| Resolution::matched(label, MatchStrategy::GroupSimilarity { score }))
    }

    fn word_overlap_match(&self, input: &str, known: &ProfessionIndex) -> Option<Resolution> {
        let input_words: HashSet<String> = word_tokens(input).into_iter().collect();
        if input_words.is_empty() {
            return None;
        }

        for group in &self.catalog.groups {
            if !group_shares_word(group, &input_words) {
                continue;
            }
            let members: Vec<&str> = group
                .members
                .iter()
                .filter_map(|m| known.find_ignore_case(m))
                .collect();
            if let Some(hit) = closest_match(input, members, WORD_OVERLAP_CUTOFF) {
                return Some(Resolution::matched(
                    hit.candidate,
                    MatchStrategy::WordOverlap { score: hit.score },
                ));
            }
        }

        None
    }

    fn global_fuzzy_match(&self, input: &str, known: &ProfessionIndex) -> Option<Resolution> {
        closest_match(
            input,
            known.labels().iter().map(String::as_str),
            GLOBAL_FUZZY_CUTOFF,
        )
        .map(|hit| Resolution::matched(hit.candidate, MatchStrategy::GlobalFuzzy { score: hit.score }))
    }

    fn group_containing(&self, label: &str) -> Option<&ProfessionGroup> {
        let wanted = normalize_whitespace(label);
        self.catalog
            .groups
            .iter()
            .find(|g| g.members.iter().any(|m| normalize_whitespace(m) == wanted))
    }

    /// Members of the first group that contains `label`, including `label`
    /// itself. Empty when no group does.
    pub fn related_professions(&self, label: &str) -> Vec<String> {
        let mut related: Vec<String> = Vec::new();
        if let Some(group) = self.group_containing(label) {
            for member in &group.members {
                if !related.contains(member) {
                    related.push(member.clone());
                }
            }
        }
        related
    }

    pub fn category_of(&self, label: &str) -> Option<&str> {
        self.group_containing(label).map(|g| g.name.as_str())
    }

    pub fn related_categories(&self, category: &str) -> &[String] {
        self.catalog.related_categories(category)
    }

    /// Members of every category related to `category`, in relation order.
    pub fn professions_in_related_categories(&self, category: &str) -> Vec<String> {
        let mut professions: Vec<String> = Vec::new();
        for related in self.related_categories(category) {
            if let Some(group) = self.catalog.group(related) {
                for member in &group.members {
                    if !professions.contains(member) {
                        professions.push(member.clone());
                    }
                }
            }
        }
        professions
    }
}

impl Default for ProfessionResolver {
    fn default() -> Self {
        let catalog = ProfessionCatalog::default();
        // 內建目錄已由單元測試驗證過
        let synonyms = catalog.synonym_index().unwrap_or_default();
        Self { catalog, synonyms }
    }
}

fn group_shares_word(group: &ProfessionGroup, input_words: &HashSet<String>) -> bool {
    group
        .members
        .iter()
        .flat_map(|m| word_tokens(m))
        .any(|w| input_words.contains(&w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::ProfessionAlias;

    fn known(labels: &[&str]) -> ProfessionIndex {
        ProfessionIndex::from_labels(labels)
    }

    #[test]
    fn test_direct_match_returns_corpus_casing() {
        let resolver = ProfessionResolver::default();
        let known = known(&["Chef", "Builder"]);

        let r = resolver.resolve_detailed("builder ", &known);
        assert_eq!(r.label, "Builder");
        assert_eq!(r.strategy, MatchStrategy::Direct);
    }

    #[test]
    fn test_direct_match_beats_alias() {
        // "construction" is an alias of Builder, but the corpus has it verbatim
        let resolver = ProfessionResolver::default();
        let known = known(&["Builder", "Construction"]);

        let r = resolver.resolve_detailed("construction", &known);
        assert_eq!(r.label, "Construction");
        assert_eq!(r.strategy, MatchStrategy::Direct);
    }

    #[test]
    fn test_case_sensitive_direct_match_is_preferred() {
        let resolver = ProfessionResolver::default();
        let known = known(&["gp", "GP"]);
        assert_eq!(resolver.resolve("GP", &known), "GP");
    }

    #[test]
    fn test_alias_requires_canonical_in_corpus() {
        let resolver = ProfessionResolver::default();

        let with = known(&["Software Engineer"]);
        let r = resolver.resolve_detailed("Software Dev", &with);
        assert_eq!(r.label, "Software Engineer");
        assert_eq!(r.strategy, MatchStrategy::Alias);

        let without = known(&["Chef"]);
        let r = resolver.resolve_detailed("sparky", &without);
        assert_eq!(r.strategy, MatchStrategy::Unresolved);
        assert_eq!(r.label, "sparky");
    }

    #[test]
    fn test_group_similarity_above_cutoff() {
        let resolver = ProfessionResolver::default();
        let known = known(&["Electrician", "Chef"]);

        let r = resolver.resolve_detailed("Electricain", &known);
        assert_eq!(r.label, "Electrician");
        match r.strategy {
            MatchStrategy::GroupSimilarity { score } => assert!(score > GROUP_SIMILARITY_CUTOFF),
            other => panic!("unexpected strategy {:?}", other),
        }
    }

    #[test]
    fn test_group_similarity_skips_candidates_missing_from_corpus() {
        // best group candidate "Plumber" is not in the corpus, so the stage fails
        // and the global fallback finds the corpus spelling instead
        let resolver = ProfessionResolver::default();
        let known = known(&["Plumbers"]);

        let r = resolver.resolve_detailed("Plumber", &known);
        assert_eq!(r.label, "Plumbers");
        assert!(matches!(r.strategy, MatchStrategy::GlobalFuzzy { .. }));
    }

    #[test]
    fn test_word_overlap_match() {
        let resolver = ProfessionResolver::default();
        let known = known(&["Site Manager", "Chef"]);

        // shares "site" with Construction_Trades
        let r = resolver.resolve_detailed("Building Site Manager", &known);
        assert_eq!(r.label, "Site Manager");
        match r.strategy {
            MatchStrategy::WordOverlap { score } => assert!(score >= WORD_OVERLAP_CUTOFF),
            other => panic!("unexpected strategy {:?}", other),
        }
    }

    #[test]
    fn test_nonsense_is_unresolved() {
        let resolver = ProfessionResolver::default();
        let known = known(&["Chef", "Builder", "Software Engineer"]);

        let r = resolver.resolve_detailed("Asdlkfj", &known);
        assert_eq!(r.label, "Asdlkfj");
        assert!(!r.is_resolved());
        assert_eq!(resolver.resolve("   ", &known), "   ");
    }

    #[test]
    fn test_ambiguous_catalog_is_rejected() {
        let mut catalog = ProfessionCatalog::default();
        catalog.aliases.push(ProfessionAlias {
            canonical: "Builder".to_string(),
            synonyms: vec!["Sparky".to_string()],
        });
        assert!(ProfessionResolver::new(catalog).is_err());
    }

    #[test]
    fn test_related_professions_and_categories() {
        let resolver = ProfessionResolver::default();

        let related = resolver.related_professions("builder");
        assert!(related.contains(&"Builder".to_string()));
        assert!(related.contains(&"Plumber".to_string()));
        assert!(resolver.related_professions("Astronaut").is_empty());

        assert_eq!(resolver.category_of("  site   manager "), Some("Construction_Trades"));
        assert_eq!(resolver.category_of("Astronaut"), None);

        assert_eq!(
            resolver.related_categories("Scientific_Research"),
            &["Medical_Healthcare".to_string(), "Education".to_string()]
        );
        let expanded = resolver.professions_in_related_categories("Scientific_Research");
        assert!(expanded.contains(&"Doctor".to_string()));
        assert!(expanded.contains(&"Teacher".to_string()));
    }
}
