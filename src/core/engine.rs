use crate::core::cache::{BoundedCache, SingleFlight};
use crate::core::corpus::Corpus;
use crate::core::resolver::{ProfessionResolver, Resolution};
use crate::core::rule_store::RuleStore;
use crate::domain::model::{Classification, ClassificationRequest, Questions, TaxRule};
use crate::domain::ports::{RelevanceOracle, RuleSource};
use crate::utils::error::{ReliefError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_THRESHOLD: f32 = 0.3;
pub const DEFAULT_ADAPTIVE_MULTIPLIER: f32 = 1.5;
pub const DEFAULT_HYPOTHESIS_TEMPLATE: &str = "This expense relates to {}.";
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed expense areas sent with every query, both as context in the
/// enriched query and as extra candidate labels.
pub const DOMAIN_HINTS: [&str; 8] = [
    "cleaning or replacing a work uniform",
    "buying tools or equipment for work",
    "travel and subsistence for work",
    "professional membership fees and subscriptions",
    "working from home",
    "using a personal vehicle for work",
    "protective clothing",
    "professional training and qualifications",
];

pub const ERROR_MESSAGE: &str =
    "Sorry, there was an error processing your request. Please try again later.";

/// Decides which scored rules become recommendations. One policy is applied
/// to every rule of a single request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdPolicy {
    Fixed { threshold: f32 },
    /// `min(ceiling, mean(scores) * multiplier)`
    Adaptive { ceiling: f32, multiplier: f32 },
}

impl ThresholdPolicy {
    pub fn threshold_for(&self, scores: &[f32]) -> f32 {
        match *self {
            ThresholdPolicy::Fixed { threshold } => threshold,
            ThresholdPolicy::Adaptive {
                ceiling,
                multiplier,
            } => {
                if scores.is_empty() {
                    return ceiling;
                }
                let mean = scores.iter().sum::<f32>() / scores.len() as f32;
                ceiling.min(mean * multiplier)
            }
        }
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        ThresholdPolicy::Fixed {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Which rules beyond the resolved profession's own are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expansion {
    #[default]
    None,
    /// Rules of every profession in the same group.
    Group,
    /// Group members plus members of related categories.
    RelatedCategories,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub threshold_policy: ThresholdPolicy,
    pub include_confidence: bool,
    pub introduction: bool,
    pub expansion: Expansion,
    pub multi_label: bool,
    pub hypothesis_template: Option<String>,
    pub oracle_timeout: Option<Duration>,
    pub result_cache_capacity: usize,
    pub oracle_cache_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            threshold_policy: ThresholdPolicy::default(),
            include_confidence: true,
            introduction: true,
            expansion: Expansion::None,
            multi_label: true,
            hypothesis_template: Some(DEFAULT_HYPOTHESIS_TEMPLATE.to_string()),
            oracle_timeout: Some(DEFAULT_ORACLE_TIMEOUT),
            result_cache_capacity: 1024,
            oracle_cache_capacity: 1024,
        }
    }
}

type OracleKey = (String, Vec<String>);

/// Request-level key: lowercased, trimmed profession and query, kept apart
/// so no separator can make two requests collide.
pub fn cache_key(profession: &str, query: &str) -> (String, String) {
    (
        profession.trim().to_lowercase(),
        query.trim().to_lowercase(),
    )
}

/// Candidate text the oracle scores for one rule.
pub fn candidate_label(rule: &TaxRule) -> String {
    format!(
        "{}: {} (tax relief for {})",
        rule.name, rule.criteria, rule.profession
    )
}

pub fn enriched_query(profession: &str, query: &str) -> String {
    format!(
        "I work as a {}. {} Possible expense areas: {}.",
        profession.trim(),
        query.trim(),
        DOMAIN_HINTS.join(", ")
    )
}

pub fn no_rules_message(profession: &str) -> String {
    format!(
        "No tax relief recommendations were found for '{}'. Try a more common job title.",
        profession.trim()
    )
}

pub fn no_match_message(profession: &str) -> String {
    format!(
        "None of the tax reliefs for {} clearly match your description. \
         Try describing specific expenses such as uniforms, tools or travel.",
        profession
    )
}

fn introduction(profession: &str) -> String {
    format!(
        "Based on your work as a {}, you may be able to claim the following tax reliefs:",
        profession
    )
}

/// Scores aligned to `candidates`, matched by label text. The oracle is free
/// to reorder its output but must score every submitted label.
pub fn align_scores(classification: &Classification, candidates: &[String]) -> Result<Vec<f32>> {
    if classification.labels.len() != classification.scores.len() {
        return Err(ReliefError::OracleResponseError {
            reason: format!(
                "{} labels but {} scores",
                classification.labels.len(),
                classification.scores.len()
            ),
        });
    }

    let mut by_label: HashMap<&str, f32> = HashMap::with_capacity(classification.labels.len());
    for (label, &score) in classification.labels.iter().zip(&classification.scores) {
        if !score.is_finite() {
            return Err(ReliefError::OracleResponseError {
                reason: format!("non-finite score for label '{}'", label),
            });
        }
        by_label.insert(label.as_str(), score.clamp(0.0, 1.0));
    }

    candidates
        .iter()
        .map(|candidate| {
            by_label
                .get(candidate.as_str())
                .copied()
                .ok_or_else(|| ReliefError::OracleResponseError {
                    reason: format!("no score returned for label '{}'", candidate),
                })
        })
        .collect()
}

pub struct RecommendationEngine<S: RuleSource, O: RelevanceOracle> {
    store: Arc<RuleStore<S>>,
    resolver: ProfessionResolver,
    oracle: O,
    settings: EngineSettings,
    results: BoundedCache<(String, String), Arc<Vec<String>>>,
    oracle_memo: SingleFlight<OracleKey, Arc<Classification>>,
}

impl<S: RuleSource, O: RelevanceOracle> RecommendationEngine<S, O> {
    pub fn new(
        store: Arc<RuleStore<S>>,
        resolver: ProfessionResolver,
        oracle: O,
        settings: EngineSettings,
    ) -> Self {
        let results = BoundedCache::new(settings.result_cache_capacity);
        let oracle_memo = SingleFlight::new(settings.oracle_cache_capacity);
        Self {
            store,
            resolver,
            oracle,
            settings,
            results,
            oracle_memo,
        }
    }

    pub fn store(&self) -> &RuleStore<S> {
        &self.store
    }

    pub fn resolver(&self) -> &ProfessionResolver {
        &self.resolver
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub async fn resolve_profession(&self, profession: &str) -> Result<Resolution> {
        let corpus = self.store.corpus().await?;
        Ok(self
            .resolver
            .resolve_detailed(profession, corpus.professions()))
    }

    /// Ranked recommendation strings for a profession and free-text query.
    ///
    /// Never returns an empty list on success: when nothing qualifies the
    /// list holds a single explanatory sentence. Corpus and oracle failures
    /// are logged and returned as errors; they are not cached.
    pub async fn recommend(&self, profession: &str, query: &str) -> Result<Vec<String>> {
        let key = cache_key(profession, query);
        if let Some(cached) = self.results.get(&key) {
            tracing::debug!("Serving cached recommendations for {:?}", key);
            return Ok(cached.as_ref().clone());
        }

        match self.compute(profession, query).await {
            Ok(recommendations) => {
                self.results.insert(key, Arc::new(recommendations.clone()));
                Ok(recommendations)
            }
            Err(e) => {
                tracing::error!(
                    profession = %profession,
                    query = %query,
                    kind = ?e.kind(),
                    retryable = e.is_retryable(),
                    "Error generating recommendations: {}",
                    e
                );
                Err(e)
            }
        }
    }

    pub async fn recommend_questions(
        &self,
        profession: &str,
        questions: &Questions,
    ) -> Result<Vec<String>> {
        self.recommend(profession, &questions.joined()).await
    }

    /// Like `recommend`, but any error becomes the single apology string.
    pub async fn recommend_or_apology(&self, profession: &str, query: &str) -> Vec<String> {
        match self.recommend(profession, query).await {
            Ok(recommendations) => recommendations,
            Err(_) => vec![ERROR_MESSAGE.to_string()],
        }
    }

    async fn compute(&self, profession: &str, query: &str) -> Result<Vec<String>> {
        let corpus = self.store.corpus().await?;
        let resolution = self
            .resolver
            .resolve_detailed(profession, corpus.professions());

        let rules = self.candidate_rules(&resolution, &corpus).await?;
        if rules.is_empty() {
            tracing::warn!(
                "No candidate rules for '{}' (resolved: {})",
                profession,
                resolution.is_resolved()
            );
            return Ok(vec![no_rules_message(profession)]);
        }

        let scores = self.score_rules(profession, query, &rules).await?;
        Ok(self.rank(resolution.label.trim(), &rules, &scores))
    }

    async fn candidate_rules(&self, resolution: &Resolution, corpus: &Corpus) -> Result<Vec<TaxRule>> {
        let mut rules: Vec<TaxRule> = self
            .store
            .rules_for_profession(&resolution.label, None)
            .await?
            .as_ref()
            .clone();

        let related: Vec<String> = match self.settings.expansion {
            Expansion::None => Vec::new(),
            Expansion::Group => self.resolver.related_professions(&resolution.label),
            Expansion::RelatedCategories => {
                let mut related = self.resolver.related_professions(&resolution.label);
                if let Some(category) = self.resolver.category_of(&resolution.label) {
                    related.extend(self.resolver.professions_in_related_categories(category));
                }
                related
            }
        };

        let before = rules.len();
        for label in &related {
            for rule in corpus.rules_for_label(label) {
                if !rules.contains(&rule) {
                    rules.push(rule);
                }
            }
        }
        if rules.len() > before {
            tracing::debug!(
                "Expanded candidates for {} from {} to {} rules",
                resolution.label,
                before,
                rules.len()
            );
        }

        Ok(rules)
    }

    /// One score per rule, in rule order.
    async fn score_rules(&self, profession: &str, query: &str, rules: &[TaxRule]) -> Result<Vec<f32>> {
        let rule_labels: Vec<String> = rules.iter().map(candidate_label).collect();

        let mut candidates: Vec<String> = Vec::with_capacity(rule_labels.len() + DOMAIN_HINTS.len());
        for label in rule_labels
            .iter()
            .map(String::as_str)
            .chain(DOMAIN_HINTS.iter().copied())
        {
            if !candidates.iter().any(|c| c == label) {
                candidates.push(label.to_string());
            }
        }

        let sequence = enriched_query(profession, query);
        let classification = self.classify(sequence, candidates.clone()).await?;
        let scores = align_scores(&classification, &candidates)?;

        let position: HashMap<&str, usize> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();

        Ok(rule_labels
            .iter()
            .map(|label| position.get(label.as_str()).map_or(0.0, |&i| scores[i]))
            .collect())
    }

    async fn classify(&self, sequence: String, candidates: Vec<String>) -> Result<Arc<Classification>> {
        let key = (sequence.clone(), candidates.clone());
        let request = ClassificationRequest {
            sequence,
            candidate_labels: candidates,
            multi_label: self.settings.multi_label,
            hypothesis_template: self.settings.hypothesis_template.clone(),
        };
        let timeout = self.settings.oracle_timeout;
        let oracle = &self.oracle;

        let (classification, computed) = self
            .oracle_memo
            .get_or_try_init(key, || async move {
                tracing::debug!("Scoring {} candidate labels", request.candidate_labels.len());
                let call = oracle.classify(request);
                let result = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, call).await {
                        Ok(result) => result,
                        Err(_) => Err(ReliefError::OracleTimeout { after: limit }),
                    },
                    None => call.await,
                };
                result.map(Arc::new)
            })
            .await?;

        if !computed {
            tracing::debug!("Reusing memoised oracle scores");
        }
        Ok(classification)
    }

    fn rank(&self, profession: &str, rules: &[TaxRule], scores: &[f32]) -> Vec<String> {
        let threshold = self.settings.threshold_policy.threshold_for(scores);

        let mut ranked: Vec<(usize, f32)> = scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, score)| *score > threshold)
            .collect();
        // stable: equal scores keep rule order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        tracing::info!(
            "{} of {} rules scored above threshold {:.2} for {}",
            ranked.len(),
            rules.len(),
            threshold,
            profession
        );

        if ranked.is_empty() {
            return vec![no_match_message(profession)];
        }

        let mut recommendations = Vec::with_capacity(ranked.len() + 1);
        if self.settings.introduction {
            recommendations.push(introduction(profession));
        }
        for (index, score) in ranked {
            recommendations.push(self.format_recommendation(&rules[index], score));
        }
        recommendations
    }

    fn format_recommendation(&self, rule: &TaxRule, score: f32) -> String {
        if self.settings.include_confidence {
            format!(
                "{}: {} (confidence: {:.0}%)",
                rule.name,
                rule.criteria,
                score * 100.0
            )
        } else {
            format!("{}: {}", rule.name, rule.criteria)
        }
    }

    /// Reloads the corpus and drops every cached result and oracle score.
    pub async fn reload_corpus(&self) -> Result<()> {
        self.store.reload().await?;
        self.clear_caches();
        Ok(())
    }

    pub fn clear_caches(&self) {
        self.results.clear();
        self.oracle_memo.clear();
        self.store.clear_cache();
    }

    pub fn cached_results(&self) -> usize {
        self.results.len()
    }
}
