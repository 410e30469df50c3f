use crate::core::cache::BoundedCache;
use crate::core::corpus::Corpus;
use crate::core::resolver::ProfessionResolver;
use crate::core::similarity::ratio_ignore_case;
use crate::domain::model::TaxRule;
use crate::domain::ports::RuleSource;
use crate::utils::error::Result;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Minimum similarity for a corpus label to stand in for a label with no
/// exact rules.
pub const FUZZY_RULE_THRESHOLD: f64 = 0.85;

pub const DEFAULT_RULE_CACHE_CAPACITY: usize = 256;

/// Loads the rule corpus from a `RuleSource` and answers rule lookups.
///
/// The corpus is read lazily on first use and then shared as an immutable
/// snapshot. `reload` swaps in a fresh snapshot; readers holding the old one
/// keep using it. Load failures are never cached.
pub struct RuleStore<S: RuleSource> {
    source: S,
    corpus: RwLock<Option<Arc<Corpus>>>,
    generation: AtomicU64,
    lookups: BoundedCache<(u64, String), Arc<Vec<TaxRule>>>,
}

impl<S: RuleSource> RuleStore<S> {
    pub fn new(source: S) -> Self {
        Self::with_cache_capacity(source, DEFAULT_RULE_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(source: S, capacity: usize) -> Self {
        Self {
            source,
            corpus: RwLock::new(None),
            generation: AtomicU64::new(0),
            lookups: BoundedCache::new(capacity),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn current(&self) -> Option<Arc<Corpus>> {
        match self.corpus.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn swap(&self, corpus: Arc<Corpus>, replace: bool) -> Arc<Corpus> {
        let mut guard = match self.corpus.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !replace {
            // 另一個請求已先完成載入
            if let Some(existing) = guard.as_ref() {
                return existing.clone();
            }
        }
        *guard = Some(corpus.clone());
        corpus
    }

    async fn read_corpus(&self) -> Result<Arc<Corpus>> {
        let location = self.source.location();
        tracing::debug!("Reading tax rules from {}", location);

        let documents = self.source.read_documents().await.inspect_err(|e| {
            tracing::error!("Error loading tax rules from {}: {}", location, e);
        })?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let corpus = Corpus::from_documents(generation, &documents).inspect_err(|e| {
            tracing::error!("Rejected tax rules from {}: {}", location, e);
        })?;

        tracing::info!(
            "Loaded {} tax rules for {} professions from {} files",
            corpus.rules().len(),
            corpus.professions().len(),
            documents.len()
        );
        Ok(Arc::new(corpus))
    }

    /// The current snapshot, loading it on first use.
    pub async fn corpus(&self) -> Result<Arc<Corpus>> {
        if let Some(corpus) = self.current() {
            return Ok(corpus);
        }
        let loaded = self.read_corpus().await?;
        Ok(self.swap(loaded, false))
    }

    /// Eager load for startup.
    pub async fn warm_up(&self) -> Result<()> {
        self.corpus().await.map(|_| ())
    }

    /// Every rule in load order.
    pub async fn load_all(&self) -> Result<Vec<TaxRule>> {
        Ok(self.corpus().await?.rules().to_vec())
    }

    /// Reads the source again and swaps the new corpus in. On failure the
    /// previous corpus stays active.
    pub async fn reload(&self) -> Result<Arc<Corpus>> {
        let loaded = self.read_corpus().await?;
        let corpus = self.swap(loaded, true);
        self.clear_cache();
        Ok(corpus)
    }

    /// Rules for `label`, optionally mapped through `resolver` first.
    ///
    /// Exact (case-insensitive) profession matches win. Without any, rules of
    /// every corpus label at least `FUZZY_RULE_THRESHOLD` similar are
    /// returned, in corpus order.
    pub async fn rules_for_profession(
        &self,
        label: &str,
        resolver: Option<&ProfessionResolver>,
    ) -> Result<Arc<Vec<TaxRule>>> {
        let corpus = self.corpus().await?;

        let mapped = match resolver {
            Some(resolver) => resolver.resolve(label, corpus.professions()),
            None => label.trim().to_string(),
        };

        let key = (corpus.generation(), mapped.clone());
        if let Some(hit) = self.lookups.get(&key) {
            return Ok(hit);
        }

        tracing::debug!(
            "Looking for rules for profession: {} (mapped to: {})",
            label,
            mapped
        );

        let mut rules = corpus.rules_for_label(&mapped);

        if rules.is_empty() {
            let similar: Vec<&str> = corpus
                .professions()
                .labels()
                .iter()
                .filter_map(|candidate| {
                    let score = ratio_ignore_case(candidate, &mapped);
                    (score >= FUZZY_RULE_THRESHOLD).then(|| {
                        tracing::info!(
                            "Found fuzzy match: {} for {} (score: {:.2})",
                            candidate,
                            mapped,
                            score
                        );
                        candidate.as_str()
                    })
                })
                .collect();

            rules = corpus
                .rules()
                .iter()
                .filter(|rule| similar.contains(&rule.profession.as_str()))
                .cloned()
                .collect();
        }

        dedup_rules(&mut rules);

        if rules.is_empty() {
            tracing::warn!("No rules found for {}", mapped);
        } else {
            tracing::info!("Found {} rules for {}", rules.len(), mapped);
        }

        let rules = Arc::new(rules);
        self.lookups.insert(key, rules.clone());
        Ok(rules)
    }

    pub fn clear_cache(&self) {
        self.lookups.clear();
    }

    pub fn cached_lookups(&self) -> usize {
        self.lookups.len()
    }
}

/// Drops structurally equal rules, keeping the first occurrence.
fn dedup_rules(rules: &mut Vec<TaxRule>) {
    let mut seen = HashSet::with_capacity(rules.len());
    rules.retain(|rule| seen.insert(rule.clone()));
}
