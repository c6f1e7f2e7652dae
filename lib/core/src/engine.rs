use crate::candidates::{join_answers, over_fetch_count, TextCandidateGenerator};
use crate::filter::{AudienceFilter, Filter};
use crate::hybrid::HybridRanker;
use crate::item::ScoredCandidate;
use crate::retriever::VisualRetriever;
use crate::store::{ResourceStore, Resources, Snapshot};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a query recommendation was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendMode {
    /// Text candidates re-ranked visually.
    Hybrid,
    /// No text model loaded: the first items in catalog order, score 0.
    IndexOrderFallback,
}

/// Pool sizes reported alongside query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub text_candidates: usize,
    pub visual_candidates: usize,
}

#[derive(Debug, Clone)]
pub struct Recommendations {
    pub results: Vec<ScoredCandidate>,
    pub stats: QueryStats,
    pub mode: RecommendMode,
}

/// Entry point for both kinds of recommendation.
///
/// Owns the resource store; share it across request handlers behind an `Arc`.
/// Every call reads one snapshot and mutates nothing.
pub struct RecommendationEngine {
    store: ResourceStore,
}

impl RecommendationEngine {
    pub fn new(resources: Resources) -> Result<Self> {
        Ok(Self {
            store: ResourceStore::initialize(resources)?,
        })
    }

    #[inline]
    pub fn from_store(store: ResourceStore) -> Self {
        Self { store }
    }

    #[inline]
    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    #[inline]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.snapshot()
    }

    /// Items that look like `item_id`. Unknown ids give an empty list.
    pub fn recommend_similar_to_item(&self, item_id: &str, top_k: usize) -> Result<Vec<ScoredCandidate>> {
        let snapshot = self.store.snapshot();
        let Some(row) = snapshot.row_of(item_id) else {
            debug!(item_id, "unknown item id");
            return Ok(Vec::new());
        };

        let query = snapshot.embeddings().row(row);
        let results = VisualRetriever::new(&snapshot).nearest(query, top_k, Some(item_id))?;
        debug!(item_id, top_k, returned = results.len(), "similar-item recommendation");
        Ok(results)
    }

    /// Items matching free-text quiz answers, optionally narrowed to an audience.
    pub fn recommend_by_query<S: AsRef<str>>(
        &self,
        answers: &[S],
        gender: Option<&str>,
        top_k: usize,
    ) -> Result<Recommendations> {
        let snapshot = self.store.snapshot();

        let Some(model) = snapshot.text_model() else {
            warn!("no text model available; returning items in catalog order");
            let results: Vec<ScoredCandidate> = snapshot
                .items()
                .iter()
                .take(top_k)
                .map(|item| ScoredCandidate::new(item.clone(), 0.0))
                .collect();
            return Ok(Recommendations {
                stats: QueryStats {
                    text_candidates: 0,
                    visual_candidates: results.len(),
                },
                results,
                mode: RecommendMode::IndexOrderFallback,
            });
        };

        let query_text = join_answers(answers);
        let pool = over_fetch_count(top_k);
        let candidates = TextCandidateGenerator::new(model).candidates(&query_text, pool)?;

        let filter = gender.and_then(AudienceFilter::new);
        let ranked = HybridRanker::new(&snapshot).rank(
            &candidates,
            filter.as_ref().map(|f| f as &dyn Filter),
            top_k,
        )?;

        debug!(
            answers = answers.len(),
            gender = gender.unwrap_or(""),
            candidates = candidates.len(),
            ranked = ranked.ranked_count,
            returned = ranked.returned_count,
            "quiz recommendation"
        );

        Ok(Recommendations {
            results: ranked.results,
            stats: QueryStats {
                text_candidates: ranked.ranked_count,
                visual_candidates: ranked.returned_count,
            },
            mode: RecommendMode::Hybrid,
        })
    }
}
