//! Hybrid ranker
//!
//! Re-ranks lexical candidates by how close each one sits to the visual
//! centroid of the whole pool, then fuses the two signals:
//!
//! ```text
//! candidates ──> filter ──> centroid ──> cosine to centroid
//!      │                                        │
//!      └── text scores ──> min-max ──┐   min-max┘
//!                                    └──> 0.45 · text + 0.55 · visual
//! ```

use crate::filter::Filter;
use crate::item::ScoredCandidate;
use crate::store::Snapshot;
use crate::{vector, Error, Result};
use tracing::debug;

/// Weight of the normalized text score in the combined score.
pub const TEXT_WEIGHT: f32 = 0.45;
/// Weight of the normalized visual score in the combined score.
pub const VISUAL_WEIGHT: f32 = 0.55;

/// Ranked results plus the pool sizes that produced them.
#[derive(Debug, Clone, Default)]
pub struct RankedList {
    pub results: Vec<ScoredCandidate>,
    /// Candidates that took part in ranking, after filtering.
    pub ranked_count: usize,
    pub returned_count: usize,
}

/// Min-max scale into [0, 1]. A set whose scores all tie maps to all zeros.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    let (min, max) = scores
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));

    if max > min {
        let range = max - min;
        scores.iter().map(|s| (s - min) / range).collect()
    } else {
        vec![0.0; scores.len()]
    }
}

pub struct HybridRanker<'a> {
    snapshot: &'a Snapshot,
}

impl<'a> HybridRanker<'a> {
    #[inline]
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    /// Rank `(row, text_score)` candidates.
    ///
    /// A filter that rejects every candidate is ignored, so an overly narrow
    /// filter still returns results. Equal combined scores keep candidate order.
    /// A row outside the catalog is [`Error::InvalidInput`].
    pub fn rank(
        &self,
        candidates: &[(usize, f32)],
        filter: Option<&dyn Filter>,
        top_k: usize,
    ) -> Result<RankedList> {
        if let Some((row, _)) = candidates.iter().find(|(row, _)| *row >= self.snapshot.len()) {
            return Err(Error::InvalidInput(format!(
                "candidate row {} is outside a catalog of {} items",
                row,
                self.snapshot.len()
            )));
        }
        let valid = candidates.to_vec();

        let pool = match filter {
            Some(f) => {
                let kept: Vec<(usize, f32)> = valid
                    .iter()
                    .copied()
                    .filter(|(row, _)| self.snapshot.item(*row).is_some_and(|item| f.matches(item)))
                    .collect();
                if kept.is_empty() {
                    debug!(candidates = valid.len(), "filter matched nothing, ranking unfiltered pool");
                    valid
                } else {
                    kept
                }
            }
            None => valid,
        };

        if pool.is_empty() {
            return Ok(RankedList::default());
        }

        let embeddings = self.snapshot.embeddings();
        let Some(centroid) = vector::mean(pool.iter().map(|(row, _)| embeddings.row(*row)), embeddings.dim())
        else {
            return Ok(RankedList::default());
        };

        let text_scores: Vec<f32> = pool.iter().map(|(_, s)| *s).collect();
        let visual_scores: Vec<f32> = pool
            .iter()
            .map(|(row, _)| vector::cosine_similarity(embeddings.row(*row), &centroid))
            .collect();

        let text_norm = min_max_normalize(&text_scores);
        let visual_norm = min_max_normalize(&visual_scores);

        let mut combined: Vec<(usize, f32)> = pool
            .iter()
            .zip(text_norm.iter().zip(&visual_norm))
            .map(|((row, _), (t, v))| (*row, TEXT_WEIGHT * t + VISUAL_WEIGHT * v))
            .collect();
        // sort_by is stable: ties keep candidate order
        combined.sort_by(|a, b| b.1.total_cmp(&a.1));
        combined.truncate(top_k);

        let results: Vec<ScoredCandidate> = combined
            .into_iter()
            .filter_map(|(row, score)| {
                self.snapshot
                    .item(row)
                    .map(|item| ScoredCandidate::new(item.clone(), score).with_metadata_snapshot())
            })
            .collect();

        Ok(RankedList {
            ranked_count: pool.len(),
            returned_count: results.len(),
            results,
        })
    }
}
