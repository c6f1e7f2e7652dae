use crate::index::NeighborSearch;
use crate::item::ScoredCandidate;
use crate::store::Snapshot;
use crate::{vector, Error, Result};
use rayon::prelude::*;

/// Nearest items to a query embedding, by cosine similarity.
pub struct VisualRetriever<'a> {
    snapshot: &'a Snapshot,
}

impl<'a> VisualRetriever<'a> {
    #[inline]
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self { snapshot }
    }

    /// Up to `k` items, most similar first, never including `exclude_id`.
    ///
    /// Uses the neighbor index when the snapshot has one (asking for one extra
    /// neighbor to absorb the query item itself) and a brute-force scan
    /// otherwise. Both paths order equal similarities by ascending row.
    pub fn nearest(
        &self,
        query: &[f32],
        k: usize,
        exclude_id: Option<&str>,
    ) -> Result<Vec<ScoredCandidate>> {
        let dim = self.snapshot.embeddings().dim();
        if query.len() != dim {
            return Err(Error::InvalidDimension {
                expected: dim,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let fetch = (k + 1).min(self.snapshot.len());
        let ranked: Vec<(usize, f32)> = match self.snapshot.neighbor_index() {
            Some(index) => index
                .search(query, fetch)
                .into_iter()
                .map(|(row, distance)| (row, 1.0 - distance))
                .collect(),
            None => self.brute_force(query),
        };

        let exclude_row = exclude_id.and_then(|id| self.snapshot.row_of(id));
        Ok(ranked
            .into_iter()
            .filter(|(row, _)| Some(*row) != exclude_row)
            .take(k)
            .filter_map(|(row, score)| {
                self.snapshot
                    .item(row)
                    .map(|item| ScoredCandidate::new(item.clone(), score))
            })
            .collect())
    }

    /// Every row scored against the query, most similar first.
    fn brute_force(&self, query: &[f32]) -> Vec<(usize, f32)> {
        let embeddings = self.snapshot.embeddings();
        let mut scored: Vec<(usize, f32)> = (0..embeddings.rows())
            .into_par_iter()
            .map(|row| (row, vector::cosine_similarity(query, embeddings.row(row))))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored
    }
}
