use crate::index::NeighborSearch;
use crate::matrix::EmbeddingMatrix;
use crate::{vector, Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Exact cosine index: unit-length copies of every row, scanned in full.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dim: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    pub fn build(embeddings: &EmbeddingMatrix) -> Self {
        let mut vectors = Vec::with_capacity(embeddings.as_slice().len());
        for row in embeddings.iter_rows() {
            vectors.extend_from_slice(&vector::normalized(row));
        }
        Self {
            dim: embeddings.dim(),
            vectors,
        }
    }

    /// Check a decoded index holds whole rows.
    pub fn validate(&self) -> Result<()> {
        if self.dim == 0 && !self.vectors.is_empty() {
            return Err(Error::config("flat index has vectors but zero dimension"));
        }
        if self.dim > 0 && self.vectors.len() % self.dim != 0 {
            return Err(Error::config(format!(
                "flat index buffer of {} values is not a multiple of dimension {}",
                self.vectors.len(),
                self.dim
            )));
        }
        Ok(())
    }

    #[inline(always)]
    fn get_vector(&self, idx: usize) -> &[f32] {
        let start = idx * self.dim;
        &self.vectors[start..start + self.dim]
    }
}

impl NeighborSearch for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if k == 0 || query.len() != self.dim || self.dim == 0 {
            return Vec::new();
        }

        let q = vector::normalized(query);
        let mut scored: Vec<(usize, f32)> = (0..self.len())
            .into_par_iter()
            .map(|i| (i, 1.0 - vector::dot(&q, self.get_vector(i))))
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        scored
    }

    fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.vectors.len() / self.dim
        }
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_partial_row() {
        assert!(FlatIndex::build(&matrix()).validate().is_ok());

        let bad: FlatIndex = serde_json::from_str(r#"{"dim":2,"vectors":[1.0,0.0,0.5]}"#).unwrap();
        assert!(matches!(bad.validate(), Err(Error::Configuration(_))));
    }

    fn matrix() -> EmbeddingMatrix {
        EmbeddingMatrix::from_rows(vec![
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.0, 1.0],
            vec![0.1, 0.9],
            vec![0.5, 0.5],
        ])
        .unwrap()
    }

    #[test]
    fn test_exact_order() {
        let index = FlatIndex::build(&matrix());
        let results = index.search(&[1.0, 0.0], 3);
        let rows: Vec<usize> = results.iter().map(|r| r.0).collect();
        assert_eq!(rows, vec![0, 1, 4]);
        assert!(results[0].1.abs() < 1e-6);
    }

    #[test]
    fn test_scale_invariant() {
        let index = FlatIndex::build(&matrix());
        let a = index.search(&[1.0, 0.0], 5);
        let b = index.search(&[10.0, 0.0], 5);
        assert_eq!(a.iter().map(|r| r.0).collect::<Vec<_>>(), b.iter().map(|r| r.0).collect::<Vec<_>>());
    }

    #[test]
    fn test_wrong_dimension_returns_nothing() {
        let index = FlatIndex::build(&matrix());
        assert!(index.search(&[1.0, 0.0, 0.0], 3).is_empty());
        assert!(index.search(&[1.0, 0.0], 0).is_empty());
    }
}
