//! Precomputed nearest-neighbor structures over the embedding matrix.
//!
//! Every index answers by cosine distance (`1 - cosine similarity`), so the
//! retriever can turn a distance back into a similarity with `1 - d`
//! regardless of which index is loaded.

use crate::flat::FlatIndex;
use crate::hnsw::{HnswIndex, HnswParams};
use crate::matrix::EmbeddingMatrix;
use serde::{Deserialize, Serialize};

/// k-nearest-neighbor lookup by cosine distance.
pub trait NeighborSearch {
    /// Up to `k` `(row, cosine_distance)` pairs, nearest first.
    /// Equal distances are ordered by ascending row.
    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)>;

    /// Number of indexed rows.
    fn len(&self) -> usize;

    fn dim(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Exact scan over pre-normalized rows.
    Flat,
    /// Approximate HNSW graph.
    Hnsw,
}

impl std::str::FromStr for IndexKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(IndexKind::Flat),
            "hnsw" => Ok(IndexKind::Hnsw),
            other => Err(format!("unknown index kind `{}` (expected flat or hnsw)", other)),
        }
    }
}

/// Serializable neighbor index artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NeighborIndex {
    Flat(FlatIndex),
    Hnsw(HnswIndex),
}

impl NeighborIndex {
    pub fn build(kind: IndexKind, embeddings: &EmbeddingMatrix, params: HnswParams) -> Self {
        match kind {
            IndexKind::Flat => NeighborIndex::Flat(FlatIndex::build(embeddings)),
            IndexKind::Hnsw => NeighborIndex::Hnsw(HnswIndex::build(embeddings, params)),
        }
    }

    /// Structural check for an index decoded from disk.
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            NeighborIndex::Flat(i) => i.validate(),
            NeighborIndex::Hnsw(i) => i.validate(),
        }
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            NeighborIndex::Flat(_) => IndexKind::Flat,
            NeighborIndex::Hnsw(_) => IndexKind::Hnsw,
        }
    }
}

impl NeighborSearch for NeighborIndex {
    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        match self {
            NeighborIndex::Flat(i) => i.search(query, k),
            NeighborIndex::Hnsw(i) => i.search(query, k),
        }
    }

    fn len(&self) -> usize {
        match self {
            NeighborIndex::Flat(i) => i.len(),
            NeighborIndex::Hnsw(i) => i.len(),
        }
    }

    fn dim(&self) -> usize {
        match self {
            NeighborIndex::Flat(i) => i.dim(),
            NeighborIndex::Hnsw(i) => i.dim(),
        }
    }
}
