use crate::index::NeighborSearch;
use crate::matrix::EmbeddingMatrix;
use crate::{vector, Error, Result};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Bit vector for visited node tracking
/// Much faster than HashSet for dense integer sets
struct VisitedSet {
    bits: Vec<u64>,
}

impl VisitedSet {
    #[inline]
    fn new(capacity: usize) -> Self {
        Self {
            bits: vec![0; capacity.div_ceil(64)],
        }
    }

    /// Returns true if `idx` was not visited before.
    #[inline]
    fn insert(&mut self, idx: usize) -> bool {
        let word = idx / 64;
        let mask = 1u64 << (idx % 64);
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        let was_set = self.bits[word] & mask != 0;
        self.bits[word] |= mask;
        !was_set
    }

    #[cfg(test)]
    fn contains(&self, idx: usize) -> bool {
        self.bits
            .get(idx / 64)
            .is_some_and(|w| w & (1u64 << (idx % 64)) != 0)
    }
}

/// (distance, row); ordering by distance first, then row, keeps results deterministic.
type Scored = (OrderedFloat<f32>, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Links per node on upper layers; layer 0 keeps twice as many.
    pub max_connections: usize,
    pub max_layers: usize,
    pub ef_construction: usize,
    /// Lower bound on the search beam at query time.
    pub ef_search: usize,
    /// Seed for layer assignment, so a rebuild yields the same graph.
    pub seed: u64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            max_connections: 16,
            max_layers: 4,
            ef_construction: 200,
            ef_search: 64,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HnswNode {
    layers: Vec<Vec<usize>>,
}

/// HNSW graph over unit-length copies of the embedding rows.
///
/// Built once by the index build step and loaded read-only for serving;
/// searches take `&self` and allocate their own visited set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswIndex {
    nodes: Vec<HnswNode>,
    /// Contiguous storage for all vectors (cache-friendly)
    vectors: Vec<f32>,
    dim: usize,
    entry_point: usize,
    top_layer: usize,
    params: HnswParams,
}

impl HnswIndex {
    pub fn build(embeddings: &EmbeddingMatrix, params: HnswParams) -> Self {
        let params = HnswParams {
            max_connections: params.max_connections.max(2),
            max_layers: params.max_layers.max(1),
            ef_construction: params.ef_construction.max(1),
            ef_search: params.ef_search.max(1),
            ..params
        };

        let mut vectors = Vec::with_capacity(embeddings.as_slice().len());
        for row in embeddings.iter_rows() {
            vectors.extend_from_slice(&vector::normalized(row));
        }

        let mut index = Self {
            nodes: Vec::with_capacity(embeddings.rows()),
            vectors,
            dim: embeddings.dim(),
            entry_point: 0,
            top_layer: 0,
            params,
        };

        if index.dim == 0 {
            return index;
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        for idx in 0..embeddings.rows() {
            let layer = index.select_layer(&mut rng);
            index.insert(idx, layer);
        }
        index
    }

    pub fn params(&self) -> HnswParams {
        self.params
    }

    /// Check a decoded graph only refers to nodes it holds.
    pub fn validate(&self) -> Result<()> {
        let n = self.nodes.len();
        if self.vectors.len() != n * self.dim {
            return Err(Error::config(format!(
                "hnsw index has {} nodes of dimension {} but {} vector values",
                n,
                self.dim,
                self.vectors.len()
            )));
        }
        if n == 0 {
            return Ok(());
        }
        if self.dim == 0 {
            return Err(Error::config("hnsw index has nodes but zero dimension"));
        }
        if self.entry_point >= n {
            return Err(Error::config(format!(
                "hnsw entry point {} is outside {} nodes",
                self.entry_point, n
            )));
        }
        if self.top_layer >= self.nodes[self.entry_point].layers.len() {
            return Err(Error::config(format!(
                "hnsw entry point has no layer {}",
                self.top_layer
            )));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Some(&bad) = node.layers.iter().flatten().find(|&&nb| nb >= n) {
                return Err(Error::config(format!(
                    "hnsw node {} links to missing node {}",
                    idx, bad
                )));
            }
        }
        Ok(())
    }

    #[inline(always)]
    fn get_vector(&self, idx: usize) -> &[f32] {
        let start = idx * self.dim;
        &self.vectors[start..start + self.dim]
    }

    /// Select layer using exponential decay
    #[inline]
    fn select_layer(&self, rng: &mut StdRng) -> usize {
        let mut layer = 0;
        while layer < self.params.max_layers - 1 && rng.random::<f32>() < 0.5 {
            layer += 1;
        }
        layer
    }

    #[inline(always)]
    fn distance_to_node(&self, query: &[f32], idx: usize) -> f32 {
        1.0 - vector::dot(query, self.get_vector(idx))
    }

    #[inline]
    fn layer_capacity(&self, layer: usize) -> usize {
        if layer == 0 {
            self.params.max_connections * 2
        } else {
            self.params.max_connections
        }
    }

    /// Beam search on one layer. Returns up to `ef` nodes, nearest first.
    fn search_layer(&self, query: &[f32], entry: usize, ef: usize, layer: usize) -> Vec<(usize, f32)> {
        let mut visited = VisitedSet::new(self.nodes.len());
        let mut candidates: BinaryHeap<Reverse<Scored>> = BinaryHeap::with_capacity(ef * 2);
        let mut results: BinaryHeap<Scored> = BinaryHeap::with_capacity(ef + 1);

        let entry_dist = OrderedFloat(self.distance_to_node(query, entry));
        candidates.push(Reverse((entry_dist, entry)));
        results.push((entry_dist, entry));
        visited.insert(entry);

        while let Some(Reverse((dist, current))) = candidates.pop() {
            let worst = results.peek().map(|r| r.0).unwrap_or(dist);
            if results.len() >= ef && dist > worst {
                break;
            }

            let Some(neighbors) = self.nodes[current].layers.get(layer) else {
                continue;
            };

            for &neighbor in neighbors {
                if !visited.insert(neighbor) {
                    continue;
                }
                let d = OrderedFloat(self.distance_to_node(query, neighbor));
                let worst = results.peek().map(|r| r.0).unwrap_or(d);
                if results.len() < ef || d < worst {
                    candidates.push(Reverse((d, neighbor)));
                    results.push((d, neighbor));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<(usize, f32)> = results.into_iter().map(|(d, i)| (i, d.0)).collect();
        out.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        out
    }

    fn insert(&mut self, idx: usize, layer: usize) {
        debug_assert_eq!(idx, self.nodes.len());
        self.nodes.push(HnswNode {
            layers: vec![Vec::new(); layer + 1],
        });

        if idx == 0 {
            self.entry_point = 0;
            self.top_layer = layer;
            return;
        }

        let query = self.get_vector(idx).to_vec();
        let mut entry = self.entry_point;

        // Greedy descent through layers above the new node's own
        let mut current = self.top_layer;
        while current > layer {
            if let Some(&(nearest, _)) = self.search_layer(&query, entry, 1, current).first() {
                entry = nearest;
            }
            current -= 1;
        }

        for l in (0..=layer.min(self.top_layer)).rev() {
            let found = self.search_layer(&query, entry, self.params.ef_construction, l);
            let neighbors: Vec<usize> = found
                .iter()
                .filter(|(n, _)| *n != idx)
                .take(self.layer_capacity(l))
                .map(|(n, _)| *n)
                .collect();

            for &neighbor in &neighbors {
                self.link(neighbor, idx, l);
            }
            self.nodes[idx].layers[l] = neighbors;

            if let Some(&(nearest, _)) = found.first() {
                entry = nearest;
            }
        }

        if layer > self.top_layer {
            self.top_layer = layer;
            self.entry_point = idx;
        }
    }

    /// Add a back link `from -> to`, pruning `from`'s list to its nearest when full.
    fn link(&mut self, from: usize, to: usize, layer: usize) {
        let capacity = self.layer_capacity(layer);
        let Some(links) = self.nodes[from].layers.get(layer) else {
            return;
        };

        let mut links = links.clone();
        links.push(to);
        if links.len() > capacity {
            let base = self.get_vector(from).to_vec();
            links.sort_by(|&a, &b| {
                let da = self.distance_to_node(&base, a);
                let db = self.distance_to_node(&base, b);
                da.total_cmp(&db).then(a.cmp(&b))
            });
            links.truncate(capacity);
        }
        self.nodes[from].layers[layer] = links;
    }
}

impl NeighborSearch for HnswIndex {
    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if self.nodes.is_empty() || k == 0 || query.len() != self.dim {
            return Vec::new();
        }

        let q = vector::normalized(query);
        let ef = self.params.ef_search.max(k);

        let mut entry = self.entry_point;
        for layer in (1..=self.top_layer).rev() {
            if let Some(&(nearest, _)) = self.search_layer(&q, entry, 1, layer).first() {
                entry = nearest;
            }
        }

        let mut results = self.search_layer(&q, entry, ef, 0);
        results.truncate(k);
        results
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn dim(&self) -> usize {
        self.dim
    }
}
