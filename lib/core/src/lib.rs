//! # Lookalike Core
//!
//! The ranking core of the Lookalike recommender.
//!
//! Given precomputed image embeddings and catalog metadata, it answers two
//! kinds of request:
//!
//! - **similar to item**: nearest neighbors of an item's embedding
//!   ([`VisualRetriever`]), through a [`NeighborIndex`] when one is loaded
//!   and a brute-force cosine scan otherwise;
//! - **similar to a quiz**: TF-IDF candidates for the answers
//!   ([`TextCandidateGenerator`]) re-ranked against their visual centroid
//!   ([`HybridRanker`]).
//!
//! Both go through the [`RecommendationEngine`] facade, which reads an
//! immutable [`Snapshot`] of the artifacts from its [`ResourceStore`].
//!
//! ## Example
//!
//! ```rust
//! use lookalike_core::{EmbeddingMatrix, Item, RecommendationEngine, Resources};
//!
//! let embeddings = EmbeddingMatrix::from_rows(vec![
//!     vec![1.0, 0.0],
//!     vec![0.9, 0.1],
//!     vec![0.0, 1.0],
//! ]).unwrap();
//! let items = (0..3).map(|i| Item::new(i.to_string(), i, format!("{}.jpg", i))).collect();
//!
//! let engine = RecommendationEngine::new(Resources::new(embeddings, items)).unwrap();
//! let similar = engine.recommend_similar_to_item("0", 1).unwrap();
//! assert_eq!(similar[0].id(), "1");
//! ```

pub mod candidates;
pub mod engine;
pub mod error;
pub mod filter;
pub mod flat;
pub mod hnsw;
pub mod hybrid;
pub mod index;
pub mod item;
pub mod matrix;
pub mod retriever;
pub mod schema;
pub mod sparse;
pub mod store;
pub mod tfidf;
pub mod vector;

pub use candidates::{over_fetch_count, TextCandidateGenerator};
pub use engine::{QueryStats, RecommendMode, Recommendations, RecommendationEngine};
pub use error::{Error, Result};
pub use filter::{AudienceFilter, Filter};
pub use flat::FlatIndex;
pub use hnsw::{HnswIndex, HnswParams};
pub use hybrid::{min_max_normalize, HybridRanker, RankedList, TEXT_WEIGHT, VISUAL_WEIGHT};
pub use index::{IndexKind, NeighborIndex, NeighborSearch};
pub use item::{AudienceTags, Gender, Item, Metadata, ScoredCandidate};
pub use matrix::EmbeddingMatrix;
pub use retriever::VisualRetriever;
pub use schema::CatalogSchema;
pub use sparse::{SparseMatrix, SparseVector};
pub use store::{ResourceStore, Resources, Snapshot};
pub use tfidf::{TextModel, TfidfVectorizer};
