//! # Lookalike
//!
//! A fashion recommender that finds items which look alike.
//!
//! Two kinds of request are served:
//!
//! - **similar to item**: nearest neighbors of an item's image embedding;
//! - **by quiz**: free-text quiz answers matched against the catalog with
//!   TF-IDF, then re-ranked by closeness to the visual centroid of the matches.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! lookalike build-index --data-dir ./data/processed --kind hnsw
//! lookalike serve --data-dir ./data/processed --images-dir ./data/processed/images
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use lookalike::prelude::*;
//!
//! let store = ArtifactStore::open("./data/processed").unwrap();
//! let resources = store.load_resources(LoadOptions::default()).unwrap();
//! let engine = RecommendationEngine::new(resources).unwrap();
//!
//! let similar = engine.recommend_similar_to_item("15970", 10).unwrap();
//! let quiz = engine
//!     .recommend_by_query(&["casual", "navy blue", "summer"], Some("Men"), 10)
//!     .unwrap();
//! ```
//!
//! ## Crate Structure
//!
//! - `lookalike-core` - Data model, vector math, TF-IDF, neighbor indexes and ranking
//! - `lookalike-storage` - Artifact files (catalog, embeddings, neighbor index)
//! - `lookalike-api` - REST API and static image serving

// Re-export core types
pub use lookalike_core::{
    AudienceFilter, CatalogSchema, EmbeddingMatrix, Error, Filter, Gender, HnswParams, IndexKind, Item,
    NeighborIndex, RecommendMode, RecommendationEngine, Recommendations, Resources, Result,
    ScoredCandidate, TextModel,
};

// Re-export storage
pub use lookalike_storage::{ArtifactStore, LoadOptions};

// Re-export API
pub use lookalike_api::{ApiConfig, RestApi};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ApiConfig, ArtifactStore, CatalogSchema, EmbeddingMatrix, Error, HnswParams, IndexKind, Item,
        LoadOptions, RecommendationEngine, Recommendations, Resources, RestApi, Result, ScoredCandidate,
    };
}
