pub mod artifacts;

pub use artifacts::{
    ArtifactStore, LoadOptions, CATALOG_FILE, EMBEDDINGS_FILE, NEIGHBOR_INDEX_FILE, SCHEMA_FILE,
};
