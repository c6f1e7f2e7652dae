//! Resource store
//!
//! Holds the fitted artifacts as one immutable [`Snapshot`]. Readers clone the
//! `Arc` of the current snapshot and keep working against it; replacing the
//! artifacts publishes a new snapshot with a pointer swap, so an in-flight
//! request never sees a mix of old and new arrays.

use crate::index::{NeighborIndex, NeighborSearch};
use crate::item::Item;
use crate::matrix::EmbeddingMatrix;
use crate::sparse::SparseMatrix;
use crate::tfidf::{TextModel, TfidfVectorizer};
use crate::{Error, Result};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything the engine is initialized from. The optional parts may be
/// missing; the engine then runs in a degraded mode instead of failing.
#[derive(Debug, Clone)]
pub struct Resources {
    pub embeddings: EmbeddingMatrix,
    pub items: Vec<Item>,
    pub neighbor_index: Option<NeighborIndex>,
    pub text_vectorizer: Option<TfidfVectorizer>,
    pub text_matrix: Option<SparseMatrix>,
}

impl Resources {
    #[must_use]
    pub fn new(embeddings: EmbeddingMatrix, items: Vec<Item>) -> Self {
        Self {
            embeddings,
            items,
            neighbor_index: None,
            text_vectorizer: None,
            text_matrix: None,
        }
    }

    #[must_use]
    pub fn with_neighbor_index(mut self, index: NeighborIndex) -> Self {
        self.neighbor_index = Some(index);
        self
    }

    #[must_use]
    pub fn with_text_model(mut self, model: TextModel) -> Self {
        self.text_vectorizer = Some(model.vectorizer);
        self.text_matrix = Some(model.matrix);
        self
    }
}

/// Validated, read-only view of the artifacts.
#[derive(Debug)]
pub struct Snapshot {
    embeddings: EmbeddingMatrix,
    items: Vec<Arc<Item>>,
    rows_by_id: AHashMap<String, usize>,
    neighbor_index: Option<NeighborIndex>,
    text_model: Option<TextModel>,
}

impl Snapshot {
    /// Check the alignment invariant and build the id lookup.
    pub fn new(resources: Resources) -> Result<Self> {
        let Resources {
            embeddings,
            items,
            neighbor_index,
            text_vectorizer,
            text_matrix,
        } = resources;

        if embeddings.is_empty() {
            return Err(Error::config("embedding matrix is empty"));
        }
        if items.is_empty() {
            return Err(Error::config("item index table is empty"));
        }
        if items.len() != embeddings.rows() {
            return Err(Error::config(format!(
                "index table has {} items but the embedding matrix has {} rows",
                items.len(),
                embeddings.rows()
            )));
        }

        let mut rows_by_id = AHashMap::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            if item.row != pos {
                return Err(Error::config(format!(
                    "item `{}` claims row {} but sits at position {}",
                    item.id, item.row, pos
                )));
            }
            if rows_by_id.insert(item.id.clone(), pos).is_some() {
                return Err(Error::config(format!("duplicate item id `{}`", item.id)));
            }
        }

        if let Some(index) = &neighbor_index {
            index.validate()?;
            if index.len() != embeddings.rows() || index.dim() != embeddings.dim() {
                return Err(Error::config(format!(
                    "neighbor index covers {} x {} but embeddings are {} x {}",
                    index.len(),
                    index.dim(),
                    embeddings.rows(),
                    embeddings.dim()
                )));
            }
        }

        let text_model = match (text_vectorizer, text_matrix) {
            (Some(vectorizer), Some(matrix)) => {
                if matrix.rows() != embeddings.rows() {
                    return Err(Error::config(format!(
                        "text matrix has {} rows but the embedding matrix has {}",
                        matrix.rows(),
                        embeddings.rows()
                    )));
                }
                if matrix.cols() != vectorizer.vocabulary_size() {
                    return Err(Error::config(format!(
                        "text matrix has {} columns but the vocabulary has {} terms",
                        matrix.cols(),
                        vectorizer.vocabulary_size()
                    )));
                }
                Some(TextModel { vectorizer, matrix })
            }
            (None, None) => None,
            (vectorizer, _) => {
                let missing = if vectorizer.is_some() { "text matrix" } else { "text vectorizer" };
                warn!("{} is missing; text queries fall back to index order", missing);
                None
            }
        };

        Ok(Self {
            embeddings,
            items: items.into_iter().map(Arc::new).collect(),
            rows_by_id,
            neighbor_index,
            text_model,
        })
    }

    #[inline]
    pub fn embeddings(&self) -> &EmbeddingMatrix {
        &self.embeddings
    }

    #[inline]
    pub fn items(&self) -> &[Arc<Item>] {
        &self.items
    }

    #[inline]
    pub fn item(&self, row: usize) -> Option<&Arc<Item>> {
        self.items.get(row)
    }

    #[inline]
    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.rows_by_id.get(id).copied()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn neighbor_index(&self) -> Option<&NeighborIndex> {
        self.neighbor_index.as_ref()
    }

    #[inline]
    pub fn text_model(&self) -> Option<&TextModel> {
        self.text_model.as_ref()
    }

    #[inline]
    pub fn has_neighbor_index(&self) -> bool {
        self.neighbor_index.is_some()
    }

    #[inline]
    pub fn has_text_model(&self) -> bool {
        self.text_model.is_some()
    }
}

/// Publishes the current [`Snapshot`] to concurrent readers.
pub struct ResourceStore {
    current: RwLock<Arc<Snapshot>>,
}

impl ResourceStore {
    pub fn initialize(resources: Resources) -> Result<Self> {
        let snapshot = Snapshot::new(resources)?;
        log_snapshot(&snapshot);
        Ok(Self {
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Validate and atomically swap in a new snapshot. On error the current
    /// snapshot stays active.
    pub fn replace(&self, resources: Resources) -> Result<()> {
        let snapshot = Arc::new(Snapshot::new(resources)?);
        log_snapshot(&snapshot);
        *self.current.write() = snapshot;
        Ok(())
    }

    #[inline]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }
}

fn log_snapshot(snapshot: &Snapshot) {
    info!(
        items = snapshot.len(),
        dim = snapshot.embeddings().dim(),
        neighbor_index = snapshot.has_neighbor_index(),
        text_model = snapshot.has_text_model(),
        "resource snapshot ready"
    );
    if !snapshot.has_neighbor_index() {
        warn!("no neighbor index loaded; visual retrieval uses brute-force cosine");
    }
    if !snapshot.has_text_model() {
        warn!("no text model loaded; quiz queries fall back to index order");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hnsw::HnswParams;
    use crate::index::IndexKind;

    fn items(n: usize) -> Vec<Item> {
        (0..n).map(|i| Item::new(i.to_string(), i, format!("{}.jpg", i))).collect()
    }

    fn embeddings(n: usize) -> EmbeddingMatrix {
        EmbeddingMatrix::from_rows((0..n).map(|i| vec![i as f32 + 1.0, 1.0]).collect()).unwrap()
    }

    #[test]
    fn test_initialize_valid() {
        let store = ResourceStore::initialize(Resources::new(embeddings(3), items(3))).unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.row_of("2"), Some(2));
        assert_eq!(snap.row_of("9"), None);
        assert!(!snap.has_neighbor_index());
        assert!(!snap.has_text_model());
    }

    #[test]
    fn test_row_count_mismatch_is_fatal() {
        let err = ResourceStore::initialize(Resources::new(embeddings(3), items(2))).err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_empty_inputs_are_fatal() {
        let empty = EmbeddingMatrix::from_rows(Vec::new()).unwrap();
        assert!(ResourceStore::initialize(Resources::new(empty, Vec::new())).is_err());
        assert!(ResourceStore::initialize(Resources::new(embeddings(2), Vec::new())).is_err());
    }

    #[test]
    fn test_misplaced_row_rejected() {
        let mut its = items(2);
        its[1].row = 0;
        assert!(ResourceStore::initialize(Resources::new(embeddings(2), its)).is_err());
    }

    #[test]
    fn test_text_matrix_alignment_checked() {
        let model = TextModel::fit(&["red dress", "blue jeans"]).unwrap();
        let res = Resources::new(embeddings(3), items(3)).with_text_model(model);
        assert!(ResourceStore::initialize(res).is_err());
    }

    #[test]
    fn test_half_text_model_degrades() {
        let model = TextModel::fit(&["red dress", "blue jeans"]).unwrap();
        let mut res = Resources::new(embeddings(2), items(2));
        res.text_vectorizer = Some(model.vectorizer);
        let store = ResourceStore::initialize(res).unwrap();
        assert!(!store.snapshot().has_text_model());
    }

    #[test]
    fn test_neighbor_index_alignment_checked() {
        let index = NeighborIndex::build(IndexKind::Flat, &embeddings(2), HnswParams::default());
        let res = Resources::new(embeddings(3), items(3)).with_neighbor_index(index);
        assert!(ResourceStore::initialize(res).is_err());
    }

    #[test]
    fn test_corrupt_decoded_index_is_fatal() {
        // Two rows' worth of length, but the buffer ends mid-row
        let index: NeighborIndex =
            serde_json::from_str(r#"{"Flat":{"dim":2,"vectors":[1.0,0.0,0.7,0.7,0.1]}}"#).unwrap();
        let res = Resources::new(embeddings(2), items(2)).with_neighbor_index(index);
        let err = ResourceStore::initialize(res).err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));

        let mut json = serde_json::to_value(NeighborIndex::build(IndexKind::Hnsw, &embeddings(3), HnswParams::default())).unwrap();
        json["Hnsw"]["entry_point"] = serde_json::json!(7);
        let index: NeighborIndex = serde_json::from_value(json).unwrap();
        let res = Resources::new(embeddings(3), items(3)).with_neighbor_index(index);
        assert!(matches!(ResourceStore::initialize(res).err().unwrap(), Error::Configuration(_)));
    }

    #[test]
    fn test_replace_swaps_snapshot() {
        let store = ResourceStore::initialize(Resources::new(embeddings(2), items(2))).unwrap();
        let old = store.snapshot();

        store.replace(Resources::new(embeddings(4), items(4))).unwrap();
        assert_eq!(old.len(), 2, "in-flight readers keep their snapshot");
        assert_eq!(store.snapshot().len(), 4);

        assert!(store.replace(Resources::new(embeddings(4), items(1))).is_err());
        assert_eq!(store.snapshot().len(), 4);
    }
}
