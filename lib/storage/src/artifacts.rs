// Artifact directory: catalog, embeddings, neighbor index, schema
use anyhow::{anyhow, Context, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use lookalike_core::{
    CatalogSchema, EmbeddingMatrix, HnswParams, IndexKind, Metadata, NeighborIndex, Resources, TextModel,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CATALOG_FILE: &str = "catalog.json";
pub const EMBEDDINGS_FILE: &str = "embeddings.bin";
pub const NEIGHBOR_INDEX_FILE: &str = "neighbor_index.bin";
pub const SCHEMA_FILE: &str = "schema.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Fit the TF-IDF model from catalog text.
    pub text_model: bool,
    /// Load `neighbor_index.bin` when present.
    pub neighbor_index: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            text_model: true,
            neighbor_index: true,
        }
    }
}

/// The processed-data directory produced by the offline pipeline.
pub struct ArtifactStore {
    data_dir: PathBuf,
}

impl ArtifactStore {
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        if !data_dir.is_dir() {
            return Err(anyhow!("data directory {:?} does not exist", data_dir));
        }
        Ok(Self { data_dir })
    }

    /// Like [`open`](Self::open), creating the directory if needed.
    pub fn create<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("creating data directory {:?}", data_dir))?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    pub fn load_schema(&self) -> Result<CatalogSchema> {
        let path = self.path(SCHEMA_FILE);
        if !path.exists() {
            return Ok(CatalogSchema::default());
        }
        let schema: CatalogSchema = read_json(&path)?;
        info!("Loaded catalog schema: {:?}", path);
        Ok(schema)
    }

    pub fn load_catalog(&self) -> Result<Vec<Metadata>> {
        let path = self.path(CATALOG_FILE);
        let records: Vec<Metadata> = read_json(&path)?;
        info!("Loaded catalog: {:?} ({} rows)", path, records.len());
        Ok(records)
    }

    pub fn load_embeddings(&self) -> Result<EmbeddingMatrix> {
        let path = self.path(EMBEDDINGS_FILE);
        let embeddings: EmbeddingMatrix = read_bincode(&path)?;
        info!(
            "Loaded embeddings: {:?} shape=({}, {})",
            path,
            embeddings.rows(),
            embeddings.dim()
        );
        Ok(embeddings)
    }

    /// `None` when the index file is absent; retrieval then falls back to brute force.
    pub fn load_neighbor_index(&self) -> Result<Option<NeighborIndex>> {
        let path = self.path(NEIGHBOR_INDEX_FILE);
        if !path.exists() {
            warn!("Neighbor index not found at {:?}; continuing without it", path);
            return Ok(None);
        }
        let index: NeighborIndex = read_bincode(&path)?;
        info!("Loaded neighbor index: {:?} ({:?})", path, index.kind());
        Ok(Some(index))
    }

    /// Everything the engine needs, with the text model fitted from the catalog.
    pub fn load_resources(&self, options: LoadOptions) -> Result<Resources> {
        let schema = self.load_schema()?;
        let records = self.load_catalog()?;
        let items = schema.resolve_all(&records)?;
        let embeddings = self.load_embeddings()?;

        let mut resources = Resources::new(embeddings, items);

        if options.neighbor_index {
            if let Some(index) = self.load_neighbor_index()? {
                resources = resources.with_neighbor_index(index);
            }
        }

        if options.text_model {
            let documents: Vec<String> = resources.items.iter().map(|i| schema.document_text(i)).collect();
            match TextModel::fit(&documents) {
                Ok(model) => {
                    info!(
                        "Built TF-IDF matrix: shape=({}, {})",
                        model.matrix.rows(),
                        model.matrix.cols()
                    );
                    resources = resources.with_text_model(model);
                }
                Err(e) => warn!("Text model unavailable: {}", e),
            }
        }

        Ok(resources)
    }

    pub fn save_schema(&self, schema: &CatalogSchema) -> Result<()> {
        write_atomic(&self.path(SCHEMA_FILE), &serde_json::to_vec_pretty(schema)?)
    }

    pub fn save_catalog(&self, records: &[Metadata]) -> Result<()> {
        write_atomic(&self.path(CATALOG_FILE), &serde_json::to_vec(records)?)
    }

    pub fn save_embeddings(&self, embeddings: &EmbeddingMatrix) -> Result<()> {
        write_atomic(&self.path(EMBEDDINGS_FILE), &to_bincode(embeddings)?)
    }

    pub fn save_neighbor_index(&self, index: &NeighborIndex) -> Result<()> {
        write_atomic(&self.path(NEIGHBOR_INDEX_FILE), &to_bincode(index)?)
    }

    /// Build a neighbor index over the stored embeddings and save it next to them.
    pub fn build_neighbor_index(&self, kind: IndexKind, params: HnswParams) -> Result<NeighborIndex> {
        let embeddings = self.load_embeddings()?;
        let started = std::time::Instant::now();
        let index = NeighborIndex::build(kind, &embeddings, params);
        info!(
            "Built {:?} neighbor index over {} rows in {:?}",
            kind,
            embeddings.rows(),
            started.elapsed()
        );
        self.save_neighbor_index(&index)?;
        info!("Saved neighbor index to {:?}", self.path(NEIGHBOR_INDEX_FILE));
        Ok(index)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read(path).with_context(|| format!("reading {:?}", path))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing {:?}", path))
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read(path).with_context(|| format!("reading {:?}", path))?;
    bincode::deserialize(&data).map_err(|e| anyhow!("Deserialization error in {:?}: {}", path, e))
}

fn to_bincode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| anyhow!("Serialization error: {}", e))
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| f.write_all(data))
        .with_context(|| format!("writing {:?}", path))
}
