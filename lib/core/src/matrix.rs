use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Dense row-major `rows x dim` matrix of item embeddings.
///
/// Row `i` belongs to the item at position `i` of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawEmbeddingMatrix")]
pub struct EmbeddingMatrix {
    rows: usize,
    dim: usize,
    data: Vec<f32>,
}

/// Wire form; every decoded matrix goes through [`EmbeddingMatrix::new`].
#[derive(Deserialize)]
struct RawEmbeddingMatrix {
    rows: usize,
    dim: usize,
    data: Vec<f32>,
}

impl TryFrom<RawEmbeddingMatrix> for EmbeddingMatrix {
    type Error = Error;

    fn try_from(raw: RawEmbeddingMatrix) -> Result<Self> {
        EmbeddingMatrix::new(raw.rows, raw.dim, raw.data)
    }
}

impl EmbeddingMatrix {
    pub fn new(rows: usize, dim: usize, data: Vec<f32>) -> Result<Self> {
        if rows.checked_mul(dim) != Some(data.len()) {
            return Err(Error::config(format!(
                "embedding buffer has {} values, expected {} x {}",
                data.len(),
                rows,
                dim
            )));
        }
        Ok(Self { rows, dim, data })
    }

    /// Build from one vector per row. All rows must share the first row's length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in &rows {
            if row.len() != dim {
                return Err(Error::InvalidDimension {
                    expected: dim,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            dim,
            data,
        })
    }

    #[inline]
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.dim == 0
    }

    /// Panics if `i` is out of bounds, like slice indexing.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        let start = i * self.dim;
        &self.data[start..start + self.dim]
    }

    #[inline]
    pub fn get_row(&self, i: usize) -> Option<&[f32]> {
        (i < self.rows).then(|| self.row(i))
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact(0) panics, and a zero-dim matrix has no rows worth yielding
        self.data.chunks_exact(self.dim.max(1)).take(if self.dim == 0 { 0 } else { self.rows })
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_short_buffer() {
        let err = serde_json::from_str::<EmbeddingMatrix>(r#"{"rows":2,"dim":2,"data":[1.0,0.0]}"#).unwrap_err();
        assert!(err.to_string().contains("embedding buffer has 2 values"));

        let ok: EmbeddingMatrix = serde_json::from_str(r#"{"rows":1,"dim":2,"data":[1.0,0.0]}"#).unwrap();
        assert_eq!(ok.row(0), &[1.0, 0.0]);
    }

    #[test]
    fn test_from_rows() {
        let m = EmbeddingMatrix::from_rows(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]).unwrap();
        assert_eq!(m.rows(), 3);
        assert_eq!(m.dim(), 2);
        assert_eq!(m.row(2), &[0.5, 0.5]);
        assert!(m.get_row(3).is_none());
        assert_eq!(m.iter_rows().count(), 3);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = EmbeddingMatrix::from_rows(vec![vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, Error::InvalidDimension { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_buffer_size_checked() {
        assert!(EmbeddingMatrix::new(2, 3, vec![0.0; 5]).is_err());
        assert!(EmbeddingMatrix::new(2, 3, vec![0.0; 6]).is_ok());
    }

    #[test]
    fn test_empty() {
        let m = EmbeddingMatrix::from_rows(Vec::new()).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.iter_rows().count(), 0);
    }
}
