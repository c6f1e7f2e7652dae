use crate::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Sparse vector with strictly increasing indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseVector {
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(Error::InvalidInput(format!(
                "sparse vector has {} indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        if indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidInput(
                "sparse vector indices must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { indices, values })
    }

    /// Build from unordered `(index, value)` pairs. Duplicate indices are summed.
    pub fn from_pairs(mut pairs: Vec<(u32, f32)>) -> Self {
        pairs.sort_unstable_by_key(|(i, _)| *i);
        let mut indices: Vec<u32> = Vec::with_capacity(pairs.len());
        let mut values: Vec<f32> = Vec::with_capacity(pairs.len());
        for (i, v) in pairs {
            if indices.last() == Some(&i) {
                if let Some(last) = values.last_mut() {
                    *last += v;
                }
            } else {
                indices.push(i);
                values.push(v);
            }
        }
        Self { indices, values }
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn l2_normalize(&mut self) {
        crate::vector::normalize(&mut self.values);
    }
}

/// Compressed sparse row matrix, one row per catalog item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SparseMatrix {
    cols: usize,
    indptr: Vec<usize>,
    indices: Vec<u32>,
    data: Vec<f32>,
}

impl SparseMatrix {
    pub fn from_rows(cols: usize, rows: Vec<SparseVector>) -> Result<Self> {
        let nnz = rows.iter().map(SparseVector::nnz).sum();
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::with_capacity(nnz);
        let mut data = Vec::with_capacity(nnz);
        indptr.push(0);

        for row in rows {
            if let Some(&last) = row.indices.last() {
                if last as usize >= cols {
                    return Err(Error::InvalidInput(format!(
                        "column index {} out of range for {} columns",
                        last, cols
                    )));
                }
            }
            indices.extend_from_slice(&row.indices);
            data.extend_from_slice(&row.values);
            indptr.push(indices.len());
        }

        Ok(Self {
            cols,
            indptr,
            indices,
            data,
        })
    }

    #[inline]
    #[must_use]
    pub fn rows(&self) -> usize {
        self.indptr.len().saturating_sub(1)
    }

    #[inline]
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn row(&self, i: usize) -> (&[u32], &[f32]) {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        (&self.indices[start..end], &self.data[start..end])
    }

    /// Dot product of every row with `query`, in row order.
    pub fn dot_vector(&self, query: &SparseVector) -> Result<Vec<f32>> {
        if let Some(&last) = query.indices.last() {
            if last as usize >= self.cols {
                return Err(Error::InvalidDimension {
                    expected: self.cols,
                    actual: last as usize + 1,
                });
            }
        }

        if query.is_empty() {
            return Ok(vec![0.0; self.rows()]);
        }

        // Scatter once so each row is a gather over its own non-zeros
        let mut dense = vec![0.0f32; self.cols];
        for (&i, &v) in query.indices.iter().zip(&query.values) {
            dense[i as usize] = v;
        }

        Ok((0..self.rows())
            .into_par_iter()
            .map(|r| {
                let (idx, vals) = self.row(r);
                idx.iter().zip(vals).map(|(&c, &v)| v * dense[c as usize]).sum()
            })
            .collect())
    }
}
