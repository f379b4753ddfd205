//! A minimal compressed-sparse-row matrix for evaluation results.
//!
//! Discretized linear operators are overwhelmingly sparse (diagonals and
//! banded stencils), and evaluation must keep them sparse: densifying a
//! diagonal just to take its sign would square the memory cost. This type
//! stores the classic three-array CSR layout (`row_ptr` of length
//! `n_rows + 1`, parallel `col_idx`/`values` for the stored entries) and
//! supports exactly what the evaluator needs: construction from triplets or
//! a diagonal, mapping stored values, and dense conversion.

use ndarray::Array2;
use std::hash::{Hash, Hasher};

/// A sparse matrix in compressed-sparse-row form.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Builds a matrix from `(row, col, value)` triplets. Triplets may be
    /// given in any order; duplicates are summed.
    pub fn from_triplets(
        n_rows: usize,
        n_cols: usize,
        triplets: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Self {
        let mut entries: std::collections::BTreeMap<(usize, usize), f64> =
            std::collections::BTreeMap::new();
        for (row, col, value) in triplets {
            assert!(row < n_rows && col < n_cols, "triplet out of bounds");
            *entries.entry((row, col)).or_insert(0.0) += value;
        }

        let mut row_ptr = vec![0; n_rows + 1];
        let mut col_idx = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        for (&(row, col), &value) in &entries {
            row_ptr[row + 1] += 1;
            col_idx.push(col);
            values.push(value);
        }
        for row in 0..n_rows {
            row_ptr[row + 1] += row_ptr[row];
        }
        Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// A square matrix with the given values on the main diagonal.
    pub fn from_diagonal(diagonal: &[f64]) -> Self {
        let n = diagonal.len();
        Self::from_triplets(n, n, diagonal.iter().enumerate().map(|(i, &v)| (i, i, v)))
    }

    pub fn nrows(&self) -> usize {
        self.n_rows
    }

    pub fn ncols(&self) -> usize {
        self.n_cols
    }

    /// The number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// The stored entry at `(row, col)`, or zero.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let range = self.row_ptr[row]..self.row_ptr[row + 1];
        for i in range {
            if self.col_idx[i] == col {
                return self.values[i];
            }
        }
        0.0
    }

    /// Applies `f` to every stored value, keeping the sparsity pattern.
    ///
    /// Only valid for maps with `f(0) == 0` (negation, absolute value,
    /// sign, floor, ceiling); anything else would need the unstored zeros.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            values: self.values.iter().map(|&v| f(v)).collect(),
            ..self.clone()
        }
    }

    /// The main diagonal as a vector.
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n_rows.min(self.n_cols))
            .map(|i| self.get(i, i))
            .collect()
    }

    /// Expands to a dense array.
    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.n_rows, self.n_cols));
        for row in 0..self.n_rows {
            for i in self.row_ptr[row]..self.row_ptr[row + 1] {
                dense[[row, self.col_idx[i]]] = self.values[i];
            }
        }
        dense
    }

    /// Feeds shape, pattern and value bits into a structural-id hash.
    pub(crate) fn hash_structure<H: Hasher>(&self, state: &mut H) {
        self.n_rows.hash(state);
        self.n_cols.hash(state);
        self.row_ptr.hash(state);
        self.col_idx.hash(state);
        for v in &self.values {
            v.to_bits().hash(state);
        }
    }
}
