use crate::error::{GridError, GridResult};
use serde::{Deserialize, Serialize};

/// Dimensions of a grid, stack or weight bank, outermost axis first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements. A product that does not fit in `usize` is
    /// a `ShapeMismatch` against no representable length.
    pub fn numel(&self) -> GridResult<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| GridError::ShapeMismatch {
                expected: self.dims.clone(),
                got: vec![],
            })
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.dims.clone()
    }

    /// Compute row-major (C-order) strides.
    pub fn strides(&self) -> Vec<usize> {
        if self.dims.is_empty() {
            return vec![];
        }
        let mut strides = vec![1usize; self.dims.len()];
        for i in (0..self.dims.len() - 1).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Flat row-major offset of `indices`, bounds-checked per axis.
    pub fn offset(&self, indices: &[usize]) -> GridResult<usize> {
        if indices.len() != self.ndim() {
            return Err(GridError::ShapeMismatch {
                expected: vec![self.ndim()],
                got: vec![indices.len()],
            });
        }
        let mut flat = 0;
        for (axis, ((&idx, &size), stride)) in indices
            .iter()
            .zip(&self.dims)
            .zip(self.strides())
            .enumerate()
        {
            if idx >= size {
                return Err(GridError::IndexOutOfBounds { index: idx, axis, size });
            }
            flat += idx * stride;
        }
        Ok(flat)
    }

    /// Fail with `ShapeMismatch` unless `self` equals `expected`.
    pub fn ensure(&self, expected: &[usize]) -> GridResult<()> {
        if self.dims != expected {
            return Err(GridError::mismatch(expected, &self.dims));
        }
        Ok(())
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, ")")
    }
}
