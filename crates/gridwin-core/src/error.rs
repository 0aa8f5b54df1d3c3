use thiserror::Error;

/// Error type shared by grid construction and the sliding-window reducer.
///
/// The reduce operations only ever produce `InvalidWindow`, `ShapeMismatch`
/// and `EmptyWindow`; the remaining variants come from building or indexing
/// grids.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("Invalid window: kernel {kernel:?} with stride {stride:?} does not fit grid {grid:?}")]
    InvalidWindow {
        kernel: (usize, usize),
        stride: (usize, usize),
        grid: (usize, usize),
    },

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Empty window: kernel has zero elements")]
    EmptyWindow,

    #[error("Empty grid: height and width must be at least 1")]
    EmptyGrid,

    #[error("Index out of bounds: index {index} for axis {axis} with size {size}")]
    IndexOutOfBounds {
        index: usize,
        axis: usize,
        size: usize,
    },
}

impl GridError {
    pub(crate) fn mismatch(expected: &[usize], got: &[usize]) -> Self {
        GridError::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }
}

pub type GridResult<T> = Result<T, GridError>;
