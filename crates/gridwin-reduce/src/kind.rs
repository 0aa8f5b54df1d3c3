use serde::{Deserialize, Serialize};
use std::fmt;

/// How the elements of one window collapse into one output cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Largest element of the window (max pooling).
    Max,
    /// Arithmetic mean of the window (average pooling).
    Mean,
    /// Element-wise product with a same-shaped weight grid, summed
    /// (cross-correlation, weights not flipped).
    WeightedSum,
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reduction::Max => "max",
            Reduction::Mean => "mean",
            Reduction::WeightedSum => "weighted_sum",
        };
        f.write_str(name)
    }
}
