//! # gridwin
//!
//! Sliding-window reductions over 2-D numeric grids.
//!
//! ## Modules
//!
//! - **core**: `Grid`, `GridStack` (channels), `WeightBank` (multi-output weights), `GridError`
//! - **reduce**: `SlidingWindowReducer`: max/mean pooling and cross-correlation,
//!   `ReducerConfig`, and composable `Stage`s (`Correlate2d`, `MaxPool2d`, `AvgPool2d`, `Pipeline`)
//!
//! ```
//! use gridwin::core::Grid;
//! use gridwin::reduce::{Reduction, SlidingWindowReducer, Window};
//!
//! let x = Grid::from_rows(&[
//!     vec![0.0, 1.0, 2.0],
//!     vec![3.0, 4.0, 5.0],
//!     vec![6.0, 7.0, 8.0],
//! ])
//! .unwrap();
//! let k = Grid::from_rows(&[vec![0.0, 1.0], vec![2.0, 3.0]]).unwrap();
//!
//! let reducer = SlidingWindowReducer::default();
//! let y = reducer
//!     .reduce(&x, &Window::square(2), Reduction::WeightedSum, Some(&k))
//!     .unwrap();
//! assert_eq!(y.to_rows(), vec![vec![19.0, 25.0], vec![37.0, 43.0]]);
//! ```

/// Grid types and errors.
pub use gridwin_core as core;

/// Sliding-window reducer, config and stages.
pub use gridwin_reduce as reduce;

pub use gridwin_core::{Grid, GridError, GridStack, WeightBank};
pub use gridwin_reduce::{Reduction, ReducerConfig, SlidingWindowReducer, Window};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn arange3() -> Grid<f64> {
        Grid::new((0..9).map(|i| i as f64).collect(), 3, 3).unwrap()
    }

    #[test]
    fn test_pooling_values() {
        let r = SlidingWindowReducer::default();
        let x = arange3();
        let max = r.reduce(&x, &Window::square(2), Reduction::Max, None).unwrap();
        assert_eq!(max.to_rows(), vec![vec![4.0, 5.0], vec![7.0, 8.0]]);

        let mean = r.reduce(&x, &Window::square(2), Reduction::Mean, None).unwrap();
        for (got, want) in mean.data().iter().zip([2.0, 3.0, 5.0, 6.0]) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_config_drives_reducer() {
        let config = ReducerConfig::from_json_str(r#"{"parallel": true, "min_parallel_cells": 1}"#).unwrap();
        let parallel = SlidingWindowReducer::new(config);
        let serial = SlidingWindowReducer::default();
        let x: Grid<f32> = Grid::randn(16, 16, Some(9)).unwrap();
        let win = Window::new(3, 2).with_stride(2, 2);
        assert_eq!(
            parallel.reduce(&x, &win, Reduction::Mean, None).unwrap(),
            serial.reduce(&x, &win, Reduction::Mean, None).unwrap()
        );
    }

    #[test]
    fn test_oversize_window() {
        let r = SlidingWindowReducer::default();
        let err = r.reduce(&arange3(), &Window::new(3, 4), Reduction::Max, None).unwrap_err();
        assert_eq!(
            err,
            GridError::InvalidWindow { kernel: (3, 4), stride: (1, 1), grid: (3, 3) }
        );
        assert_eq!(
            err.to_string(),
            "Invalid window: kernel (3, 4) with stride (1, 1) does not fit grid (3, 3)"
        );
    }
}
