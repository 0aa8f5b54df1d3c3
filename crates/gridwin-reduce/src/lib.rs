//! Sliding-window reductions over 2-D grids: max and mean pooling, and
//! cross-correlation with single-channel, multi-input and multi-output
//! weights.

pub mod config;
pub mod kind;
pub mod reducer;
pub mod stage;
pub mod window;

pub use config::{ConfigError, ReducerConfig};
pub use kind::Reduction;
pub use reducer::SlidingWindowReducer;
pub use stage::{AvgPool2d, Correlate2d, MaxPool2d, Pipeline, Stage};
pub use window::{out_dim, Window};
