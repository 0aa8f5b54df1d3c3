pub mod grid;
pub mod stack;
pub mod view;
pub mod shape;
pub mod dtype;
pub mod error;

pub use grid::Grid;
pub use stack::{GridStack, WeightBank};
pub use shape::Shape;
pub use view::GridView;
pub use dtype::Float;
pub use error::{GridError, GridResult};
