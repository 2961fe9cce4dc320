pub mod geometry;
pub mod types;

pub use geometry::*;
pub use types::*;
