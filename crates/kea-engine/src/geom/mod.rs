//! Affine matrices, transforms and the transform hierarchy.

pub mod matrix;
pub mod transform;
pub mod tree;

pub use matrix::Matrix;
pub use transform::{Transform, TransformId};
pub use tree::{MAX_HIERARCHY_DEPTH, TransformTree};
