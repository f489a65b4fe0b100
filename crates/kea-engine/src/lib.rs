//! kea engine crate.
//!
//! A 2D scene-graph engine: a dirty-tracked transform hierarchy, a scene of
//! groups, sprites and tile layers, and two renderers (batched wgpu and a
//! software canvas) fed from the same draw list.

pub mod coords;
pub mod core;
pub mod device;
pub mod geom;
pub mod logging;
pub mod paint;
pub mod render;
pub mod scene;
pub mod time;
pub mod window;
