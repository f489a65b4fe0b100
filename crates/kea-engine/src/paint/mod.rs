//! Color model shared by renderers.
//!
//! Colors are linear premultiplied RGBA. Geometry types live in `coords`.

pub mod color;

pub use color::Color;
