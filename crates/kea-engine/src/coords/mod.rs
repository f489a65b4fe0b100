//! Coordinate and geometry value types shared by the scene and renderers.
//!
//! Canonical CPU space:
//! - world pixels
//! - origin top-left
//! - +X right, +Y down
//!
//! Renderers convert to NDC in shaders using a resolution uniform.

mod rect;
mod vec2;
mod viewport;

pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
