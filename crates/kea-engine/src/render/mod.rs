//! Rendering backends.
//!
//! Both backends consume the scene's [`DrawList`](crate::scene::DrawList):
//! - [`GlRenderer`] batches quads into wgpu vertex buffers, one draw call per texture run
//! - [`CanvasRenderer`] replays leaves on a [`Canvas2d`]
//!
//! Convention:
//! - CPU geometry is in world pixels (top-left origin, +Y down)
//! - the camera matrix is applied as the model-view transform

mod config;
mod ctx;
mod error;
mod gpu;
mod stack;

pub mod batch;
pub mod buffers;
pub mod canvas;

pub use batch::{BatchRange, FrameStats, SpriteBatch};
pub use canvas::{Canvas2d, CanvasRenderer, SoftwareCanvas};
pub use config::{DEFAULT_MAX_ITEMS, MAX_QUADS, OverflowPolicy, RenderBackend, RendererConfig};
pub use ctx::{RenderCtx, RenderTarget};
pub use error::{RenderError, SceneError};
pub use gpu::GlRenderer;
pub use stack::MatrixStack;
