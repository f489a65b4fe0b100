//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating and configuring the Surface (swapchain)
//! - acquiring frames and providing encoders/views for rendering

mod gpu;
mod surface;

pub use gpu::{Gpu, GpuFrame, GpuInit};
pub use surface::SurfaceErrorAction;
