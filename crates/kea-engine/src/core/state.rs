use anyhow::Result;

use crate::coords::Viewport;
use crate::scene::Scene;
use crate::time::FrameTime;

/// Control directive returned by state callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Per-tick context passed to [`State::update`].
pub struct FrameCtx<'a> {
    pub scene: &'a mut Scene,
    pub time: FrameTime,
    /// Stage size in logical pixels.
    pub viewport: Viewport,
}

/// Gameplay contract: build the scene once, then mutate it every tick.
///
/// The renderer only reads the scene after `update` returns.
pub trait State {
    /// Called once before the first tick.
    fn create(&mut self, scene: &mut Scene) -> Result<()>;

    /// Called once per tick, before the frame is rendered.
    fn update(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        let _ = ctx;
        AppControl::Continue
    }
}
