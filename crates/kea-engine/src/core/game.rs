use std::time::Duration;

use anyhow::{Context, Result};

use crate::coords::Viewport;
use crate::device::GpuInit;
use crate::render::{CanvasRenderer, FrameStats, RenderBackend, RendererConfig, SoftwareCanvas};
use crate::scene::Scene;
use crate::time::{FrameClock, FrameTime};

use super::{AppControl, FrameCtx, State};

/// Everything needed to start a game.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub title: String,
    /// Stage size in logical pixels.
    pub width: u32,
    pub height: u32,
    pub backend: RenderBackend,
    pub renderer: RendererConfig,
    pub gpu: GpuInit,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            title: "kea".to_string(),
            width: 800,
            height: 600,
            backend: RenderBackend::Gpu,
            renderer: RendererConfig::default(),
            gpu: GpuInit::default(),
        }
    }
}

impl GameConfig {
    #[inline]
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width as f32, self.height as f32)
    }
}

/// A scene plus the state that drives it.
///
/// `tick` runs the update phase; rendering is left to the caller (window
/// runtime or [`Game::run_headless`]).
pub struct Game<S: State> {
    config: GameConfig,
    scene: Scene,
    state: S,
}

impl<S: State> Game<S> {
    /// Builds the scene and calls [`State::create`].
    pub fn new(config: GameConfig, mut state: S) -> Result<Self> {
        let mut scene = Scene::new(config.viewport());
        state.create(&mut scene).context("state create failed")?;
        log::info!("{}: scene created with {} nodes", config.title, scene.node_count());
        Ok(Self { config, scene, state })
    }

    #[inline]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[inline]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[inline]
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    #[inline]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Stage resize.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.scene.camera.set_viewport(viewport);
    }

    /// Update phase: animations, then the state's own update.
    pub fn tick(&mut self, time: FrameTime) -> AppControl {
        self.scene.update(time.dt);
        let viewport = self.scene.camera.viewport();
        let mut ctx = FrameCtx { scene: &mut self.scene, time, viewport };
        self.state.update(&mut ctx)
    }

    /// Runs `frames` fixed-step ticks through the software canvas.
    ///
    /// Returns the canvas and the stats of the last frame.
    pub fn run_headless(&mut self, frames: u64, dt: Duration) -> Result<(SoftwareCanvas, FrameStats)> {
        let mut canvas = SoftwareCanvas::new(self.config.width, self.config.height)?;
        let mut renderer = CanvasRenderer::new(self.config.renderer.clear_color);
        let mut clock = FrameClock::new();
        let mut stats = FrameStats::default();

        for _ in 0..frames {
            let time = clock.step(dt);
            if self.tick(time) == AppControl::Exit {
                log::info!("state requested exit after {} frames", time.frame_index + 1);
                break;
            }
            stats = renderer
                .render(&mut canvas, &mut self.scene)
                .with_context(|| format!("frame {} failed", time.frame_index))?;
        }

        Ok((canvas, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Transform;
    use crate::scene::{AtlasImage, NodeId, Sprite, TextureAtlas};

    #[derive(Default)]
    struct Mover {
        node: Option<NodeId>,
        ticks: u32,
    }

    impl State for Mover {
        fn create(&mut self, scene: &mut Scene) -> Result<()> {
            let image = AtlasImage::from_fn(2, 2, |_, _| [0, 255, 0, 255])?;
            let atlas = scene.add_atlas(TextureAtlas::single("px", image));
            self.node = Some(scene.add_sprite(None, Transform::default(), Sprite::new(atlas, 0))?);
            Ok(())
        }

        fn update(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
            self.ticks += 1;
            if let Some(t) = self.node.and_then(|n| ctx.scene.transform_mut(n)) {
                t.translate(1.0, 0.0);
            }
            if self.ticks == 3 { AppControl::Exit } else { AppControl::Continue }
        }
    }

    fn small() -> GameConfig {
        GameConfig { width: 16, height: 8, backend: RenderBackend::Canvas, ..Default::default() }
    }

    #[test]
    fn create_runs_before_first_tick() {
        let game = Game::new(small(), Mover::default()).unwrap();
        assert_eq!(game.scene().node_count(), 1);
        assert_eq!(game.state().ticks, 0);
    }

    #[test]
    fn headless_stops_on_exit() {
        let mut game = Game::new(small(), Mover::default()).unwrap();
        let (canvas, stats) = game.run_headless(10, Duration::from_millis(16)).unwrap();

        assert_eq!(game.state().ticks, 3);
        assert_eq!(stats.entities, 1);
        // Two rendered frames moved the sprite to x = 2.
        assert_eq!(canvas.pixel(2, 0), Some([0, 255, 0, 255]));
        assert_ne!(canvas.pixel(1, 0), Some([0, 255, 0, 255]));
    }
}
