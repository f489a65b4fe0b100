use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::coords::Viewport;
use crate::core::{AppControl, Game, State};
use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::render::{GlRenderer, RenderCtx, RenderTarget};
use crate::time::FrameClock;

/// How often (in frames) renderer stats are logged at debug level.
const STATS_LOG_INTERVAL: u64 = 300;

/// Windowed entry point: one window, one tick per redraw (update, then render).
pub struct Runtime;

impl Runtime {
    pub fn run<S>(game: Game<S>) -> Result<()>
    where
        S: State + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(game);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<S>
where
    S: State + 'static,
{
    game: Game<S>,
    renderer: GlRenderer,

    window: Option<WindowEntry>,
    window_id: Option<WindowId>,

    fatal: Option<anyhow::Error>,
    exit_requested: bool,
}

impl<S> AppState<S>
where
    S: State + 'static,
{
    fn new(game: Game<S>) -> Self {
        let renderer = GlRenderer::new(game.config().renderer.clone());
        Self {
            game,
            renderer,
            window: None,
            window_id: None,
            fatal: None,
            exit_requested: false,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let config = self.game.config();
        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(LogicalSize::new(config.width as f64, config.height as f64));

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init: GpuInit = config.gpu.clone();
        let entry = WindowEntryTryBuilder {
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed for window")?;

        let viewport = entry.with_window(|w| logical_viewport(w));
        self.game.set_viewport(viewport);
        self.window_id = Some(entry.with_window(|w| w.id()));
        self.window = Some(entry);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal = Some(err);
        self.exit_requested = true;
        event_loop.exit();
    }

    /// Update then render one frame.
    fn frame(&mut self) -> AppControl {
        let Some(entry) = self.window.as_mut() else {
            return AppControl::Continue;
        };

        // Split borrows; `ouroboros` closures cannot capture `self`.
        let (game, renderer) = (&mut self.game, &mut self.renderer);
        let mut control = AppControl::Continue;

        entry.with_mut(|fields| {
            let time = fields.clock.tick();
            control = game.tick(time);
            if control == AppControl::Exit {
                return;
            }

            let mut frame = match fields.gpu.begin_frame() {
                Ok(f) => f,
                Err(err) => {
                    if fields.gpu.handle_surface_error(err) == SurfaceErrorAction::Fatal {
                        control = AppControl::Exit;
                    }
                    return;
                }
            };

            let viewport = logical_viewport(fields.window);

            // RenderTarget borrows frame.encoder; dropped before submit() takes frame.
            {
                let rctx = RenderCtx::new(
                    fields.gpu.device(),
                    fields.gpu.queue(),
                    fields.gpu.surface_format(),
                    viewport,
                );
                let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);

                match renderer.render(&rctx, &mut target, game.scene_mut()) {
                    Ok(stats) if time.frame_index % STATS_LOG_INTERVAL == 0 => {
                        log::debug!(
                            "frame {}: {} entities, {} draw calls, {} dropped",
                            time.frame_index,
                            stats.entities,
                            stats.draw_calls,
                            stats.dropped
                        );
                    }
                    Ok(_) => {}
                    Err(err) => log::error!("frame {} aborted: {err}", time.frame_index),
                }
            }

            fields.window.pre_present_notify();
            fields.gpu.submit(frame);
        });

        control
    }
}

impl<S> ApplicationHandler for AppState<S>
where
    S: State + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.create_window_entry(event_loop) {
            self.fail(event_loop, err.context("failed to create initial window"));
            return;
        }
        if let Some(entry) = self.window.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: one tick per frame.
        if let Some(entry) = self.window.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.exit_requested || self.window_id != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.window = None;
                self.exit_requested = true;
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.window.as_mut() {
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                    let viewport = entry.with_window(|w| {
                        w.request_redraw();
                        logical_viewport(w)
                    });
                    self.game.set_viewport(viewport);
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.window.as_mut() {
                    let new_size = entry.with_window(|w| w.inner_size());
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                    let viewport = entry.with_window(|w| logical_viewport(w));
                    self.game.set_viewport(viewport);
                }
            }

            WindowEvent::RedrawRequested => {
                if self.frame() == AppControl::Exit {
                    log::info!("state requested exit");
                    self.exit_requested = true;
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }
}

fn logical_viewport(window: &Window) -> Viewport {
    let logical: LogicalSize<f64> = window.inner_size().to_logical(window.scale_factor());
    Viewport::new(logical.width as f32, logical.height as f32)
}
