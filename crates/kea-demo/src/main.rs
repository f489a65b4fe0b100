//! Group transform demo: a group of slithering snakes that sweeps across the
//! stage, mirroring itself whenever it turns around.

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use kea_engine::core::{AppControl, FrameCtx, Game, GameConfig, State};
use kea_engine::geom::Transform;
use kea_engine::logging::{LoggingConfig, init_logging};
use kea_engine::render::{OverflowPolicy, RenderBackend, RendererConfig};
use kea_engine::scene::{Animation, AtlasImage, NodeId, Scene, Sequence, Sprite, TextureAtlas};
use kea_engine::window::Runtime;

const STAGE_WIDTH: u32 = 800;
const STAGE_HEIGHT: u32 = 250;

const SNAKE_W: u32 = 150;
const SNAKE_H: u32 = 117;
const SHEET_COLUMNS: u32 = 4;
const SHEET_ROWS: u32 = 2;

const GROUP_SPEED: f32 = 3.0;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Backend {
    Gpu,
    Canvas,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Overflow {
    Grow,
    Drop,
}

/// kea group transform demo
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Number of snakes in the group.
    #[arg(long, default_value_t = 50)]
    snakes: usize,

    /// Initial sprite batch capacity, in quads.
    #[arg(long, default_value_t = kea_engine::render::DEFAULT_MAX_ITEMS)]
    max_items: usize,

    /// What the batch does when a frame exceeds its capacity.
    #[arg(long, value_enum, default_value_t = Overflow::Grow)]
    overflow: Overflow,

    /// `gpu` opens a window; `canvas` renders headless in software.
    #[arg(long, value_enum, default_value_t = Backend::Gpu)]
    backend: Backend,

    /// Frames to simulate with the canvas backend.
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Seed for snake placement.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Log filter, e.g. `debug` or `kea_engine=trace`. Overrides RUST_LOG.
    #[arg(long)]
    log: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Heading {
    Right,
    Left,
}

struct GroupTransform {
    count: usize,
    rng: fastrand::Rng,
    snakes: Option<NodeId>,
    heading: Heading,
}

impl GroupTransform {
    fn new(count: usize, seed: u64) -> Self {
        Self { count, rng: fastrand::Rng::with_seed(seed), snakes: None, heading: Heading::Right }
    }
}

impl State for GroupTransform {
    fn create(&mut self, scene: &mut Scene) -> Result<()> {
        let sheet = TextureAtlas::from_grid("snake", snake_sheet()?, SNAKE_W, SNAKE_H)?;
        let atlas = scene.add_atlas(sheet);

        let snakes = scene.add_group(None, Transform::default())?;
        for _ in 0..self.count {
            let x = self.rng.f32() * STAGE_WIDTH as f32;
            let y = self.rng.f32() * STAGE_HEIGHT as f32 - SNAKE_H as f32;

            let mut animation = Animation::new();
            animation.add(Sequence::new("slither", (1..=6).collect(), 0.1, true));
            animation.play("slither");

            let sprite = Sprite::new(atlas, 0).with_animation(animation);
            scene.add_sprite(Some(snakes), Transform::new(x, y), sprite)?;
        }

        self.snakes = Some(snakes);
        Ok(())
    }

    fn update(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        let stage_width = ctx.viewport.width;
        let Some(group) = self.snakes else {
            return AppControl::Continue;
        };
        let Some(group) = ctx.scene.transform_mut(group) else {
            return AppControl::Continue;
        };

        match self.heading {
            Heading::Right => {
                group.set_scale_x(1.0);
                group.translate(GROUP_SPEED, 0.0);
                if group.x() > stage_width {
                    self.heading = Heading::Left;
                    group.set_x(group.x() * 2.0);
                }
            }
            Heading::Left => {
                group.set_scale_x(-1.0);
                group.translate(-GROUP_SPEED, 0.0);
                if group.x() < -(SNAKE_W as f32) {
                    self.heading = Heading::Right;
                    group.set_x(group.x() - stage_width);
                }
            }
        }

        AppControl::Continue
    }
}

/// Procedural spritesheet: cell `i` holds a sine-shaped snake at phase `i`.
fn snake_sheet() -> Result<AtlasImage> {
    let frames = (SHEET_COLUMNS * SHEET_ROWS) as f32;
    let image = AtlasImage::from_fn(SNAKE_W * SHEET_COLUMNS, SNAKE_H * SHEET_ROWS, |x, y| {
        let cell = (y / SNAKE_H) * SHEET_COLUMNS + x / SNAKE_W;
        let (lx, ly) = ((x % SNAKE_W) as f32, (y % SNAKE_H) as f32);

        let phase = cell as f32 / frames * std::f32::consts::TAU;
        let center = SNAKE_H as f32 * 0.5 + (lx / 18.0 + phase).sin() * 20.0;
        let thickness = 10.0 * (1.0 - lx / SNAKE_W as f32) + 4.0;

        if (ly - center).abs() <= thickness {
            [60, 160 + (lx as u8 / 3), 70, 255]
        } else {
            [0, 0, 0, 0]
        }
    })?;
    Ok(image)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(match cli.log {
        Some(filter) => LoggingConfig::with_filter(filter),
        None => LoggingConfig::default(),
    });

    let config = GameConfig {
        title: "kea: group transform".to_string(),
        width: STAGE_WIDTH,
        height: STAGE_HEIGHT,
        backend: match cli.backend {
            Backend::Gpu => RenderBackend::Gpu,
            Backend::Canvas => RenderBackend::Canvas,
        },
        renderer: RendererConfig {
            max_items: cli.max_items,
            overflow: match cli.overflow {
                Overflow::Grow => OverflowPolicy::Grow,
                Overflow::Drop => OverflowPolicy::Drop,
            },
            ..RendererConfig::default()
        },
        ..GameConfig::default()
    };

    let backend = config.backend;
    let mut game = Game::new(config, GroupTransform::new(cli.snakes, cli.seed))?;

    match backend {
        RenderBackend::Gpu => Runtime::run(game),
        RenderBackend::Canvas => {
            let (_, stats) = game.run_headless(cli.frames, Duration::from_secs_f64(1.0 / 60.0))?;
            log::info!(
                "{} frames: {} entities, {} draw calls, {} indices, {} dropped",
                cli.frames,
                stats.entities,
                stats.draw_calls,
                stats.indices,
                stats.dropped
            );
            Ok(())
        }
    }
}
