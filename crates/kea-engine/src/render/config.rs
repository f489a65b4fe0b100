use crate::paint::Color;

/// Quad capacity a fresh renderer preallocates.
pub const DEFAULT_MAX_ITEMS: usize = 1000;

/// Largest quad count addressable with `u16` indices (4 vertices per quad).
pub const MAX_QUADS: usize = (u16::MAX as usize + 1) / 4;

/// What happens when a frame holds more quads than the current capacity.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Double the capacity, up to [`MAX_QUADS`]. Past that, drop like [`OverflowPolicy::Drop`].
    #[default]
    Grow,
    /// Keep the capacity; extra quads are skipped and counted.
    Drop,
}

/// Which backend draws the scene.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum RenderBackend {
    #[default]
    Gpu,
    Canvas,
}

/// Renderer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Initial quad capacity. Clamped to `1..=MAX_QUADS`.
    pub max_items: usize,
    pub overflow: OverflowPolicy,
    pub clear_color: Color,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            overflow: OverflowPolicy::Grow,
            clear_color: Color::from_straight(0.05, 0.05, 0.08, 1.0),
        }
    }
}

impl RendererConfig {
    #[inline]
    pub fn clamped_max_items(&self) -> usize {
        self.max_items.clamp(1, MAX_QUADS)
    }
}
