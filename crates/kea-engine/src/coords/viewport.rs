/// Stage size in logical pixels.
///
/// The GPU path uploads this as the resolution uniform used for the
/// pixel → NDC conversion; the canvas path sizes its pixel buffer from it.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Resolution with each axis clamped to at least one pixel.
    #[inline]
    pub fn resolution(self) -> [f32; 2] {
        [self.width.max(1.0), self.height.max(1.0)]
    }
}
