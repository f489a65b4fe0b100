//! 2D canvas backend.
//!
//! [`CanvasRenderer`] draws a scene through the small [`Canvas2d`] API
//! (save / alpha / transform / draw image or fill / restore per leaf).
//! [`SoftwareCanvas`] implements it on an RGBA8 buffer, which makes the
//! canvas path usable headless.

use crate::coords::{Rect, Vec2};
use crate::geom::Matrix;
use crate::paint::Color;
use crate::scene::{AtlasImage, DrawList, Scene};

use super::RenderError;
use super::batch::FrameStats;

/// Immediate-mode 2D drawing surface.
pub trait Canvas2d {
    /// Size in pixels.
    fn size(&self) -> (u32, u32);

    fn clear(&mut self, color: Color);

    /// Pushes the current transform and global alpha.
    fn save(&mut self);

    /// Pops the state pushed by the matching [`save`](Canvas2d::save).
    fn restore(&mut self) -> Result<(), RenderError>;

    /// Replaces the current transform.
    fn set_transform(&mut self, m: &Matrix);

    fn set_global_alpha(&mut self, alpha: f32);

    /// Draws the `src` region of `image` into `dst`, both through the current transform.
    fn draw_image(&mut self, image: &AtlasImage, src: Rect, dst: Rect);

    /// Fills `dst` with a premultiplied color through the current transform.
    fn fill_rect(&mut self, dst: Rect, color: Color);
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct CanvasState {
    transform: Matrix,
    alpha: f32,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self { transform: Matrix::IDENTITY, alpha: 1.0 }
    }
}

/// CPU rasterizer: premultiplied RGBA8, nearest sampling, source-over blending.
#[derive(Debug, Clone)]
pub struct SoftwareCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    state: CanvasState,
    saved: Vec<CanvasState>,
}

impl SoftwareCanvas {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyCanvas { width, height });
        }
        Ok(Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
            state: CanvasState::default(),
            saved: Vec::new(),
        })
    }

    /// Premultiplied RGBA8 pixels, row-major.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        let p = &self.pixels[i..i + 4];
        Some([p[0], p[1], p[2], p[3]])
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    fn blend(&mut self, x: u32, y: u32, src: [f32; 4]) {
        let i = self.offset(x, y);
        let inv = 1.0 - src[3];
        for (k, s) in src.iter().enumerate() {
            let d = self.pixels[i + k] as f32 / 255.0;
            let out = (s + d * inv).clamp(0.0, 1.0);
            self.pixels[i + k] = (out * 255.0 + 0.5) as u8;
        }
    }

    /// Visits every pixel whose center maps inside `dst`, blending what
    /// `shade` returns for the local point (premultiplied) under global alpha.
    fn rasterize(&mut self, dst: Rect, mut shade: impl FnMut(Vec2) -> Option<[f32; 4]>) {
        if dst.is_empty() || self.state.alpha <= 0.0 {
            return;
        }
        let m = self.state.transform;
        let Some(inv) = m.invert() else { return };

        let corners = dst.corners().map(|p| m.transform_point(p));
        let Some(bounds) = Rect::bounding(&corners) else { return };
        let screen = Rect::new(0.0, 0.0, self.width as f32, self.height as f32);
        let Some(area) = bounds.intersect(screen) else { return };

        let x0 = area.x.floor() as u32;
        let y0 = area.y.floor() as u32;
        let x1 = (area.right().ceil() as u32).min(self.width);
        let y1 = (area.bottom().ceil() as u32).min(self.height);
        let alpha = self.state.alpha;

        for py in y0..y1 {
            for px in x0..x1 {
                let local = inv.transform_point(Vec2::new(px as f32 + 0.5, py as f32 + 0.5));
                if !dst.contains(local) {
                    continue;
                }
                let Some(src) = shade(local) else { continue };
                if src[3] <= 0.0 {
                    continue;
                }
                self.blend(px, py, src.map(|c| c * alpha));
            }
        }
    }
}

impl Canvas2d for SoftwareCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Color) {
        let rgba = color.to_rgba8();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    fn save(&mut self) {
        self.saved.push(self.state);
    }

    fn restore(&mut self) -> Result<(), RenderError> {
        self.state = self.saved.pop().ok_or(RenderError::UnbalancedRestore)?;
        Ok(())
    }

    fn set_transform(&mut self, m: &Matrix) {
        self.state.transform = *m;
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.state.alpha = alpha.clamp(0.0, 1.0);
    }

    fn draw_image(&mut self, image: &AtlasImage, src: Rect, dst: Rect) {
        if src.is_empty() {
            return;
        }
        let last_x = last_texel(src.x, src.right());
        let last_y = last_texel(src.y, src.bottom());
        self.rasterize(dst, |local| {
            let u = src.x + (local.x - dst.x) / dst.w * src.w;
            let v = src.y + (local.y - dst.y) / dst.h * src.h;
            let tx = (u.floor().max(src.x) as u32).min(last_x);
            let ty = (v.floor().max(src.y) as u32).min(last_y);
            let [r, g, b, a] = image.pixel(tx, ty)?;
            let a = a as f32 / 255.0;
            Some([r as f32 / 255.0 * a, g as f32 / 255.0 * a, b as f32 / 255.0 * a, a])
        });
    }

    fn fill_rect(&mut self, dst: Rect, color: Color) {
        let rgba = color.to_array();
        self.rasterize(dst, |_| Some(rgba));
    }
}

/// Last texel index covered by the span `[start, end)`, never below `start`.
#[inline]
fn last_texel(start: f32, end: f32) -> u32 {
    (end.ceil() as u32).saturating_sub(1).max(start as u32)
}

/// Scene renderer for any [`Canvas2d`].
#[derive(Debug)]
pub struct CanvasRenderer {
    clear_color: Color,
    draw_list: DrawList,
    stats: FrameStats,
}

impl CanvasRenderer {
    pub fn new(clear_color: Color) -> Self {
        Self { clear_color, draw_list: DrawList::new(), stats: FrameStats::default() }
    }

    #[inline]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Clears `canvas` and draws every renderable leaf of `scene` in order.
    pub fn render<C: Canvas2d + ?Sized>(&mut self, canvas: &mut C, scene: &mut Scene) -> Result<FrameStats, RenderError> {
        canvas.clear(self.clear_color);
        scene.build_draw_list(&mut self.draw_list);

        let view = scene.camera.view_matrix();
        let mut stats = FrameStats::default();

        for item in self.draw_list.items() {
            let image = match item.texture {
                Some(id) => match scene.atlas(id) {
                    Some(atlas) => Some(atlas.image()),
                    None => continue,
                },
                None => None,
            };

            let mut m = view;
            m.append(&item.world);
            let dst = Rect::new(0.0, 0.0, item.cell.w, item.cell.h);

            canvas.save();
            canvas.set_transform(&m);
            match image {
                // Canvas images take no tint; the item color contributes its alpha.
                Some(image) => {
                    canvas.set_global_alpha(item.color.a);
                    canvas.draw_image(image, item.cell, dst);
                }
                None => {
                    canvas.set_global_alpha(1.0);
                    canvas.fill_rect(dst, item.color);
                }
            }
            canvas.restore()?;

            stats.entities += 1;
            stats.draw_calls += 1;
        }

        self.stats = stats;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Viewport;
    use crate::geom::Transform;
    use crate::scene::{Pixel, Sprite, TextureAtlas};

    const RED: [u8; 4] = [255, 0, 0, 255];

    fn red_image(w: u32, h: u32) -> AtlasImage {
        AtlasImage::from_fn(w, h, |_, _| RED).unwrap()
    }

    #[test]
    fn empty_canvas_is_an_error() {
        assert!(matches!(SoftwareCanvas::new(0, 4), Err(RenderError::EmptyCanvas { .. })));
    }

    #[test]
    fn restore_without_save_fails() {
        let mut c = SoftwareCanvas::new(2, 2).unwrap();
        assert_eq!(c.restore(), Err(RenderError::UnbalancedRestore));
    }

    #[test]
    fn save_restore_round_trips_state() {
        let mut c = SoftwareCanvas::new(2, 2).unwrap();
        c.save();
        c.set_global_alpha(0.25);
        c.set_transform(&Matrix::from_translation(3.0, 3.0));
        c.restore().unwrap();
        assert_eq!(c.state, CanvasState::default());
    }

    #[test]
    fn draw_image_translates() {
        let mut c = SoftwareCanvas::new(8, 8).unwrap();
        c.set_transform(&Matrix::from_translation(2.0, 3.0));
        c.draw_image(&red_image(2, 2), Rect::new(0.0, 0.0, 2.0, 2.0), Rect::new(0.0, 0.0, 2.0, 2.0));

        assert_eq!(c.pixel(2, 3), Some(RED));
        assert_eq!(c.pixel(3, 4), Some(RED));
        assert_eq!(c.pixel(1, 3), Some([0, 0, 0, 0]));
        assert_eq!(c.pixel(4, 3), Some([0, 0, 0, 0]));
    }

    #[test]
    fn global_alpha_blends_over_background() {
        let mut c = SoftwareCanvas::new(1, 1).unwrap();
        c.clear(Color::BLACK);
        c.set_global_alpha(0.5);
        c.draw_image(&red_image(1, 1), Rect::new(0.0, 0.0, 1.0, 1.0), Rect::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(c.pixel(0, 0), Some([128, 0, 0, 255]));
    }

    #[test]
    fn renderer_draws_through_camera() {
        let mut scene = Scene::new(Viewport::new(8.0, 8.0));
        let atlas = scene.add_atlas(TextureAtlas::single("dot", red_image(1, 1)));
        scene.add_sprite(None, Transform::new(5.0, 5.0), Sprite::new(atlas, 0)).unwrap();
        scene.camera.transform.set_position(-2.0, -1.0);

        let mut canvas = SoftwareCanvas::new(8, 8).unwrap();
        let mut renderer = CanvasRenderer::new(Color::transparent());
        let stats = renderer.render(&mut canvas, &mut scene).unwrap();

        assert_eq!(stats.entities, 1);
        assert_eq!(canvas.pixel(3, 4), Some(RED));
        assert_eq!(canvas.pixel(5, 5), Some([0, 0, 0, 0]));
    }

    #[test]
    fn fractional_source_clamps_to_image() {
        let mut c = SoftwareCanvas::new(8, 8).unwrap();
        c.set_transform(&Matrix::new(4.0, 0.0, 0.0, 4.0, 0.0, 0.0));
        c.draw_image(&red_image(1, 1), Rect::new(0.25, 0.0, 0.5, 1.0), Rect::new(0.0, 0.0, 0.5, 1.0));

        assert_eq!(c.pixel(0, 0), Some(RED));
        assert_eq!(c.pixel(1, 3), Some(RED));
        assert_eq!(c.pixel(2, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn fill_rect_paints_solid_color() {
        let mut c = SoftwareCanvas::new(4, 4).unwrap();
        c.set_transform(&Matrix::from_translation(1.0, 1.0));
        c.fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0), Color::from_srgb_u8(0, 255, 0, 255));

        assert_eq!(c.pixel(1, 1), Some([0, 255, 0, 255]));
        assert_eq!(c.pixel(2, 2), Some([0, 255, 0, 255]));
        assert_eq!(c.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(c.pixel(3, 3), Some([0, 0, 0, 0]));
    }

    #[test]
    fn renderer_fills_pixels() {
        let mut scene = Scene::new(Viewport::new(4.0, 4.0));
        scene.add_pixel(None, Transform::new(1.0, 0.0), Pixel::from_argb(0xff00_00ff, 2.0)).unwrap();

        let mut canvas = SoftwareCanvas::new(4, 4).unwrap();
        let mut renderer = CanvasRenderer::new(Color::transparent());
        let stats = renderer.render(&mut canvas, &mut scene).unwrap();

        assert_eq!(stats.entities, 1);
        assert_eq!(canvas.pixel(1, 0), Some([0, 0, 255, 255]));
        assert_eq!(canvas.pixel(2, 1), Some([0, 0, 255, 255]));
        assert_eq!(canvas.pixel(0, 0), Some([0, 0, 0, 0]));
    }
}
