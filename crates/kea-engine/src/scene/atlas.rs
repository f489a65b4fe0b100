use crate::coords::Rect;
use crate::render::SceneError;

slotmap::new_key_type! {
    /// Handle to a [`TextureAtlas`] registered with a [`Scene`](super::Scene).
    pub struct AtlasId;
}

/// CPU-side RGBA8 image (straight alpha, row-major, top-left origin).
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl AtlasImage {
    /// Wraps raw RGBA8 pixels. `rgba.len()` must be `width * height * 4`.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, SceneError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(SceneError::InvalidImage { width, height, len: rgba.len() });
        }
        Ok(Self { width, height, rgba })
    }

    /// Builds an image by evaluating `pixel(x, y)` for every texel.
    pub fn from_fn(width: u32, height: u32, mut pixel: impl FnMut(u32, u32) -> [u8; 4]) -> Result<Self, SceneError> {
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                rgba.extend_from_slice(&pixel(x, y));
            }
        }
        Self::new(width, height, rgba)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Texel at `(x, y)`; `None` outside the image.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = &self.rgba[i..i + 4];
        Some([p[0], p[1], p[2], p[3]])
    }
}

/// A named rectangular region of an atlas, in texture pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasCell {
    pub name: String,
    pub rect: Rect,
}

/// An image plus the cells that sprites and tiles draw from.
#[derive(Debug, Clone)]
pub struct TextureAtlas {
    name: String,
    image: AtlasImage,
    cells: Vec<AtlasCell>,
}

impl TextureAtlas {
    /// Single-image atlas: one cell covering the whole image.
    pub fn single(name: impl Into<String>, image: AtlasImage) -> Self {
        let name = name.into();
        let rect = Rect::new(0.0, 0.0, image.width() as f32, image.height() as f32);
        let cells = vec![AtlasCell { name: name.clone(), rect }];
        Self { name, image, cells }
    }

    /// Atlas with explicit cells. Cells must lie inside the image, on whole
    /// pixels, and be at least one pixel wide and tall.
    pub fn with_cells(name: impl Into<String>, image: AtlasImage, cells: Vec<AtlasCell>) -> Result<Self, SceneError> {
        let bounds = Rect::new(0.0, 0.0, image.width() as f32, image.height() as f32);
        for cell in &cells {
            let r = cell.rect;
            if [r.x, r.y, r.w, r.h].iter().any(|v| v.fract() != 0.0) {
                return Err(SceneError::FractionalCell { cell: cell.name.clone() });
            }
            let inside = r.x >= 0.0 && r.y >= 0.0 && r.right() <= bounds.right() && r.bottom() <= bounds.bottom();
            if !inside || r.w < 1.0 || r.h < 1.0 {
                return Err(SceneError::CellOutOfBounds { cell: cell.name.clone() });
            }
        }
        Ok(Self { name: name.into(), image, cells })
    }

    /// Slices the image into a spritesheet of `cell_w × cell_h` frames,
    /// row-major from the top-left. Partial frames at the edges are dropped.
    pub fn from_grid(name: impl Into<String>, image: AtlasImage, cell_w: u32, cell_h: u32) -> Result<Self, SceneError> {
        if cell_w == 0 || cell_h == 0 || cell_w > image.width() || cell_h > image.height() {
            return Err(SceneError::InvalidGrid { cell_w, cell_h });
        }
        let name = name.into();
        let cols = image.width() / cell_w;
        let rows = image.height() / cell_h;
        let cells = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (r, c)))
            .enumerate()
            .map(|(i, (r, c))| AtlasCell {
                name: format!("{name}_{i}"),
                rect: Rect::new((c * cell_w) as f32, (r * cell_h) as f32, cell_w as f32, cell_h as f32),
            })
            .collect();
        Ok(Self { name, image, cells })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn image(&self) -> &AtlasImage {
        &self.image
    }

    #[inline]
    pub fn cells(&self) -> &[AtlasCell] {
        &self.cells
    }

    #[inline]
    pub fn cell(&self, index: usize) -> Option<&AtlasCell> {
        self.cells.get(index)
    }

    pub fn cell_index(&self, name: &str) -> Option<usize> {
        self.cells.iter().position(|c| c.name == name)
    }

    /// Image size as `f32`, for UV normalization.
    #[inline]
    pub fn size(&self) -> (f32, f32) {
        (self.image.width() as f32, self.image.height() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(w: u32, h: u32) -> AtlasImage {
        AtlasImage::from_fn(w, h, |x, y| [x as u8, y as u8, 0, 255]).unwrap()
    }

    #[test]
    fn image_rejects_mismatched_buffer() {
        assert!(AtlasImage::new(2, 2, vec![0; 15]).is_err());
        assert!(AtlasImage::new(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn pixel_reads_row_major() {
        let img = image(4, 3);
        assert_eq!(img.pixel(2, 1), Some([2, 1, 0, 255]));
        assert_eq!(img.pixel(4, 0), None);
    }

    #[test]
    fn grid_slices_row_major() {
        let atlas = TextureAtlas::from_grid("snake", image(30, 20), 10, 10).unwrap();
        assert_eq!(atlas.cells().len(), 6);
        assert_eq!(atlas.cell(4).unwrap().rect, Rect::new(10.0, 10.0, 10.0, 10.0));
        assert_eq!(atlas.cell_index("snake_5"), Some(5));
    }

    #[test]
    fn grid_drops_partial_frames() {
        let atlas = TextureAtlas::from_grid("s", image(25, 10), 10, 10).unwrap();
        assert_eq!(atlas.cells().len(), 2);
    }

    #[test]
    fn grid_rejects_zero_cell() {
        assert!(TextureAtlas::from_grid("s", image(8, 8), 0, 4).is_err());
    }

    #[test]
    fn explicit_cells_must_fit() {
        let cells = vec![AtlasCell { name: "big".into(), rect: Rect::new(0.0, 0.0, 9.0, 9.0) }];
        assert!(TextureAtlas::with_cells("a", image(8, 8), cells).is_err());
    }

    #[test]
    fn explicit_cells_must_be_whole_pixels() {
        let cells = vec![AtlasCell { name: "sub".into(), rect: Rect::new(0.25, 0.0, 0.5, 1.0) }];
        assert_eq!(
            TextureAtlas::with_cells("a", image(1, 1), cells).err(),
            Some(SceneError::FractionalCell { cell: "sub".into() })
        );

        let nan = vec![AtlasCell { name: "nan".into(), rect: Rect::new(f32::NAN, 0.0, 1.0, 1.0) }];
        assert!(TextureAtlas::with_cells("a", image(1, 1), nan).is_err());
    }

    #[test]
    fn single_covers_whole_image() {
        let atlas = TextureAtlas::single("bg", image(16, 4));
        assert_eq!(atlas.cell(0).unwrap().rect, Rect::new(0.0, 0.0, 16.0, 4.0));
    }
}
