use crate::coords::{Rect, Vec2};
use crate::paint::Color;
use crate::scene::{AtlasId, DrawItem, DrawList};

use super::buffers::{ArrayBuffer, generate_colors};
use super::{MAX_QUADS, OverflowPolicy};

/// UVs of solid quads: the center of the renderer's 1×1 white texture.
pub const SOLID_UVS: [[f32; 2]; 4] = [[0.5, 0.5]; 4];

/// A run of consecutive quads sharing one texture; one draw call.
///
/// `texture: None` binds the 1×1 white texture used for solid quads.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BatchRange {
    pub texture: Option<AtlasId>,
    pub first_index: u32,
    pub index_count: u32,
}

/// Counters for the last compiled frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub entities: usize,
    pub draw_calls: usize,
    pub indices: u32,
    pub dropped: usize,
}

/// CPU side of the sprite batch: vertex positions, UVs, per-vertex
/// premultiplied colors and the texture ranges that become draw calls.
///
/// Each quad contributes 4 vertices in TL, TR, BR, BL order and 6 indices.
#[derive(Debug)]
pub struct SpriteBatch {
    positions: ArrayBuffer<[f32; 2]>,
    uvs: ArrayBuffer<[f32; 2]>,
    colors: ArrayBuffer<[f32; 4]>,

    capacity: usize,
    overflow: OverflowPolicy,

    entities: usize,
    batches: Vec<BatchRange>,
    dropped: usize,

    warned_overflow: bool,
}

impl SpriteBatch {
    pub fn new(max_items: usize, overflow: OverflowPolicy) -> Self {
        Self {
            positions: ArrayBuffer::new("kea sprite positions"),
            uvs: ArrayBuffer::new("kea sprite uvs"),
            colors: ArrayBuffer::new("kea sprite colors"),
            capacity: max_items.clamp(1, MAX_QUADS),
            overflow,
            entities: 0,
            batches: Vec::new(),
            dropped: 0,
            warned_overflow: false,
        }
    }

    /// Starts a frame: zero the entity count and drop last frame's vertices.
    pub fn begin(&mut self) {
        self.positions.clear();
        self.uvs.clear();
        self.colors.clear();
        self.batches.clear();
        self.entities = 0;
        self.dropped = 0;
    }

    /// Appends one quad. Returns `false` if it was dropped for capacity.
    pub fn push_quad(&mut self, texture: Option<AtlasId>, corners: [Vec2; 4], uvs: [[f32; 2]; 4], color: Color) -> bool {
        if self.entities >= self.capacity && !self.try_grow() {
            self.dropped += 1;
            if !self.warned_overflow {
                log::warn!(
                    "SpriteBatch: capacity of {} quads reached ({:?}); extra quads are dropped",
                    self.capacity,
                    self.overflow
                );
                self.warned_overflow = true;
            }
            return false;
        }

        for c in corners {
            self.positions.push(c.to_array());
        }
        self.uvs.extend_from_slice(&uvs);
        self.colors.extend_from_slice(&generate_colors(color));

        match self.batches.last_mut() {
            Some(last) if last.texture == texture => last.index_count += 6,
            _ => self.batches.push(BatchRange {
                texture,
                first_index: (self.entities * 6) as u32,
                index_count: 6,
            }),
        }

        self.entities += 1;
        true
    }

    /// Appends a resolved draw item. `atlas_size` is the texture size in
    /// pixels; solid items ignore it.
    ///
    /// The cell is drawn with its top-left at the item's local origin; all four
    /// corners go through the full world matrix.
    pub fn push_item(&mut self, item: &DrawItem, atlas_size: (f32, f32)) -> bool {
        let local = Rect::new(0.0, 0.0, item.cell.w, item.cell.h).corners();
        let corners = local.map(|p| item.world.transform_point(p));
        let uvs = match item.texture {
            Some(_) => cell_uvs(item.cell, atlas_size),
            None => SOLID_UVS,
        };
        self.push_quad(item.texture, corners, uvs, item.color)
    }

    /// Appends every item of `list` in order. Textured items whose atlas
    /// size is unknown are skipped.
    pub fn extend_from_list(&mut self, list: &DrawList, mut atlas_size: impl FnMut(AtlasId) -> Option<(f32, f32)>) {
        for item in list.items() {
            let size = match item.texture {
                None => (1.0, 1.0),
                Some(id) => match atlas_size(id) {
                    Some(size) => size,
                    None => {
                        log::debug!("SpriteBatch: no atlas for {id:?}; item skipped");
                        continue;
                    }
                },
            };
            self.push_item(item, size);
        }
    }

    fn try_grow(&mut self) -> bool {
        if self.overflow != OverflowPolicy::Grow || self.capacity >= MAX_QUADS {
            return false;
        }
        self.capacity = (self.capacity * 2).min(MAX_QUADS);
        log::debug!("SpriteBatch: capacity grown to {} quads", self.capacity);
        true
    }

    /// Uploads positions, UVs and colors.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        self.positions.upload(device, queue);
        self.uvs.upload(device, queue);
        self.colors.upload(device, queue);
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn batches(&self) -> &[BatchRange] {
        &self.batches
    }

    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entities
    }

    /// Current quad capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn positions(&self) -> &ArrayBuffer<[f32; 2]> {
        &self.positions
    }

    #[inline]
    pub fn uvs(&self) -> &ArrayBuffer<[f32; 2]> {
        &self.uvs
    }

    #[inline]
    pub fn colors(&self) -> &ArrayBuffer<[f32; 4]> {
        &self.colors
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            entities: self.entities,
            draw_calls: self.batches.len(),
            indices: (self.entities * 6) as u32,
            dropped: self.dropped,
        }
    }
}

/// Normalized UVs of `cell` in TL, TR, BR, BL order.
pub fn cell_uvs(cell: Rect, (w, h): (f32, f32)) -> [[f32; 2]; 4] {
    let (w, h) = (w.max(1.0), h.max(1.0));
    cell.corners().map(|c| [c.x / w, c.y / h])
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;
    use crate::geom::Matrix;
    use crate::scene::NodeId;

    const UNIT_UV: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    fn textures(n: usize) -> Vec<Option<AtlasId>> {
        let mut sm: SlotMap<AtlasId, ()> = SlotMap::with_key();
        (0..n).map(|_| Some(sm.insert(()))).collect()
    }

    fn quad() -> [Vec2; 4] {
        Rect::new(0.0, 0.0, 1.0, 1.0).corners()
    }

    #[test]
    fn same_texture_is_one_range() {
        let t = textures(1);
        let mut b = SpriteBatch::new(1000, OverflowPolicy::Grow);
        b.begin();
        for _ in 0..3 {
            assert!(b.push_quad(t[0], quad(), UNIT_UV, Color::WHITE));
        }
        assert_eq!(b.batches(), &[BatchRange { texture: t[0], first_index: 0, index_count: 18 }]);
        assert_eq!(b.stats().indices, 18);
        assert_eq!(b.positions().len(), 12);
    }

    #[test]
    fn texture_change_splits_ranges() {
        let t = textures(2);
        let mut b = SpriteBatch::new(1000, OverflowPolicy::Grow);
        b.begin();
        for tex in [t[0], t[0], t[1], t[0]] {
            b.push_quad(tex, quad(), UNIT_UV, Color::WHITE);
        }
        let ranges: Vec<_> = b.batches().iter().map(|r| (r.first_index, r.index_count)).collect();
        assert_eq!(ranges, vec![(0, 12), (12, 6), (18, 6)]);
        assert_eq!(b.stats().draw_calls, 3);
    }

    #[test]
    fn drop_policy_counts_overflow() {
        let t = textures(1);
        let mut b = SpriteBatch::new(2, OverflowPolicy::Drop);
        b.begin();
        let accepted: Vec<_> = (0..5).map(|_| b.push_quad(t[0], quad(), UNIT_UV, Color::WHITE)).collect();
        assert_eq!(accepted, vec![true, true, false, false, false]);
        assert_eq!(b.stats().dropped, 3);
        assert_eq!(b.entity_count(), 2);
    }

    #[test]
    fn grow_policy_doubles_capacity() {
        let t = textures(1);
        let mut b = SpriteBatch::new(2, OverflowPolicy::Grow);
        b.begin();
        for _ in 0..5 {
            assert!(b.push_quad(t[0], quad(), UNIT_UV, Color::WHITE));
        }
        assert_eq!(b.capacity(), 8);
        assert_eq!(b.stats().dropped, 0);
    }

    #[test]
    fn grow_stops_at_u16_limit() {
        let t = textures(1);
        let mut b = SpriteBatch::new(MAX_QUADS, OverflowPolicy::Grow);
        b.begin();
        for _ in 0..MAX_QUADS {
            b.push_quad(t[0], quad(), UNIT_UV, Color::WHITE);
        }
        assert!(!b.push_quad(t[0], quad(), UNIT_UV, Color::WHITE));
        assert_eq!(b.capacity(), MAX_QUADS);
    }

    #[test]
    fn begin_resets_frame_state() {
        let t = textures(1);
        let mut b = SpriteBatch::new(4, OverflowPolicy::Grow);
        b.push_quad(t[0], quad(), UNIT_UV, Color::white_alpha(0.5));
        b.begin();
        assert_eq!(b.stats(), FrameStats::default());
        assert!(b.colors().is_empty());
    }

    #[test]
    fn push_item_transforms_all_corners() {
        let t = textures(1);
        let mut b = SpriteBatch::new(4, OverflowPolicy::Grow);
        b.begin();
        let world = Matrix::from_offset_transform(10.0, 20.0, -1.0, 1.0, 0.0, 0.0, 0.0);
        let item = DrawItem {
            node: NodeId::default(),
            texture: t[0],
            world,
            cell: Rect::new(16.0, 0.0, 16.0, 8.0),
            color: Color::white_alpha(0.5),
        };
        b.push_item(&item, (64.0, 32.0));

        let p = b.positions().items();
        assert_eq!(p[0], [10.0, 20.0]);
        assert_eq!(p[1], [-6.0, 20.0]);
        assert_eq!(p[2], [-6.0, 28.0]);
        assert_eq!(b.uvs().items()[2], [0.5, 0.25]);
        assert_eq!(b.colors().items(), &[[0.5; 4]; 4]);
    }

    #[test]
    fn solid_item_gets_its_own_range_and_color() {
        let t = textures(1);
        let mut b = SpriteBatch::new(4, OverflowPolicy::Grow);
        b.begin();
        b.push_quad(t[0], quad(), UNIT_UV, Color::WHITE);

        let red = Color::from_argb(0xFFFF0000);
        let item = DrawItem {
            node: NodeId::default(),
            texture: None,
            world: Matrix::from_translation(4.0, 4.0),
            cell: Rect::new(0.0, 0.0, 2.0, 2.0),
            color: red,
        };
        assert!(b.push_item(&item, (64.0, 64.0)));

        assert_eq!(b.batches()[1], BatchRange { texture: None, first_index: 6, index_count: 6 });
        assert_eq!(b.uvs().items()[4..], SOLID_UVS);
        assert_eq!(b.colors().items()[4..], [red.to_array(); 4]);
        assert_eq!(b.positions().items()[6], [6.0, 6.0]);
    }
}
