use crate::geom::TransformId;
use crate::paint::Color;

use super::{Animation, AtlasId, TileLayer};

slotmap::new_key_type! {
    /// Handle to a [`Node`] in a [`Scene`](super::Scene).
    pub struct NodeId;
}

/// Atlas-backed image leaf. Covers both static images and animated sprites.
#[derive(Debug, Clone)]
pub struct Sprite {
    pub atlas: AtlasId,
    pub cell_index: usize,
    /// Opacity in `[0, 1]`, applied as per-vertex alpha.
    pub alpha: f32,
    pub animation: Option<Animation>,
}

impl Sprite {
    pub fn new(atlas: AtlasId, cell_index: usize) -> Self {
        Self { atlas, cell_index, alpha: 1.0, animation: None }
    }

    pub fn with_animation(mut self, animation: Animation) -> Self {
        self.animation = Some(animation);
        self
    }
}

/// Solid-color square leaf, `size` pixels on each side.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Pixel {
    pub color: Color,
    pub size: f32,
}

impl Default for Pixel {
    fn default() -> Self {
        Self { color: Color::BLACK, size: 1.0 }
    }
}

impl Pixel {
    #[inline]
    pub fn new(color: Color, size: f32) -> Self {
        Self { color, size }
    }

    /// Pixel from a packed `0xAARRGGBB` color.
    #[inline]
    pub fn from_argb(argb: u32, size: f32) -> Self {
        Self::new(Color::from_argb(argb), size)
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Ordered members; each member's transform is parented to the group's.
    Group(Vec<NodeId>),
    Sprite(Sprite),
    Pixel(Pixel),
    TileLayer(TileLayer),
}

/// A scene-graph entry: a transform handle, a render flag and its payload.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) transform: TransformId,
    pub(crate) will_render: bool,
    pub(crate) parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    #[inline]
    pub fn transform(&self) -> TransformId {
        self.transform
    }

    #[inline]
    pub fn will_render(&self) -> bool {
        self.will_render
    }

    /// Group this node belongs to, if any.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group(_))
    }

    pub fn members(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Group(members) => members,
            _ => &[],
        }
    }

    pub fn as_sprite(&self) -> Option<&Sprite> {
        match &self.kind {
            NodeKind::Sprite(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sprite_mut(&mut self) -> Option<&mut Sprite> {
        match &mut self.kind {
            NodeKind::Sprite(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pixel(&self) -> Option<&Pixel> {
        match &self.kind {
            NodeKind::Pixel(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_pixel_mut(&mut self) -> Option<&mut Pixel> {
        match &mut self.kind {
            NodeKind::Pixel(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_tile_layer(&self) -> Option<&TileLayer> {
        match &self.kind {
            NodeKind::TileLayer(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_tile_layer_mut(&mut self) -> Option<&mut TileLayer> {
        match &mut self.kind {
            NodeKind::TileLayer(l) => Some(l),
            _ => None,
        }
    }
}
