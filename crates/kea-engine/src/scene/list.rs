use crate::coords::Rect;
use crate::geom::Matrix;
use crate::paint::Color;

use super::{AtlasId, NodeId};

/// One resolved quad: where it goes, which texture region it samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub node: NodeId,
    /// Sampled atlas; `None` for solid-color quads.
    pub texture: Option<AtlasId>,
    /// Concatenated world matrix of the leaf (tile offset included for tiles).
    pub world: Matrix,
    /// Source region in texture pixels. Solid quads use `(0, 0, size, size)`.
    pub cell: Rect,
    /// Premultiplied tint, multiplied into every texel.
    pub color: Color,
}

/// Leaves collected by a scene traversal, in draw order.
///
/// Performance characteristics:
/// - `push()` is O(1)
/// - `clear()` keeps capacity, so a warmed list does not allocate per frame
#[derive(Debug, Default)]
pub struct DrawList {
    items: Vec<DrawItem>,
}

impl DrawList {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[inline]
    pub fn push(&mut self, item: DrawItem) {
        self.items.push(item);
    }

    /// Items in traversal order (back-to-front).
    #[inline]
    pub fn items(&self) -> &[DrawItem] {
        &self.items
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of texture changes a renderer will see walking the list in order.
    pub fn texture_runs(&self) -> usize {
        let mut runs = 0;
        let mut last = None;
        for item in &self.items {
            if last != Some(item.texture) {
                runs += 1;
                last = Some(item.texture);
            }
        }
        runs
    }
}
