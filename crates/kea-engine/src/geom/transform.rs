use std::fmt;

use super::Matrix;

slotmap::new_key_type! {
    /// Handle to a [`Transform`] stored in a [`TransformTree`](super::TransformTree).
    pub struct TransformId;
}

/// Position, scale, rotation and anchor of a node, plus its derived matrices.
///
/// Every setter marks the transform dirty; the local matrix is rebuilt lazily
/// the next time the owning [`TransformTree`](super::TransformTree) resolves
/// the concatenated matrix.
///
/// The parent link is a non-owning [`TransformId`]. It can only be assigned
/// through the tree, which rejects assignments that would form a cycle.
#[derive(Debug, Clone)]
pub struct Transform {
    x: f32,
    y: f32,
    scale_x: f32,
    scale_y: f32,
    rotation: f32,
    anchor_x: f32,
    anchor_y: f32,

    locked: bool,
    ignore_parent: bool,
    ignore_child: bool,
    dirty: bool,

    parent: Option<TransformId>,

    matrix: Matrix,
    concatenated: Matrix,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl Transform {
    /// Creates a transform at `(x, y)` with unit scale, no rotation and no anchor.
    pub fn new(x: f32, y: f32) -> Self {
        let matrix = Matrix::from_translation(x, y);
        Self {
            x,
            y,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            anchor_x: 0.0,
            anchor_y: 0.0,
            locked: false,
            ignore_parent: false,
            ignore_child: false,
            dirty: true,
            parent: None,
            matrix,
            concatenated: matrix,
        }
    }

    /// Creates a transform with every component set.
    pub fn with_components(
        x: f32,
        y: f32,
        scale_x: f32,
        scale_y: f32,
        rotation: f32,
        anchor_x: f32,
        anchor_y: f32,
    ) -> Self {
        let mut t = Self::new(x, y);
        t.set_transform(x, y, scale_x, scale_y, rotation, anchor_x, anchor_y);
        t.matrix = Matrix::from_offset_transform(x, y, scale_x, scale_y, rotation, anchor_x, anchor_y);
        t.concatenated = t.matrix;
        t
    }

    // ── components ────────────────────────────────────────────────────────

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn set_x(&mut self, value: f32) {
        self.x = value;
        self.dirty = true;
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn set_y(&mut self, value: f32) {
        self.y = value;
        self.dirty = true;
    }

    #[inline]
    pub fn scale_x(&self) -> f32 {
        self.scale_x
    }

    #[inline]
    pub fn set_scale_x(&mut self, value: f32) {
        self.scale_x = value;
        self.dirty = true;
    }

    #[inline]
    pub fn scale_y(&self) -> f32 {
        self.scale_y
    }

    #[inline]
    pub fn set_scale_y(&mut self, value: f32) {
        self.scale_y = value;
        self.dirty = true;
    }

    /// Rotation in radians.
    #[inline]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    #[inline]
    pub fn set_rotation(&mut self, radians: f32) {
        self.rotation = radians;
        self.dirty = true;
    }

    /// Pivot offset for rotation and scale, X axis.
    #[inline]
    pub fn anchor_x(&self) -> f32 {
        self.anchor_x
    }

    #[inline]
    pub fn set_anchor_x(&mut self, value: f32) {
        self.anchor_x = value;
        self.dirty = true;
    }

    #[inline]
    pub fn anchor_y(&self) -> f32 {
        self.anchor_y
    }

    #[inline]
    pub fn set_anchor_y(&mut self, value: f32) {
        self.anchor_y = value;
        self.dirty = true;
    }

    pub fn set_position(&mut self, x: f32, y: f32) -> &mut Self {
        self.x = x;
        self.y = y;
        self.dirty = true;
        self
    }

    pub fn translate(&mut self, dx: f32, dy: f32) -> &mut Self {
        self.x += dx;
        self.y += dy;
        self.dirty = true;
        self
    }

    /// Sets both scale axes.
    pub fn set_scale(&mut self, value: f32) -> &mut Self {
        self.scale_x = value;
        self.scale_y = value;
        self.dirty = true;
        self
    }

    /// Sets every component at once.
    pub fn set_transform(
        &mut self,
        x: f32,
        y: f32,
        scale_x: f32,
        scale_y: f32,
        rotation: f32,
        anchor_x: f32,
        anchor_y: f32,
    ) -> &mut Self {
        self.x = x;
        self.y = y;
        self.scale_x = scale_x;
        self.scale_y = scale_y;
        self.rotation = rotation;
        self.anchor_x = anchor_x;
        self.anchor_y = anchor_y;
        self.dirty = true;
        self
    }

    // ── flags ─────────────────────────────────────────────────────────────

    #[inline]
    pub fn locked(&self) -> bool {
        self.locked
    }

    /// Locks or unlocks the local matrix.
    ///
    /// Locking bakes the matrix from the current components; later component
    /// writes are stored but do not rebuild it. Parent concatenation still
    /// applies. Unlocking marks the transform dirty so the next resolution
    /// picks up any writes made while locked.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
        if locked {
            self.rebuild_local();
        } else {
            self.dirty = true;
        }
    }

    /// When set, concatenation stops at this transform.
    #[inline]
    pub fn ignore_parent(&self) -> bool {
        self.ignore_parent
    }

    #[inline]
    pub fn set_ignore_parent(&mut self, value: bool) {
        self.ignore_parent = value;
    }

    /// When set, children do not inherit this transform.
    #[inline]
    pub fn ignore_child(&self) -> bool {
        self.ignore_child
    }

    #[inline]
    pub fn set_ignore_child(&mut self, value: bool) {
        self.ignore_child = value;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // ── derived state ─────────────────────────────────────────────────────

    #[inline]
    pub fn parent(&self) -> Option<TransformId> {
        self.parent
    }

    /// Local matrix as of the last rebuild.
    #[inline]
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Concatenated matrix as of the last resolution.
    #[inline]
    pub fn cached_concatenated(&self) -> &Matrix {
        &self.concatenated
    }

    pub(crate) fn set_parent_unchecked(&mut self, parent: Option<TransformId>) {
        self.parent = parent;
        self.dirty = true;
    }

    pub(crate) fn set_matrix(&mut self, matrix: Matrix) {
        self.matrix = matrix;
    }

    pub(crate) fn set_concatenated(&mut self, matrix: Matrix) {
        self.concatenated = matrix;
        self.dirty = false;
    }

    pub(crate) fn rebuild_local(&mut self) {
        self.matrix.set_from_offset_transform(
            self.x,
            self.y,
            self.scale_x,
            self.scale_y,
            self.rotation,
            self.anchor_x,
            self.anchor_y,
        );
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transform(x={} y={} scale_x={} scale_y={} rotation={} anchor=({}, {}))",
            self.x, self.y, self.scale_x, self.scale_y, self.rotation, self.anchor_x, self.anchor_y
        )
    }
}
