use crate::coords::Vec2;

/// 2D affine matrix.
///
/// Maps a point `(x, y)` to `(a·x + c·y + tx, b·x + d·y + ty)`:
///
/// ```text
/// | a  c  tx |
/// | b  d  ty |
/// | 0  0  1  |
/// ```
///
/// Plain value type; copying never aliases.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, tx: 0.0, ty: 0.0 };

    #[inline]
    pub const fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    #[inline]
    pub const fn from_translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Builds the matrix of an offset transform. See [`set_from_offset_transform`].
    ///
    /// [`set_from_offset_transform`]: Matrix::set_from_offset_transform
    pub fn from_offset_transform(
        x: f32,
        y: f32,
        scale_x: f32,
        scale_y: f32,
        rotation: f32,
        anchor_x: f32,
        anchor_y: f32,
    ) -> Self {
        let mut m = Self::IDENTITY;
        m.set_from_offset_transform(x, y, scale_x, scale_y, rotation, anchor_x, anchor_y);
        m
    }

    #[inline]
    pub fn identity(&mut self) -> &mut Self {
        *self = Self::IDENTITY;
        self
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Rebuilds the matrix as `T(x + ax, y + ay) · R(rotation) · S(scale) · T(-ax, -ay)`.
    ///
    /// The anchor is the pivot for rotation and scale: it is subtracted before
    /// scaling/rotating and added back afterwards.
    pub fn set_from_offset_transform(
        &mut self,
        x: f32,
        y: f32,
        scale_x: f32,
        scale_y: f32,
        rotation: f32,
        anchor_x: f32,
        anchor_y: f32,
    ) -> &mut Self {
        let (sin, cos) = rotation.sin_cos();
        self.a = cos * scale_x;
        self.b = sin * scale_x;
        self.c = -sin * scale_y;
        self.d = cos * scale_y;
        self.tx = x + anchor_x;
        self.ty = y + anchor_y;
        self.append(&Matrix::from_translation(-anchor_x, -anchor_y))
    }

    /// `self = self * other`: `other` is applied first, in local space.
    pub fn append(&mut self, other: &Matrix) -> &mut Self {
        let Matrix { a, b, c, d, tx, ty } = *self;
        self.a = a * other.a + c * other.b;
        self.b = b * other.a + d * other.b;
        self.c = a * other.c + c * other.d;
        self.d = b * other.c + d * other.d;
        self.tx = a * other.tx + c * other.ty + tx;
        self.ty = b * other.tx + d * other.ty + ty;
        self
    }

    /// `self = other * self`: `other` is applied after `self`, in world space.
    ///
    /// This is how ancestor transforms are accumulated onto a local matrix.
    pub fn prepend_matrix(&mut self, other: &Matrix) -> &mut Self {
        let Matrix { a, b, c, d, tx, ty } = *self;
        self.a = other.a * a + other.c * b;
        self.b = other.b * a + other.d * b;
        self.c = other.a * c + other.c * d;
        self.d = other.b * c + other.d * d;
        self.tx = other.a * tx + other.c * ty + other.tx;
        self.ty = other.b * tx + other.d * ty + other.ty;
        self
    }

    #[inline]
    pub fn translate(&mut self, dx: f32, dy: f32) -> &mut Self {
        self.tx += dx;
        self.ty += dy;
        self
    }

    #[inline]
    pub fn copy_from(&mut self, other: &Matrix) -> &mut Self {
        *self = *other;
        self
    }

    #[inline]
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    #[inline]
    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse matrix, or `None` when the matrix is singular (zero scale).
    pub fn invert(&self) -> Option<Matrix> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        Some(Matrix {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            tx: (self.c * self.ty - self.d * self.tx) * inv,
            ty: (self.b * self.tx - self.a * self.ty) * inv,
        })
    }

    /// Column-major 3x4 layout padded for a WGSL uniform (`array<vec4<f32>, 3>`).
    #[inline]
    pub fn to_uniform_cols(&self) -> [[f32; 4]; 3] {
        [
            [self.a, self.b, 0.0, 0.0],
            [self.c, self.d, 0.0, 0.0],
            [self.tx, self.ty, 1.0, 0.0],
        ]
    }
}
