use crate::coords::{Vec2, Viewport};
use crate::geom::{Matrix, Transform};

/// The single view onto a scene.
///
/// The camera's own transform becomes the model-view matrix that every
/// resolved world matrix is drawn through.
#[derive(Debug, Clone)]
pub struct Camera {
    pub transform: Transform,
    viewport: Viewport,
}

impl Camera {
    pub fn new(viewport: Viewport) -> Self {
        Self { transform: Transform::default(), viewport }
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// View matrix built from the camera transform.
    ///
    /// A locked camera keeps its baked matrix.
    pub fn view_matrix(&self) -> Matrix {
        let t = &self.transform;
        if t.locked() {
            return *t.matrix();
        }
        Matrix::from_offset_transform(
            t.x(),
            t.y(),
            t.scale_x(),
            t.scale_y(),
            t.rotation(),
            t.anchor_x(),
            t.anchor_y(),
        )
    }

    /// Maps a screen point back into world space.
    pub fn screen_to_world(&self, point: Vec2) -> Option<Vec2> {
        Some(self.view_matrix().invert()?.transform_point(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_is_identity() {
        assert!(Camera::new(Viewport::new(800.0, 600.0)).view_matrix().is_identity());
    }

    #[test]
    fn panning_offsets_view() {
        let mut cam = Camera::new(Viewport::new(800.0, 600.0));
        cam.transform.set_position(-100.0, 0.0);
        assert_eq!(cam.view_matrix().transform_point(Vec2::new(150.0, 10.0)), Vec2::new(50.0, 10.0));
        assert_eq!(cam.screen_to_world(Vec2::new(50.0, 10.0)), Some(Vec2::new(150.0, 10.0)));
    }
}
