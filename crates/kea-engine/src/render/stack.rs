use crate::geom::Matrix;

use super::RenderError;

/// Model-view matrix stack.
///
/// `current` is the live matrix; `push` saves a copy and `pop` restores the
/// last saved one.
#[derive(Debug, Clone, Default)]
pub struct MatrixStack {
    current: Matrix,
    saved: Vec<Matrix>,
}

impl MatrixStack {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn current(&self) -> &Matrix {
        &self.current
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    /// Restores the last pushed matrix.
    ///
    /// Popping with nothing saved is an error and leaves `current` unchanged.
    pub fn pop(&mut self) -> Result<(), RenderError> {
        self.current = self.saved.pop().ok_or(RenderError::InvalidPopMatrix)?;
        Ok(())
    }

    pub fn set(&mut self, m: Matrix) {
        self.current = m;
    }

    /// Post-multiplies `m` onto the current matrix.
    pub fn apply(&mut self, m: &Matrix) {
        self.current.append(m);
    }

    /// Resets to identity and drops every saved entry.
    pub fn reset(&mut self) {
        self.current = Matrix::IDENTITY;
        self.saved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_on_empty_is_invalid() {
        let mut s = MatrixStack::new();
        let err = s.pop().unwrap_err();
        assert_eq!(err, RenderError::InvalidPopMatrix);
        assert_eq!(err.to_string(), "Invalid popMatrix!");
    }

    #[test]
    fn push_pop_restores() {
        let mut s = MatrixStack::new();
        s.push();
        s.apply(&Matrix::from_translation(5.0, 0.0));
        assert_eq!(s.current().tx, 5.0);
        s.pop().unwrap();
        assert!(s.current().is_identity());
        assert_eq!(s.depth(), 0);
    }

    #[test]
    fn failed_pop_keeps_current() {
        let mut s = MatrixStack::new();
        s.set(Matrix::from_translation(1.0, 2.0));
        assert!(s.pop().is_err());
        assert_eq!(*s.current(), Matrix::from_translation(1.0, 2.0));
    }
}
