//! Sprite transform pipeline.
//!
//! Every quad corner is mapped through the current matrix before it is
//! queued:
//!
//! ```text
//! out = matrix * (x, y, 0, 1) + HALF_TEXEL_BIAS
//! ```
//!
//! [`SpriteTransform`] owns the current matrix and, when the batch was begun
//! with `USE_POST_TRANSFORM_STACK`, a stack of previous values.

use glam::{Mat4, Vec2, Vec4};

/// Offset added to every transformed position on X and Y.
///
/// Aligns texel centers with pixel centers under the pixel-space
/// projection. The wgpu shader adds it back.
pub const HALF_TEXEL_BIAS: f32 = -0.5;

/// Map four corner points through `matrix`, adding the half-texel bias.
///
/// Only positions are touched; color and UV are the caller's business.
#[inline]
pub fn transform_corners(matrix: &Mat4, corners: [Vec2; 4]) -> [[f32; 4]; 4] {
    corners.map(|p| transform_point(matrix, p))
}

#[inline]
pub fn transform_point(matrix: &Mat4, p: Vec2) -> [f32; 4] {
    let mut out = *matrix * Vec4::new(p.x, p.y, 0.0, 1.0);
    out.x += HALF_TEXEL_BIAS;
    out.y += HALF_TEXEL_BIAS;
    out.to_array()
}

/// Current sprite transform with an optional matrix stack.
///
/// # Example
///
/// ```
/// use glam::Mat4;
/// use tessera_render::SpriteTransform;
///
/// let mut t = SpriteTransform::new();
/// t.reset(true);
/// t.set(Mat4::from_translation(glam::Vec3::new(10.0, 0.0, 0.0)));
/// t.multiply(Mat4::from_scale(glam::Vec3::splat(2.0)));
/// t.pop();
/// assert_eq!(t.current().w_axis.x, 10.0);
/// ```
#[derive(Debug, Clone)]
pub struct SpriteTransform {
    current: Mat4,
    stack: Vec<Mat4>,
    stacking: bool,
}

impl Default for SpriteTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteTransform {
    pub fn new() -> Self {
        Self {
            current: Mat4::IDENTITY,
            stack: Vec::new(),
            stacking: false,
        }
    }

    #[inline]
    pub fn current(&self) -> &Mat4 {
        &self.current
    }

    pub fn is_stacking(&self) -> bool {
        self.stacking
    }

    /// Number of matrices on the stack, the current one included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Reset to identity, clear the stack and choose the stacking mode.
    pub fn reset(&mut self, stacking: bool) {
        self.current = Mat4::IDENTITY;
        self.stack.clear();
        self.stacking = stacking;
    }

    /// Replace the current transform.
    pub fn set(&mut self, matrix: Mat4) {
        self.current = matrix;
        self.push_current();
    }

    /// Apply `matrix` after the current transform: `current = matrix * current`.
    pub fn multiply(&mut self, matrix: Mat4) {
        self.current = matrix * self.current;
        self.push_current();
    }

    /// Apply `matrix` before the current transform: `current = current * matrix`.
    pub fn pre_multiply(&mut self, matrix: Mat4) {
        self.current = self.current * matrix;
        self.push_current();
    }

    /// Restore the transform that was current before the last stacked change.
    ///
    /// Only valid while stacking with a non-empty stack.
    pub fn pop(&mut self) {
        debug_assert!(self.stacking, "pop_transform requires USE_POST_TRANSFORM_STACK");
        debug_assert!(!self.stack.is_empty(), "pop_transform on an empty transform stack");
        if !self.stacking || self.stack.pop().is_none() {
            return;
        }
        self.current = self.stack.last().copied().unwrap_or(Mat4::IDENTITY);
    }

    fn push_current(&mut self) {
        if self.stacking {
            self.stack.push(self.current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_identity_applies_only_bias() {
        let out = transform_point(&Mat4::IDENTITY, Vec2::new(10.0, 20.0));
        assert!((out[0] - 9.5).abs() < EPS);
        assert!((out[1] - 19.5).abs() < EPS);
        assert_eq!(out[2], 0.0);
        assert_eq!(out[3], 1.0);
    }

    #[test]
    fn test_translation() {
        let m = Mat4::from_translation(Vec3::new(100.0, 50.0, 0.0));
        let out = transform_corners(&m, [Vec2::ZERO, Vec2::X, Vec2::Y, Vec2::ONE]);
        assert!((out[3][0] - 100.5).abs() < EPS);
        assert!((out[3][1] - 50.5).abs() < EPS);
    }

    #[test]
    fn test_multiply_applies_after() {
        let mut t = SpriteTransform::new();
        t.set(Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        t.multiply(Mat4::from_scale(Vec3::splat(2.0)));

        // Translate first, then scale.
        let p = t.current().transform_point3(Vec3::ZERO);
        assert!((p.x - 20.0).abs() < EPS);
    }

    #[test]
    fn test_pre_multiply_applies_before() {
        let mut t = SpriteTransform::new();
        t.set(Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        t.pre_multiply(Mat4::from_scale(Vec3::splat(2.0)));

        // Scale first, then translate.
        let p = t.current().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p.x - 12.0).abs() < EPS);
    }

    #[test]
    fn test_stack_push_and_pop() {
        let mut t = SpriteTransform::new();
        t.reset(true);

        let a = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        t.set(a);
        t.multiply(Mat4::from_scale(Vec3::splat(3.0)));
        assert_eq!(t.depth(), 2);

        t.pop();
        assert_eq!(*t.current(), a);

        t.pop();
        assert_eq!(*t.current(), Mat4::IDENTITY);
        assert_eq!(t.depth(), 0);
    }

    #[test]
    fn test_no_stack_when_not_stacking() {
        let mut t = SpriteTransform::new();
        t.set(Mat4::from_scale(Vec3::splat(2.0)));
        t.multiply(Mat4::from_scale(Vec3::splat(2.0)));
        assert_eq!(t.depth(), 0);
        assert!((t.current().x_axis.x - 4.0).abs() < EPS);
    }
}
