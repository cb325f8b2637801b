use nalgebra::{Matrix4, Orthographic3};

const NEAR: f32 = -1.0;
const FAR: f32 = 1.0;

/// Maps `(0, 0)..(width, height)` screen space to clip space with the origin
/// at the bottom-left and y pointing up.
pub fn screen_projection(width: f32, height: f32) -> Matrix4<f32> {
    Orthographic3::new(0.0, width, 0.0, height, NEAR, FAR).into_inner()
}
