use crate::app::{CameraRig, Vec3};

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Top-down projection centred on the camera's look-at point.
///
/// World +Z (forward) maps to screen up and world +X (the avatar's left) maps
/// to screen left, so the view reads like the follow camera looking down the
/// forward axis. Height is ignored.
pub fn world_to_screen(
    world: Vec3,
    camera: &CameraRig,
    viewport: Viewport,
    pixels_per_world: f32,
) -> (i32, i32) {
    let x = viewport.width as f32 * 0.5 - (world.x - camera.look_at.x) * pixels_per_world;
    let y = viewport.height as f32 * 0.5 - (world.z - camera.look_at.z) * pixels_per_world;
    (x.round() as i32, y.round() as i32)
}

pub fn world_length_to_px(length: f32, pixels_per_world: f32) -> i32 {
    (length * pixels_per_world).round().max(0.0) as i32
}
