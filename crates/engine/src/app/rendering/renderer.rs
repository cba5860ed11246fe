use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::{CameraRig, DebugShape, RenderableKind, SceneObject, SceneWorld, Vec3};

use super::overlay::{draw_overlay, draw_toasts, OverlayData};
use super::text::{draw_filled_rect, write_pixel_rgba_clipped};
use super::transform::world_length_to_px;
use super::{world_to_screen, Viewport, PIXELS_PER_WORLD};

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];
const GRID_CELL_WORLD: f32 = 1.0;
const GRID_MAJOR_EVERY: i32 = 5;
const GRID_MINOR_COLOR: [u8; 4] = [35, 39, 46, 255];
const GRID_MAJOR_COLOR: [u8; 4] = [52, 58, 70, 255];
const HEADING_COLOR: [u8; 4] = [255, 255, 255, 255];
const MIN_OBJECT_HALF_SIZE_PX: i32 = 1;

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render_world(
        &mut self,
        world: &SceneWorld,
        overlay_data: Option<&OverlayData>,
    ) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }

        let viewport = self.viewport;
        let frame = self.pixels.frame_mut();
        draw_scene(frame, viewport, world);

        let toasts: Vec<&str> = world
            .toasts()
            .iter()
            .map(|toast| toast.message.as_str())
            .collect();
        draw_toasts(frame, viewport.width, viewport.height, &toasts);

        if let Some(data) = overlay_data {
            draw_overlay(frame, viewport.width, viewport.height, data);
        }

        self.pixels.render()
    }
}

fn draw_scene(frame: &mut [u8], viewport: Viewport, world: &SceneWorld) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&CLEAR_COLOR);
    }
    draw_world_grid(frame, viewport, world.camera());

    for shape in world.debug_shapes() {
        draw_debug_shape(frame, viewport, world.camera(), shape);
    }
    for object in world.objects().iter().filter(|object| object.visible) {
        draw_object(frame, viewport, world.camera(), object);
    }
}

fn color_for_kind(kind: RenderableKind) -> [u8; 4] {
    match kind {
        RenderableKind::Avatar => [240, 200, 90, 255],
        RenderableKind::Vehicle => [220, 80, 70, 255],
        RenderableKind::Wheel => [60, 60, 60, 255],
        RenderableKind::Portal => [120, 90, 230, 255],
        RenderableKind::Interactable => [80, 200, 230, 255],
        RenderableKind::Prop => [150, 160, 170, 255],
    }
}

fn base_half_size_world(kind: RenderableKind) -> f32 {
    match kind {
        RenderableKind::Avatar => 0.4,
        RenderableKind::Vehicle => 1.0,
        RenderableKind::Wheel => 0.2,
        RenderableKind::Portal => 0.6,
        RenderableKind::Interactable => 0.5,
        RenderableKind::Prop => 0.5,
    }
}

fn draw_object(frame: &mut [u8], viewport: Viewport, camera: &CameraRig, object: &SceneObject) {
    let kind = object.renderable.kind;
    let (cx, cy) = world_to_screen(
        object.transform.position,
        camera,
        viewport,
        PIXELS_PER_WORLD,
    );
    let scale = object.transform.scale.x.abs();
    let half = world_length_to_px(base_half_size_world(kind) * scale, PIXELS_PER_WORLD);
    if half < MIN_OBJECT_HALF_SIZE_PX {
        return;
    }
    draw_filled_rect(
        frame,
        viewport.width,
        viewport.height,
        cx - half,
        cy - half,
        half * 2 + 1,
        half * 2 + 1,
        color_for_kind(kind),
    );

    if matches!(kind, RenderableKind::Avatar | RenderableKind::Vehicle) {
        let heading = object.transform.rotation * Vec3::Z;
        let tip = object.transform.position + heading * base_half_size_world(kind) * scale * 1.5;
        let (tx, ty) = world_to_screen(tip, camera, viewport, PIXELS_PER_WORLD);
        draw_line_clipped(frame, viewport, (cx, cy), (tx, ty), HEADING_COLOR);
    }
}

fn draw_debug_shape(frame: &mut [u8], viewport: Viewport, camera: &CameraRig, shape: &DebugShape) {
    match *shape {
        DebugShape::Circle {
            center,
            radius,
            rgba,
        } => {
            let (cx, cy) = world_to_screen(center, camera, viewport, PIXELS_PER_WORLD);
            let radius_px = world_length_to_px(radius, PIXELS_PER_WORLD);
            draw_circle_outline(frame, viewport, cx, cy, radius_px, rgba);
        }
        DebugShape::Line { from, to, rgba } => {
            let a = world_to_screen(from, camera, viewport, PIXELS_PER_WORLD);
            let b = world_to_screen(to, camera, viewport, PIXELS_PER_WORLD);
            draw_line_clipped(frame, viewport, a, b, rgba);
        }
    }
}

fn draw_circle_outline(
    frame: &mut [u8],
    viewport: Viewport,
    cx: i32,
    cy: i32,
    radius: i32,
    color: [u8; 4],
) {
    if radius <= 0 {
        write_pixel_rgba_clipped(frame, viewport.width, viewport.height, cx, cy, color);
        return;
    }
    // Midpoint circle, eight-way symmetric.
    let mut x = radius;
    let mut y = 0;
    let mut error = 1 - radius;
    while x >= y {
        for (dx, dy) in [
            (x, y),
            (y, x),
            (-y, x),
            (-x, y),
            (-x, -y),
            (-y, -x),
            (y, -x),
            (x, -y),
        ] {
            write_pixel_rgba_clipped(frame, viewport.width, viewport.height, cx + dx, cy + dy, color);
        }
        y += 1;
        if error < 0 {
            error += 2 * y + 1;
        } else {
            x -= 1;
            error += 2 * (y - x) + 1;
        }
    }
}

fn draw_line_clipped(
    frame: &mut [u8],
    viewport: Viewport,
    from: (i32, i32),
    to: (i32, i32),
    color: [u8; 4],
) {
    let (mut x0, mut y0) = from;
    let (x1, y1) = to;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut error = dx + dy;
    let max_steps = (dx - dy).max(0) as usize + 1;

    for _ in 0..max_steps {
        write_pixel_rgba_clipped(frame, viewport.width, viewport.height, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let doubled = 2 * error;
        if doubled >= dy {
            error += dy;
            x0 += sx;
        }
        if doubled <= dx {
            error += dx;
            y0 += sy;
        }
    }
}

fn draw_world_grid(frame: &mut [u8], viewport: Viewport, camera: &CameraRig) {
    let half_w_world = viewport.width as f32 / (2.0 * PIXELS_PER_WORLD);
    let half_h_world = viewport.height as f32 / (2.0 * PIXELS_PER_WORLD);
    let ix_start = ((camera.look_at.x - half_w_world) / GRID_CELL_WORLD).floor() as i32 - 1;
    let ix_end = ((camera.look_at.x + half_w_world) / GRID_CELL_WORLD).ceil() as i32 + 1;
    let iz_start = ((camera.look_at.z - half_h_world) / GRID_CELL_WORLD).floor() as i32 - 1;
    let iz_end = ((camera.look_at.z + half_h_world) / GRID_CELL_WORLD).ceil() as i32 + 1;

    for ix in ix_start..=ix_end {
        let point = Vec3::new(ix as f32 * GRID_CELL_WORLD, 0.0, camera.look_at.z);
        let (screen_x, _) = world_to_screen(point, camera, viewport, PIXELS_PER_WORLD);
        draw_filled_rect(
            frame,
            viewport.width,
            viewport.height,
            screen_x,
            0,
            1,
            viewport.height as i32,
            grid_color(ix),
        );
    }
    for iz in iz_start..=iz_end {
        let point = Vec3::new(camera.look_at.x, 0.0, iz as f32 * GRID_CELL_WORLD);
        let (_, screen_y) = world_to_screen(point, camera, viewport, PIXELS_PER_WORLD);
        draw_filled_rect(
            frame,
            viewport.width,
            viewport.height,
            0,
            screen_y,
            viewport.width as i32,
            1,
            grid_color(iz),
        );
    }
}

fn grid_color(index: i32) -> [u8; 4] {
    if index.rem_euclid(GRID_MAJOR_EVERY) == 0 {
        GRID_MAJOR_COLOR
    } else {
        GRID_MINOR_COLOR
    }
}

#[cfg(test)]
mod tests {
    use crate::app::{RenderableDesc, Transform};

    use super::*;

    fn viewport() -> Viewport {
        Viewport {
            width: 64,
            height: 64,
        }
    }

    fn pixel_at(frame: &[u8], viewport: Viewport, x: i32, y: i32) -> [u8; 4] {
        let offset = ((y as u32 * viewport.width + x as u32) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn renderer_type_is_non_generic() {
        let _size = std::mem::size_of::<Renderer>();
    }

    #[test]
    fn visible_object_is_drawn_at_camera_center() {
        let mut world = SceneWorld::default();
        world.camera_mut().look_at = Vec3::new(5.0, 0.0, 5.0);
        world.spawn(
            Transform::at(Vec3::new(5.0, 0.0, 5.0)),
            RenderableDesc::new(RenderableKind::Prop, "crate"),
        );
        world.apply_pending();

        let mut frame = vec![0u8; (64 * 64 * 4) as usize];
        draw_scene(&mut frame, viewport(), &world);
        assert_eq!(
            pixel_at(&frame, viewport(), 32, 32),
            color_for_kind(RenderableKind::Prop)
        );
    }

    #[test]
    fn hidden_and_shrunk_objects_are_skipped() {
        let mut world = SceneWorld::default();
        let hidden = world.spawn(
            Transform::default(),
            RenderableDesc::new(RenderableKind::Interactable, "hidden"),
        );
        let mut shrunk = Transform::default();
        shrunk.scale = Vec3::splat(0.001);
        world.spawn(shrunk, RenderableDesc::new(RenderableKind::Avatar, "shrunk"));
        world.apply_pending();
        world.find_object_mut(hidden).expect("hidden").visible = false;

        let mut frame = vec![0u8; (64 * 64 * 4) as usize];
        draw_scene(&mut frame, viewport(), &world);
        assert!(frame
            .chunks_exact(4)
            .all(|pixel| pixel != color_for_kind(RenderableKind::Interactable)
                && pixel != color_for_kind(RenderableKind::Avatar)));
    }

    #[test]
    fn shapes_far_outside_viewport_are_clipped_safely() {
        let mut frame = vec![0u8; (64 * 64 * 4) as usize];
        draw_circle_outline(&mut frame, viewport(), -500, 900, 40, [255; 4]);
        draw_line_clipped(&mut frame, viewport(), (-100, -100), (200, 300), [255; 4]);
    }

    #[test]
    fn line_reaches_both_endpoints() {
        let mut frame = vec![0u8; (64 * 64 * 4) as usize];
        let color = [9, 8, 7, 255];
        draw_line_clipped(&mut frame, viewport(), (3, 4), (20, 11), color);
        assert_eq!(pixel_at(&frame, viewport(), 3, 4), color);
        assert_eq!(pixel_at(&frame, viewport(), 20, 11), color);
    }
}
