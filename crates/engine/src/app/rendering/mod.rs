mod overlay;
mod renderer;
mod text;
mod transform;

pub(crate) use overlay::OverlayData;
pub use renderer::Renderer;
pub use transform::{world_length_to_px, world_to_screen, Viewport};

pub const PIXELS_PER_WORLD: f32 = 16.0;
