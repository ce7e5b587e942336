//! Coordinate and colour types shared by the CPU reference math and renderers.
//!
//! Spaces in use:
//! - clip space / NDC (float quads, basic vertices)
//! - physical pixels, bottom-left origin after NDC conversion (integer quads)

mod color;
mod vec2;
mod viewport;

pub use color::ColorRgba;
pub use vec2::Vec2;
pub use viewport::Viewport;
