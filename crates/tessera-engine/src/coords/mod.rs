//! Coordinate and geometry types shared across the renderer.
//!
//! Canonical CPU space:
//! - Pixels
//! - Origin top-left
//! - +X right, +Y down
//!
//! The renderer converts to clip space with an orthographic projection built
//! from the drawable size.

mod camera;
mod color;
mod mat4;
mod rect;
mod vec2;

pub use camera::Camera;
pub use color::ColorRgba;
pub use mat4::Mat4;
pub use rect::{Rect, RectI};
pub use vec2::{Vec2, Vec2I};
