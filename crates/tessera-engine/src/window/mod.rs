//! Window collaborator interface.
//!
//! The renderer never talks to a windowing library directly; it only asks for
//! the current drawable size (projection matrix, surface sizing).

use winit::window::Window;

use crate::coords::Vec2I;

/// Source of the current drawable size in physical pixels.
pub trait DrawableSize {
    fn drawable_size(&self) -> Vec2I;
}

impl DrawableSize for Window {
    fn drawable_size(&self) -> Vec2I {
        let size = self.inner_size();
        Vec2I::new(size.width as i32, size.height as i32)
    }
}

/// A fixed size. Handy for headless use and tests.
impl DrawableSize for Vec2I {
    fn drawable_size(&self) -> Vec2I {
        *self
    }
}
