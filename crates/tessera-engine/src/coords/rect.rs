use super::{Vec2, Vec2I};

/// Axis-aligned rectangle (top-left origin).
///
/// Also used for normalized texture coordinates, where `origin` is the
/// top-left UV and `size` the UV extent.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub fn right(self) -> f32 {
        self.origin.x + self.size.x
    }

    #[inline]
    pub fn bottom(self) -> f32 {
        self.origin.y + self.size.y
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }
}

/// Integer rectangle in pixels. Source rectangles into textures and font
/// atlases are expressed with this type.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct RectI {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl RectI {
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn size(self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// Maps this pixel rectangle into normalized texture coordinates for a
    /// texture of `tex_size` pixels.
    ///
    /// A degenerate texture size yields an empty rect rather than NaNs.
    pub fn to_tex_coords(self, tex_size: Vec2I) -> Rect {
        if !tex_size.is_positive() {
            return Rect::default();
        }
        let tw = tex_size.x as f32;
        let th = tex_size.y as f32;
        Rect::new(
            self.x as f32 / tw,
            self.y as f32 / th,
            self.width as f32 / tw,
            self.height as f32 / th,
        )
    }
}
