use super::{Mat4, Vec2, Vec2I};

/// 2D camera centred on `pos`, zoomed by `scale`.
///
/// The camera's view matrix is meant to be recorded with
/// [`crate::render::Renderer::set_view_matrix`] before world-space quads.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub pos: Vec2,
    pub scale: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pos: Vec2::zero(), scale: 1.0 }
    }
}

impl Camera {
    #[inline]
    pub const fn new(pos: Vec2, scale: f32) -> Self {
        Self { pos, scale }
    }

    /// Visible world-space extent for a window of `window_size` pixels.
    pub fn size(&self, window_size: Vec2I) -> Vec2 {
        window_size.to_vec2() / self.scale
    }

    pub fn top_left(&self, window_size: Vec2I) -> Vec2 {
        self.pos - self.size(window_size) / 2.0
    }

    pub fn bottom_right(&self, window_size: Vec2I) -> Vec2 {
        self.pos + self.size(window_size) / 2.0
    }

    pub fn to_screen(&self, world: Vec2, window_size: Vec2I) -> Vec2 {
        (world - self.top_left(window_size)) * self.scale
    }

    pub fn to_world(&self, screen: Vec2, window_size: Vec2I) -> Vec2 {
        screen / self.scale + self.top_left(window_size)
    }

    /// View matrix equivalent to [`Camera::to_screen`].
    pub fn view_matrix(&self, window_size: Vec2I) -> Mat4 {
        let scale = Mat4::scale(Vec2::new(self.scale, self.scale));
        let translate = Mat4::translation(-self.top_left(window_size));
        scale.mul(&translate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Vec2I = Vec2I::new(800, 600);

    #[test]
    fn centre_maps_to_screen_centre() {
        let cam = Camera::new(Vec2::new(100.0, 50.0), 2.0);
        assert_eq!(cam.to_screen(cam.pos, WINDOW), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn screen_world_round_trip() {
        let cam = Camera::new(Vec2::new(-20.0, 7.5), 0.5);
        let p = Vec2::new(123.0, 456.0);
        let back = cam.to_screen(cam.to_world(p, WINDOW), WINDOW);
        assert!((back.x - p.x).abs() < 1e-3 && (back.y - p.y).abs() < 1e-3);
    }

    #[test]
    fn view_matrix_agrees_with_to_screen() {
        let cam = Camera::new(Vec2::new(30.0, 40.0), 1.5);
        let world = Vec2::new(12.0, -8.0);
        let a = cam.view_matrix(WINDOW).transform_point(world);
        let b = cam.to_screen(world, WINDOW);
        assert!((a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3);
    }

    #[test]
    fn extent_shrinks_with_zoom() {
        let cam = Camera::new(Vec2::zero(), 2.0);
        assert_eq!(cam.size(WINDOW), Vec2::new(400.0, 300.0));
        assert_eq!(cam.top_left(WINDOW), Vec2::new(-200.0, -150.0));
        assert_eq!(cam.bottom_right(WINDOW), Vec2::new(200.0, 150.0));
    }
}
