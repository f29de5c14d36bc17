use bytemuck::{Pod, Zeroable};

use crate::assets::TextureHandle;
use crate::coords::{Rect, Vec2};

use super::tex_units::TexUnits;

/// Per-vertex record of a textured quad.
///
/// All four vertices of a quad share everything except `vert` and
/// `tex_coord`. The vertex shader builds the model matrix from
/// `pos`/`size`/`rot` and transforms `vert`.
///
/// layout (44 bytes):
///
///  offset  0  vert       [f32; 2]  loc 0  corner minus origin, times scale
///  offset  8  pos        [f32; 2]  loc 1
///  offset 16  size       [f32; 2]  loc 2
///  offset 24  rot        f32       loc 3
///  offset 28  tex_unit   u32       loc 4
///  offset 32  tex_coord  [f32; 2]  loc 5
///  offset 40  alpha      f32       loc 6
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub vert: [f32; 2],
    pub pos: [f32; 2],
    pub size: [f32; 2],
    pub rot: f32,
    pub tex_unit: u32,
    pub tex_coord: [f32; 2],
    pub alpha: f32,
}

pub const QUAD_VERT_COUNT: usize = 4;
pub const QUAD_INDEX_COUNT: usize = 6;

/// Everything needed to write one quad into a batch slot.
#[derive(Debug, Copy, Clone)]
pub(crate) struct QuadParams {
    pub pos: Vec2,
    pub size: Vec2,
    pub origin: Vec2,
    pub scale: Vec2,
    pub rot: f32,
    pub tex_coords: Rect,
    pub alpha: f32,
}

impl QuadParams {
    fn write(&self, tex_unit: u32, out: &mut [QuadVertex]) {
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let tc = self.tex_coords;
        let tex = [
            [tc.origin.x, tc.origin.y],
            [tc.right(), tc.origin.y],
            [tc.right(), tc.bottom()],
            [tc.origin.x, tc.bottom()],
        ];

        for ((v, (cx, cy)), tex_coord) in out.iter_mut().zip(corners).zip(tex) {
            *v = QuadVertex {
                vert: [(cx - self.origin.x) * self.scale.x, (cy - self.origin.y) * self.scale.y],
                pos: [self.pos.x, self.pos.y],
                size: [self.size.x, self.size.y],
                rot: self.rot,
                tex_unit,
                tex_coord,
                alpha: self.alpha,
            };
        }
    }
}

/// Index pattern shared by every batch: two triangles per quad slot.
pub(crate) fn quad_indices(slot_count: usize) -> Vec<u16> {
    let mut indices = Vec::with_capacity(slot_count * QUAD_INDEX_COUNT);
    for slot in 0..slot_count {
        let base = (slot * QUAD_VERT_COUNT) as u16;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    indices
}

/// One reusable quad batch.
///
/// `gpu` holds the backend resources; it is `Some` exactly when `life > 0`.
/// Everything else is transient and cleared at the start of each
/// submission phase.
#[derive(Debug)]
pub(crate) struct Batch<G> {
    verts: Vec<QuadVertex>,
    slots_used: usize,
    slot_limit: usize,
    tex_units: TexUnits,
    pub(crate) life: u32,
    pub(crate) gpu: Option<G>,
}

/// Why a quad did not fit in a batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum BatchFull {
    Slots,
    TexUnits,
}

impl<G> Batch<G> {
    pub(crate) fn new(slot_limit: usize, tex_unit_limit: usize) -> Self {
        Self {
            verts: vec![QuadVertex::default(); slot_limit * QUAD_VERT_COUNT],
            slots_used: 0,
            slot_limit,
            tex_units: TexUnits::new(tex_unit_limit),
            life: 0,
            gpu: None,
        }
    }

    /// Writes a quad into the next free slot.
    pub(crate) fn push_quad(
        &mut self,
        texture: TextureHandle,
        quad: &QuadParams,
    ) -> Result<(), BatchFull> {
        if self.slots_used == self.slot_limit {
            return Err(BatchFull::Slots);
        }
        let unit = self.tex_units.assign(texture).ok_or(BatchFull::TexUnits)?;

        let start = self.slots_used * QUAD_VERT_COUNT;
        quad.write(unit, &mut self.verts[start..start + QUAD_VERT_COUNT]);
        self.slots_used += 1;
        Ok(())
    }

    #[inline]
    pub(crate) fn slots_used(&self) -> usize {
        self.slots_used
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.slots_used == 0
    }

    /// Vertices of the used slots.
    pub(crate) fn used_vertices(&self) -> &[QuadVertex] {
        &self.verts[..self.slots_used * QUAD_VERT_COUNT]
    }

    /// The full vertex store, used slots first. Sizes the GPU vertex buffer.
    pub(crate) fn all_vertices(&self) -> &[QuadVertex] {
        &self.verts
    }

    pub(crate) fn textures(&self) -> &[TextureHandle] {
        self.tex_units.handles()
    }

    /// Resets the transient data. Slots past `slots_used` are never read,
    /// so the vertex store is left as is.
    pub(crate) fn clear_transient(&mut self) {
        self.slots_used = 0;
        self.tex_units.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_at(x: f32) -> QuadParams {
        QuadParams {
            pos: Vec2::new(x, 0.0),
            size: Vec2::new(16.0, 8.0),
            origin: Vec2::new(0.5, 0.5),
            scale: Vec2::new(2.0, 1.0),
            rot: 0.0,
            tex_coords: Rect::new(0.0, 0.0, 0.5, 0.25),
            alpha: 1.0,
        }
    }

    #[test]
    fn vertex_is_44_bytes() {
        assert_eq!(std::mem::size_of::<QuadVertex>(), 44);
    }

    #[test]
    fn writes_corners_relative_to_origin() {
        let mut batch: Batch<()> = Batch::new(4, 2);
        batch.push_quad(TextureHandle(1), &quad_at(10.0)).unwrap();

        let v = batch.used_vertices();
        assert_eq!(v.len(), 4);
        assert_eq!(v[0].vert, [-1.0, -0.5]);
        assert_eq!(v[2].vert, [1.0, 0.5]);
        assert_eq!(v[2].tex_coord, [0.5, 0.25]);
        assert_eq!(v[3].tex_coord, [0.0, 0.25]);
        assert!(v.iter().all(|v| v.pos == [10.0, 0.0] && v.tex_unit == 0));
    }

    #[test]
    fn reports_full_slots_before_tex_units() {
        let mut batch: Batch<()> = Batch::new(1, 1);
        batch.push_quad(TextureHandle(1), &quad_at(0.0)).unwrap();
        assert_eq!(batch.push_quad(TextureHandle(1), &quad_at(1.0)), Err(BatchFull::Slots));

        let mut batch: Batch<()> = Batch::new(4, 1);
        batch.push_quad(TextureHandle(1), &quad_at(0.0)).unwrap();
        assert_eq!(batch.push_quad(TextureHandle(2), &quad_at(1.0)), Err(BatchFull::TexUnits));
        assert_eq!(batch.slots_used(), 1);
    }

    #[test]
    fn clear_resets_slots_and_units() {
        let mut batch: Batch<()> = Batch::new(2, 1);
        batch.push_quad(TextureHandle(1), &quad_at(0.0)).unwrap();
        batch.clear_transient();

        assert!(batch.is_empty());
        assert!(batch.textures().is_empty());
        assert!(batch.push_quad(TextureHandle(2), &quad_at(0.0)).is_ok());
    }

    #[test]
    fn index_pattern_repeats_per_slot() {
        let indices = quad_indices(2);
        assert_eq!(indices, vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
    }
}
