use crate::assets::{ShaderProgramHandle, TextureHandle};
use crate::coords::{ColorRgba, Mat4, Vec2I};

use super::{BackendError, UniformValue};

/// One `DrawBatch` replay, resolved against the batch's GPU resources.
#[derive(Debug)]
pub struct BatchDraw<'a, G> {
    pub batch: &'a G,
    /// Texture bound to each unit, in unit order.
    pub textures: &'a [TextureHandle],
    pub quad_count: usize,
    pub projection: Mat4,
    pub view: Mat4,
}

/// GPU capability the renderer drives.
///
/// Resource types are owned by the renderer between calls; the backend only
/// sees them while a call is in progress.
pub trait GpuBackend {
    /// Vertex and index storage for one quad batch.
    type Batch;
    /// Off-screen color target that can also be sampled.
    type Surface;

    /// Creates a batch whose vertex buffer holds `vertex_bytes.len()` bytes,
    /// initialised with `vertex_bytes`, and whose index buffer holds `indices`.
    fn create_batch(&mut self, vertex_bytes: &[u8], indices: &[u16]) -> Result<Self::Batch, BackendError>;
    fn upload_vertices(&mut self, batch: &Self::Batch, vertex_bytes: &[u8]);
    fn destroy_batch(&mut self, batch: Self::Batch);

    fn create_surface(&mut self, size: Vec2I) -> Result<Self::Surface, BackendError>;
    /// Recreates the backing texture at `size`; the surface itself is kept.
    fn resize_surface(&mut self, surface: &mut Self::Surface, size: Vec2I) -> Result<(), BackendError>;
    fn destroy_surface(&mut self, surface: Self::Surface);

    /// Directs following clears and draws at `target`, or at the default
    /// target when `None`.
    fn bind_target(&mut self, target: Option<&Self::Surface>);
    fn clear(&mut self, color: ColorRgba);
    fn draw_batch(&mut self, draw: BatchDraw<'_, Self::Batch>);

    fn set_surface_uniform(&mut self, program: ShaderProgramHandle, name: &str, value: &UniformValue);
    /// Draws `surface` as a full-screen quad through `program`.
    fn draw_surface(&mut self, surface: &Self::Surface, program: ShaderProgramHandle);
}
