//! GPU-free backend that records every call, for renderer tests.

use crate::assets::{ShaderProgramHandle, TextureHandle};
use crate::coords::{ColorRgba, Mat4, Vec2I};

use super::{BackendError, BatchDraw, GpuBackend, UniformValue};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateBatch { id: u32, vertex_bytes: usize, indices: usize },
    UploadVertices { id: u32, bytes: usize },
    DestroyBatch(u32),
    CreateSurface { id: u32, size: Vec2I },
    ResizeSurface { id: u32, size: Vec2I },
    DestroySurface(u32),
    BindTarget(Option<u32>),
    Clear(ColorRgba),
    DrawBatch { id: u32, textures: Vec<TextureHandle>, quads: usize, view: Mat4 },
    SetUniform { program: ShaderProgramHandle, name: String, value: UniformValue },
    DrawSurface { surface: u32, program: ShaderProgramHandle },
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct FakeBatch(pub u32);

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct FakeSurface {
    pub id: u32,
    pub size: Vec2I,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingBackend {
    pub calls: Vec<Call>,
    fail_creates: bool,
    next_id: u32,
}

impl RecordingBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A backend whose resource creation always fails.
    pub(crate) fn failing() -> Self {
        Self { fail_creates: true, ..Self::default() }
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub(crate) fn target_binds(&self) -> Vec<Option<u32>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::BindTarget(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl GpuBackend for RecordingBackend {
    type Batch = FakeBatch;
    type Surface = FakeSurface;

    fn create_batch(&mut self, vertex_bytes: &[u8], indices: &[u16]) -> Result<FakeBatch, BackendError> {
        if self.fail_creates {
            return Err(BackendError("out of memory".into()));
        }
        let id = self.next_id();
        self.calls.push(Call::CreateBatch { id, vertex_bytes: vertex_bytes.len(), indices: indices.len() });
        Ok(FakeBatch(id))
    }

    fn upload_vertices(&mut self, batch: &FakeBatch, vertex_bytes: &[u8]) {
        self.calls.push(Call::UploadVertices { id: batch.0, bytes: vertex_bytes.len() });
    }

    fn destroy_batch(&mut self, batch: FakeBatch) {
        self.calls.push(Call::DestroyBatch(batch.0));
    }

    fn create_surface(&mut self, size: Vec2I) -> Result<FakeSurface, BackendError> {
        if self.fail_creates {
            return Err(BackendError("out of memory".into()));
        }
        let id = self.next_id();
        self.calls.push(Call::CreateSurface { id, size });
        Ok(FakeSurface { id, size })
    }

    fn resize_surface(&mut self, surface: &mut FakeSurface, size: Vec2I) -> Result<(), BackendError> {
        surface.size = size;
        self.calls.push(Call::ResizeSurface { id: surface.id, size });
        Ok(())
    }

    fn destroy_surface(&mut self, surface: FakeSurface) {
        self.calls.push(Call::DestroySurface(surface.id));
    }

    fn bind_target(&mut self, target: Option<&FakeSurface>) {
        self.calls.push(Call::BindTarget(target.map(|s| s.id)));
    }

    fn clear(&mut self, color: ColorRgba) {
        self.calls.push(Call::Clear(color));
    }

    fn draw_batch(&mut self, draw: BatchDraw<'_, FakeBatch>) {
        self.calls.push(Call::DrawBatch {
            id: draw.batch.0,
            textures: draw.textures.to_vec(),
            quads: draw.quad_count,
            view: draw.view,
        });
    }

    fn set_surface_uniform(&mut self, program: ShaderProgramHandle, name: &str, value: &UniformValue) {
        self.calls.push(Call::SetUniform { program, name: name.to_owned(), value: *value });
    }

    fn draw_surface(&mut self, surface: &FakeSurface, program: ShaderProgramHandle) {
        self.calls.push(Call::DrawSurface { surface: surface.id, program });
    }
}
