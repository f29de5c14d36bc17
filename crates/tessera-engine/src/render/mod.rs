//! Batched 2D rendering.
//!
//! Quads and text are accumulated into a fixed pool of reusable GPU batches
//! while draw order is recorded as an instruction stream. The stream is
//! replayed at render time against the backend and a stack of off-screen
//! surfaces.
//!
//! Convention:
//! - Positions are in pixels (top-left origin, +Y down).
//! - The projection is an orthographic mapping of the current window size.

mod backend;
mod batch;
mod config;
mod error;
mod instr;
mod renderer;
mod surface;
mod tex_units;
mod wgpu_backend;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{BatchDraw, GpuBackend};
pub use batch::QuadVertex;
pub use config::{RendererConfig, MAX_BATCH_SLOTS, MAX_TEX_UNITS};
pub use error::{BackendError, RenderError};
pub use instr::{Instruction, StateInstruction, UniformKind, UniformValue};
pub use renderer::{Renderer, TexturedQuad};
pub use surface::SurfaceId;
pub use wgpu_backend::{WgpuBackend, WgpuBatch, WgpuSurface};
