use crate::coords::{ColorRgba, Mat4};

use super::{RenderError, SurfaceId};

/// Value of a surface shader uniform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4(Mat4),
}

/// Type tag of a [`UniformValue`], used when declaring program uniforms.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Float(_) => UniformKind::Float,
            Self::Int(_) => UniformKind::Int,
            Self::Vec2(_) => UniformKind::Vec2,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::Vec4(_) => UniformKind::Vec4,
            Self::Mat4(_) => UniformKind::Mat4,
        }
    }

    /// Raw bytes as laid out in a uniform buffer.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Float(v) => bytemuck::bytes_of(v),
            Self::Int(v) => bytemuck::bytes_of(v),
            Self::Vec2(v) => bytemuck::cast_slice(v),
            Self::Vec3(v) => bytemuck::cast_slice(v),
            Self::Vec4(v) => bytemuck::cast_slice(v),
            Self::Mat4(m) => bytemuck::bytes_of(m),
        }
    }
}

/// State-changing operations a caller may record between quads.
///
/// Recording one while the current batch holds quads closes that batch, so
/// one `DrawBatch` never straddles a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum StateInstruction {
    Clear(ColorRgba),
    SetViewMatrix(Mat4),
    SetSurface(SurfaceId),
    UnsetSurface,
    /// Selects the surface program by asset index.
    SetSurfaceShaderProgram(usize),
    SetSurfaceShaderUniform { name: String, value: UniformValue },
    DrawSurface(SurfaceId),
}

/// One recorded render operation. Replayed in order at render time.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Clear(ColorRgba),
    SetViewMatrix(Mat4),
    DrawBatch(usize),
    SetSurface(SurfaceId),
    UnsetSurface,
    SetSurfaceShaderProgram(usize),
    SetSurfaceShaderUniform { name: String, value: UniformValue },
    DrawSurface(SurfaceId),
}

impl From<StateInstruction> for Instruction {
    fn from(instr: StateInstruction) -> Self {
        match instr {
            StateInstruction::Clear(color) => Self::Clear(color),
            StateInstruction::SetViewMatrix(m) => Self::SetViewMatrix(m),
            StateInstruction::SetSurface(id) => Self::SetSurface(id),
            StateInstruction::UnsetSurface => Self::UnsetSurface,
            StateInstruction::SetSurfaceShaderProgram(p) => Self::SetSurfaceShaderProgram(p),
            StateInstruction::SetSurfaceShaderUniform { name, value } => {
                Self::SetSurfaceShaderUniform { name, value }
            }
            StateInstruction::DrawSurface(id) => Self::DrawSurface(id),
        }
    }
}

/// Bounded, append-only instruction log for one frame.
#[derive(Debug, Clone)]
pub(crate) struct InstructionStream {
    instrs: Vec<Instruction>,
    limit: usize,
}

impl InstructionStream {
    pub(crate) fn new(limit: usize) -> Self {
        Self { instrs: Vec::with_capacity(limit), limit }
    }

    pub(crate) fn push(&mut self, instr: Instruction) -> Result<(), RenderError> {
        if self.is_full() {
            return Err(RenderError::InstructionStreamFull { limit: self.limit });
        }
        self.instrs.push(instr);
        Ok(())
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.instrs.len() >= self.limit
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[Instruction] {
        &self.instrs
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.instrs.clear();
    }
}
