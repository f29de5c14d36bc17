use crate::text::LayoutError;

use super::SurfaceId;

/// Backend failed to create or resize a GPU resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("gpu backend: {0}")]
pub struct BackendError(pub String);

/// Errors reported by [`super::Renderer`].
///
/// Calling a phase-specific operation in the wrong phase is a programming
/// error and panics instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("all {limit} render batches are in use")]
    BatchPoolExhausted { limit: usize },

    #[error("instruction stream is full ({limit} instructions)")]
    InstructionStreamFull { limit: usize },

    #[error("surface table is full ({limit} surfaces)")]
    SurfaceTableFull { limit: usize },

    #[error("surface {0:?} does not exist (removed or never added)")]
    StaleSurface(SurfaceId),

    #[error("surface stack exceeds {limit} nested surfaces")]
    SurfaceStackOverflow { limit: usize },

    #[error("surface unset without a matching set")]
    SurfaceStackUnderflow,

    #[error("surface uniform or draw recorded before a surface shader program was set")]
    SurfaceProgramUnset,

    #[error("unknown texture index {0}")]
    UnknownTexture(usize),

    #[error("unknown font index {0}")]
    UnknownFont(usize),

    #[error("unknown shader program index {0}")]
    UnknownShaderProgram(usize),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("invalid renderer config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl RenderError {
    /// True for fixed-capacity exhaustion: the frame being submitted is
    /// incomplete, but the renderer is usable again next frame.
    pub fn is_capacity_exhaustion(&self) -> bool {
        matches!(
            self,
            Self::BatchPoolExhausted { .. }
                | Self::InstructionStreamFull { .. }
                | Self::SurfaceTableFull { .. }
        )
    }
}
