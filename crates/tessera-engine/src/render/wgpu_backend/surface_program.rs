use crate::render::{BackendError, UniformKind, UniformValue};

/// Byte layout of a surface program's uniform block, following WGSL
/// uniform address-space rules for the declared members in order.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct UniformLayout {
    members: Vec<UniformMember>,
    size: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct UniformMember {
    name: String,
    kind: UniformKind,
    offset: usize,
}

fn align_and_size(kind: UniformKind) -> (usize, usize) {
    match kind {
        UniformKind::Float | UniformKind::Int => (4, 4),
        UniformKind::Vec2 => (8, 8),
        UniformKind::Vec3 => (16, 12),
        UniformKind::Vec4 => (16, 16),
        UniformKind::Mat4 => (16, 64),
    }
}

fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

impl UniformLayout {
    pub(super) fn new(uniforms: &[(&str, UniformKind)]) -> Result<Self, BackendError> {
        let mut members: Vec<UniformMember> = Vec::with_capacity(uniforms.len());
        let mut cursor = 0;

        for &(name, kind) in uniforms {
            if members.iter().any(|m| m.name == name) {
                return Err(BackendError(format!("uniform `{name}` declared twice")));
            }
            let (align, size) = align_and_size(kind);
            let offset = round_up(cursor, align);
            members.push(UniformMember { name: name.to_owned(), kind, offset });
            cursor = offset + size;
        }

        // Uniform blocks are bound in 16-byte units; an empty block still
        // gets one so the binding is never zero-sized.
        Ok(Self { members, size: round_up(cursor, 16).max(16) })
    }

    #[inline]
    pub(super) fn size(&self) -> usize {
        self.size
    }

    /// Writes `value` into `staging` at the offset of `name`.
    pub(super) fn write(&self, staging: &mut [u8], name: &str, value: &UniformValue) -> Result<(), BackendError> {
        let member = self
            .members
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| BackendError(format!("unknown uniform `{name}`")))?;
        if member.kind != value.kind() {
            return Err(BackendError(format!(
                "uniform `{name}` is {:?}, got {:?}",
                member.kind,
                value.kind()
            )));
        }

        let bytes = value.as_bytes();
        staging[member.offset..member.offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

/// A registered full-screen program: pipeline plus CPU copy of its uniforms.
pub(super) struct SurfaceProgram {
    pub pipeline: wgpu::RenderPipeline,
    pub layout: UniformLayout,
    pub staging: Vec<u8>,
}
