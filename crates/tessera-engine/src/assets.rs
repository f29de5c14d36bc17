//! Assets collaborator interface.
//!
//! Asset loading and decoding live outside this crate. The renderer reads
//! texture sizes, GPU handles, font metrics, and shader-program handles
//! through [`Assets`], borrowed immutably for the duration of each call.

use crate::coords::Vec2I;
use crate::text::FontArrangement;

/// Opaque GPU texture handle, resolved by the active backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Opaque handle to a full-screen surface shader program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ShaderProgramHandle(pub u32);

/// Read-only view of loaded assets, addressed by index.
///
/// Every accessor returns `None` for an index that does not exist.
pub trait Assets {
    fn texture_size(&self, index: usize) -> Option<Vec2I>;
    fn texture_handle(&self, index: usize) -> Option<TextureHandle>;

    fn font_arrangement(&self, index: usize) -> Option<&FontArrangement>;
    fn font_texture_handle(&self, index: usize) -> Option<TextureHandle>;
    fn font_texture_size(&self, index: usize) -> Option<Vec2I>;

    fn shader_program(&self, index: usize) -> Option<ShaderProgramHandle>;
}

#[derive(Debug, Clone)]
struct TextureEntry {
    handle: TextureHandle,
    size: Vec2I,
}

#[derive(Debug, Clone)]
struct FontEntry {
    arrangement: FontArrangement,
    texture: TextureEntry,
}

/// Simple in-memory [`Assets`] implementation.
///
/// Indices are assigned in insertion order per asset kind.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    textures: Vec<TextureEntry>,
    fonts: Vec<FontEntry>,
    programs: Vec<ShaderProgramHandle>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a texture and returns its index.
    pub fn add_texture(&mut self, handle: TextureHandle, size: Vec2I) -> usize {
        self.textures.push(TextureEntry { handle, size });
        self.textures.len() - 1
    }

    /// Registers a font (metrics + atlas texture) and returns its index.
    pub fn add_font(
        &mut self,
        arrangement: FontArrangement,
        texture: TextureHandle,
        texture_size: Vec2I,
    ) -> usize {
        self.fonts.push(FontEntry {
            arrangement,
            texture: TextureEntry { handle: texture, size: texture_size },
        });
        self.fonts.len() - 1
    }

    /// Registers a surface shader program and returns its index.
    pub fn add_shader_program(&mut self, program: ShaderProgramHandle) -> usize {
        self.programs.push(program);
        self.programs.len() - 1
    }
}

impl Assets for AssetRegistry {
    fn texture_size(&self, index: usize) -> Option<Vec2I> {
        self.textures.get(index).map(|t| t.size)
    }

    fn texture_handle(&self, index: usize) -> Option<TextureHandle> {
        self.textures.get(index).map(|t| t.handle)
    }

    fn font_arrangement(&self, index: usize) -> Option<&FontArrangement> {
        self.fonts.get(index).map(|f| &f.arrangement)
    }

    fn font_texture_handle(&self, index: usize) -> Option<TextureHandle> {
        self.fonts.get(index).map(|f| f.texture.handle)
    }

    fn font_texture_size(&self, index: usize) -> Option<Vec2I> {
        self.fonts.get(index).map(|f| f.texture.size)
    }

    fn shader_program(&self, index: usize) -> Option<ShaderProgramHandle> {
        self.programs.get(index).copied()
    }
}
