use crate::coords::RectI;

use super::LayoutError;

/// First character covered by a [`FontArrangement`] (space).
pub const CHAR_RANGE_BEGIN: u32 = 32;

/// Number of characters covered: printable ASCII, `' '..='~'`.
pub const CHAR_RANGE_LEN: usize = 95;

/// Placement metrics for one glyph, in the font's pixel space.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct GlyphMetrics {
    /// Pen-relative x of the glyph's left edge.
    pub hor_offset: i32,
    /// Line-top-relative y of the glyph's top edge (+Y down).
    pub ver_offset: i32,
    /// Pen advance after drawing the glyph.
    pub hor_advance: i32,
    /// Glyph rectangle inside the font atlas texture.
    pub src_rect: RectI,
}

/// Per-glyph metrics plus the full kerning-pair table for one font.
///
/// Read-only to the renderer; produced by an asset pipeline (see
/// [`super::bake_font`]).
#[derive(Debug, Clone, PartialEq)]
pub struct FontArrangement {
    line_height: i32,
    glyphs: Vec<GlyphMetrics>,
    /// Indexed `current * CHAR_RANGE_LEN + previous`.
    kernings: Vec<i32>,
}

impl FontArrangement {
    /// An arrangement with zeroed glyph metrics and no kerning.
    pub fn new(line_height: i32) -> Self {
        Self {
            line_height,
            glyphs: vec![GlyphMetrics::default(); CHAR_RANGE_LEN],
            kernings: vec![0; CHAR_RANGE_LEN * CHAR_RANGE_LEN],
        }
    }

    /// Index of `c` in the glyph tables, if the font covers it.
    #[inline]
    pub fn glyph_index(c: char) -> Option<usize> {
        let code = u32::from(c).checked_sub(CHAR_RANGE_BEGIN)? as usize;
        (code < CHAR_RANGE_LEN).then_some(code)
    }

    /// Index of the space glyph, used as the fallback for empty lines.
    #[inline]
    pub const fn space_index() -> usize {
        0
    }

    #[inline]
    pub fn line_height(&self) -> i32 {
        self.line_height
    }

    #[inline]
    pub fn glyph(&self, index: usize) -> &GlyphMetrics {
        &self.glyphs[index]
    }

    /// Kerning applied before placing `current` when it follows `previous`.
    #[inline]
    pub fn kerning(&self, current: usize, previous: usize) -> i32 {
        self.kernings[current * CHAR_RANGE_LEN + previous]
    }

    pub fn set_glyph(&mut self, c: char, metrics: GlyphMetrics) -> Result<(), LayoutError> {
        let index = Self::glyph_index(c).ok_or(LayoutError::UnsupportedChar(c))?;
        self.glyphs[index] = metrics;
        Ok(())
    }

    pub fn set_kerning(&mut self, current: char, previous: char, value: i32) -> Result<(), LayoutError> {
        let cur = Self::glyph_index(current).ok_or(LayoutError::UnsupportedChar(current))?;
        let prev = Self::glyph_index(previous).ok_or(LayoutError::UnsupportedChar(previous))?;
        self.kernings[cur * CHAR_RANGE_LEN + prev] = value;
        Ok(())
    }
}
