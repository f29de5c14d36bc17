use crate::coords::{RectI, Vec2I};

use super::{CHAR_RANGE_BEGIN, CHAR_RANGE_LEN, FontArrangement, GlyphMetrics};

const GLYPH_PADDING: u32 = 1; // pixels between glyphs in the atlas
const ATLAS_MIN_SIZE: u32 = 128;
const ATLAS_MAX_SIZE: u32 = 2048;

/// Error returned by [`bake_font`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("font load error: {0}")]
pub struct FontLoadError(pub String);

/// A font rasterized at one pixel size: metrics plus an RGBA atlas.
///
/// Atlas pixels are white with coverage in alpha, so the quad shader's
/// texture-times-alpha output draws the glyphs directly.
pub struct BakedFont {
    pub arrangement: FontArrangement,
    pub atlas_size: Vec2I,
    pub atlas_rgba: Vec<u8>,
}

/// Rasterizes the printable ASCII range of a TrueType/OpenType font.
pub fn bake_font(bytes: &[u8], px_size: f32) -> Result<BakedFont, FontLoadError> {
    let settings = fontdue::FontSettings { scale: px_size, ..fontdue::FontSettings::default() };
    let font = fontdue::Font::from_bytes(bytes, settings).map_err(|e| FontLoadError(e.to_string()))?;

    let line_metrics = font
        .horizontal_line_metrics(px_size)
        .ok_or_else(|| FontLoadError("font has no horizontal line metrics".into()))?;

    let chars: Vec<char> = (0..CHAR_RANGE_LEN as u32)
        .filter_map(|i| char::from_u32(CHAR_RANGE_BEGIN + i))
        .collect();

    let rasterized: Vec<(fontdue::Metrics, Vec<u8>)> =
        chars.iter().map(|&c| font.rasterize(c, px_size)).collect();

    let sizes: Vec<(u32, u32)> = rasterized
        .iter()
        .map(|(m, _)| (m.width as u32, m.height as u32))
        .collect();

    let (atlas_side, placements) = pack_glyphs(&sizes)
        .ok_or_else(|| FontLoadError(format!("glyphs do not fit a {ATLAS_MAX_SIZE}px atlas")))?;

    let mut atlas_rgba = vec![0u8; (atlas_side * atlas_side * 4) as usize];
    let mut arrangement = FontArrangement::new(line_metrics.new_line_size.round() as i32);

    for (i, (&c, (metrics, bitmap))) in chars.iter().zip(&rasterized).enumerate() {
        let (gx, gy) = placements[i];
        let (w, h) = sizes[i];
        blit_coverage(&mut atlas_rgba, atlas_side, gx, gy, w, h, bitmap);

        // fontdue reports the bitmap's bottom edge relative to the baseline (+Y up).
        let top = line_metrics.ascent - (metrics.ymin as f32 + metrics.height as f32);

        let glyph = GlyphMetrics {
            hor_offset: metrics.xmin,
            ver_offset: top.round() as i32,
            hor_advance: metrics.advance_width.round() as i32,
            src_rect: RectI::new(gx as i32, gy as i32, w as i32, h as i32),
        };
        arrangement
            .set_glyph(c, glyph)
            .map_err(|e| FontLoadError(e.to_string()))?;
    }

    for &current in &chars {
        for &previous in &chars {
            let Some(kern) = font.horizontal_kern(previous, current, px_size) else { continue };
            let kern = kern.round() as i32;
            if kern != 0 {
                arrangement
                    .set_kerning(current, previous, kern)
                    .map_err(|e| FontLoadError(e.to_string()))?;
            }
        }
    }

    log::debug!(
        "baked font at {px_size}px into a {atlas_side}x{atlas_side} atlas (line height {})",
        arrangement.line_height()
    );

    Ok(BakedFont {
        arrangement,
        atlas_size: Vec2I::new(atlas_side as i32, atlas_side as i32),
        atlas_rgba,
    })
}

/// Finds the smallest power-of-two square atlas the glyphs fit in.
fn pack_glyphs(sizes: &[(u32, u32)]) -> Option<(u32, Vec<(u32, u32)>)> {
    let mut side = ATLAS_MIN_SIZE;
    while side <= ATLAS_MAX_SIZE {
        let mut packer = ShelfPacker::new(side);
        let placed: Option<Vec<_>> = sizes.iter().map(|&(w, h)| packer.place(w, h)).collect();
        if let Some(placed) = placed {
            return Some((side, placed));
        }
        side *= 2;
    }
    None
}

fn blit_coverage(atlas: &mut [u8], side: u32, gx: u32, gy: u32, w: u32, h: u32, coverage: &[u8]) {
    for row in 0..h {
        for col in 0..w {
            let a = coverage[(row * w + col) as usize];
            let dst = (((gy + row) * side + gx + col) * 4) as usize;
            atlas[dst..dst + 4].copy_from_slice(&[255, 255, 255, a]);
        }
    }
}

/// Row-based ("shelf") rectangle packer.
///
/// Rectangles are placed left to right; when one does not fit horizontally a
/// new shelf starts below the tallest rectangle of the current one.
#[derive(Debug)]
struct ShelfPacker {
    side: u32,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
}

impl ShelfPacker {
    fn new(side: u32) -> Self {
        Self {
            side,
            cursor_x: GLYPH_PADDING,
            cursor_y: GLYPH_PADDING,
            row_height: 0,
        }
    }

    fn place(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if self.cursor_x + w + GLYPH_PADDING > self.side {
            self.cursor_y += self.row_height + GLYPH_PADDING;
            self.cursor_x = GLYPH_PADDING;
            self.row_height = 0;
        }

        if self.cursor_x + w + GLYPH_PADDING > self.side
            || self.cursor_y + h + GLYPH_PADDING > self.side
        {
            return None;
        }

        let pos = (self.cursor_x, self.cursor_y);
        self.cursor_x += w + GLYPH_PADDING;
        self.row_height = self.row_height.max(h);
        Some(pos)
    }
}
