use crate::coords::{Vec2, Vec2I};

use super::FontArrangement;

/// Errors produced while laying out a string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("character {0:?} is not covered by the font")]
    UnsupportedChar(char),
}

/// Horizontal alignment of each line relative to the submit position.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum HorAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl HorAlign {
    #[inline]
    pub fn factor(self) -> f32 {
        match self {
            Self::Left => 0.0,
            Self::Center => 0.5,
            Self::Right => 1.0,
        }
    }
}

/// Vertical alignment of the whole block relative to the submit position.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum VerAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

impl VerAlign {
    #[inline]
    pub fn factor(self) -> f32 {
        match self {
            Self::Top => 0.0,
            Self::Center => 0.5,
            Self::Bottom => 1.0,
        }
    }
}

/// Result of laying out one string against one font.
///
/// Pure CPU data, independent of render state. Buffers are kept between
/// calls to [`TextLayout::layout`], so one instance can serve as per-frame
/// scratch space for every string submitted.
///
/// Height is the tight visual extent of the block: the first line's minimum
/// glyph top, plus the pen's vertical travel, plus the last line's maximum
/// glyph bottom. It is not `line_count * line_height`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLayout {
    /// One entry per `char`; newline entries hold the pen position at the break.
    char_offsets: Vec<Vec2I>,
    line_widths: Vec<i32>,
    height: i32,
}

impl TextLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lays out `text` into a fresh value.
    pub fn compute(text: &str, font: &FontArrangement) -> Result<Self, LayoutError> {
        let mut layout = Self::new();
        layout.layout(text, font)?;
        Ok(layout)
    }

    /// Lays out `text`, replacing the previous contents.
    ///
    /// On error the layout is left empty.
    pub fn layout(&mut self, text: &str, font: &FontArrangement) -> Result<(), LayoutError> {
        self.char_offsets.clear();
        self.line_widths.clear();
        self.height = 0;

        if let Some(bad) = text
            .chars()
            .find(|&c| c != '\n' && FontArrangement::glyph_index(c).is_none())
        {
            return Err(LayoutError::UnsupportedChar(bad));
        }

        let space = font.glyph(FontArrangement::space_index());
        let last_line_default = space.ver_offset + space.src_rect.height;

        let mut pen = Vec2I::default();
        let mut line_index = 0usize;
        let mut prev: Option<usize> = None;

        let mut first_line_min_ver: Option<i32> = None;
        let mut last_line_max: Option<i32> = None;

        for c in text.chars() {
            if c == '\n' {
                self.char_offsets.push(pen);
                self.line_widths.push(pen.x);

                pen.x = 0;
                pen.y += font.line_height();
                line_index += 1;
                prev = None;

                // Not the last line after all.
                last_line_max = None;
                continue;
            }

            // Validated above.
            let Some(index) = FontArrangement::glyph_index(c) else { continue };
            let glyph = font.glyph(index);

            if let Some(prev) = prev {
                pen.x += font.kerning(index, prev);
            }

            self.char_offsets
                .push(Vec2I::new(pen.x + glyph.hor_offset, pen.y + glyph.ver_offset));

            pen.x += glyph.hor_advance;
            prev = Some(index);

            if line_index == 0 {
                first_line_min_ver = Some(
                    first_line_min_ver.map_or(glyph.ver_offset, |m| m.min(glyph.ver_offset)),
                );
            }

            let bottom = glyph.ver_offset + glyph.src_rect.height;
            last_line_max = Some(last_line_max.map_or(bottom, |m| m.max(bottom)));
        }

        self.line_widths.push(pen.x);

        let first_line_min_ver = first_line_min_ver.unwrap_or(space.ver_offset);
        self.height = first_line_min_ver + pen.y + last_line_max.unwrap_or(last_line_default);

        Ok(())
    }

    #[inline]
    pub fn char_offsets(&self) -> &[Vec2I] {
        &self.char_offsets
    }

    #[inline]
    pub fn line_widths(&self) -> &[i32] {
        &self.line_widths
    }

    #[inline]
    pub fn char_count(&self) -> usize {
        self.char_offsets.len()
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_widths.len()
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Widest line.
    pub fn width(&self) -> i32 {
        self.line_widths.iter().copied().max().unwrap_or(0)
    }

    /// Top-left draw position of character `char_index` on line `line_index`
    /// for a block anchored at `pos` with the given alignment.
    pub fn aligned_position(
        &self,
        pos: Vec2,
        char_index: usize,
        line_index: usize,
        hor: HorAlign,
        ver: VerAlign,
    ) -> Vec2 {
        let offset = self.char_offsets[char_index].to_vec2();
        let line_width = self.line_widths[line_index] as f32;
        Vec2::new(
            pos.x + offset.x - line_width * hor.factor(),
            pos.y + offset.y - self.height as f32 * ver.factor(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::RectI;
    use crate::text::GlyphMetrics;

    const LINE_HEIGHT: i32 = 20;

    fn glyph(hor_offset: i32, ver_offset: i32, advance: i32, height: i32) -> GlyphMetrics {
        GlyphMetrics {
            hor_offset,
            ver_offset,
            hor_advance: advance,
            src_rect: RectI::new(0, 0, advance, height),
        }
    }

    /// Small synthetic font: capitals sit at y=4 and are 12 tall, `g` hangs
    /// lower, the space glyph sits at y=14 and is 2 tall.
    fn font() -> FontArrangement {
        let mut f = FontArrangement::new(LINE_HEIGHT);
        f.set_glyph(' ', glyph(0, 14, 5, 2)).unwrap();
        f.set_glyph('A', glyph(1, 4, 10, 12)).unwrap();
        f.set_glyph('B', glyph(0, 4, 9, 12)).unwrap();
        f.set_glyph('C', glyph(1, 3, 11, 13)).unwrap();
        f.set_glyph('D', glyph(0, 4, 12, 12)).unwrap();
        f.set_glyph('g', glyph(0, 7, 8, 13)).unwrap();
        f.set_kerning('B', 'A', -1).unwrap();
        f.set_kerning('D', 'C', -2).unwrap();
        f
    }

    #[test]
    fn two_lines_widths_and_height() {
        let layout = TextLayout::compute("AB\nCD", &font()).unwrap();

        assert_eq!(layout.char_count(), 5);
        assert_eq!(layout.line_count(), 2);
        // A(10) + kern(B,A)(-1) + B(9)
        assert_eq!(layout.line_widths()[0], 18);
        // C(11) + kern(D,C)(-2) + D(12)
        assert_eq!(layout.line_widths()[1], 21);
        // first line min ver offset 4, one line break, last line max bottom
        // max(3 + 13, 4 + 12) = 16
        assert_eq!(layout.height(), 4 + LINE_HEIGHT + 16);
    }

    #[test]
    fn offsets_include_kerning_and_glyph_offsets() {
        let layout = TextLayout::compute("AB\nCD", &font()).unwrap();
        let o = layout.char_offsets();

        assert_eq!(o[0], Vec2I::new(1, 4));
        // pen 10, kern -1, B hor offset 0
        assert_eq!(o[1], Vec2I::new(9, 4));
        // second line starts at pen x = 0, y = line height
        assert_eq!(o[3], Vec2I::new(1, LINE_HEIGHT + 3));
        // pen 11, kern -2
        assert_eq!(o[4], Vec2I::new(9, LINE_HEIGHT + 4));
    }

    #[test]
    fn no_kerning_across_line_break() {
        let mut f = font();
        // Would apply if the pair (C, B) were looked up across the newline.
        f.set_kerning('C', 'B', -50).unwrap();
        let layout = TextLayout::compute("B\nC", &f).unwrap();
        assert_eq!(layout.char_offsets()[2].x, 1);
    }

    #[test]
    fn single_line_height_is_tight() {
        let layout = TextLayout::compute("Ag", &font()).unwrap();
        // min top 4 (A), max bottom 7 + 13 = 20 (g)
        assert_eq!(layout.height(), 4 + 20);
        assert_eq!(layout.line_count(), 1);
    }

    #[test]
    fn empty_first_line_falls_back_to_space_offset() {
        let layout = TextLayout::compute("\nA", &font()).unwrap();
        // space ver offset 14, one break, last line bottom 16
        assert_eq!(layout.height(), 14 + LINE_HEIGHT + 16);
        assert_eq!(layout.line_widths(), &[0, 10]);
    }

    #[test]
    fn empty_last_line_falls_back_to_space_bottom() {
        let layout = TextLayout::compute("A\n", &font()).unwrap();
        // first line top 4, one break, space bottom 14 + 2
        assert_eq!(layout.height(), 4 + LINE_HEIGHT + 16);
    }

    #[test]
    fn earlier_line_heights_do_not_leak_into_last_line() {
        let layout = TextLayout::compute("g\nA", &font()).unwrap();
        // last line is "A": bottom 16, not g's 20
        assert_eq!(layout.height(), 7 + LINE_HEIGHT + 16);
    }

    #[test]
    fn spaces_take_part_in_first_line_extent() {
        let layout = TextLayout::compute(" ", &font()).unwrap();
        assert_eq!(layout.height(), 14 + 16);
        assert_eq!(layout.line_widths(), &[5]);
    }

    #[test]
    fn unsupported_char_clears_previous_layout() {
        let f = font();
        let mut layout = TextLayout::compute("AB", &f).unwrap();
        assert_eq!(layout.layout("A\tB", &f), Err(LayoutError::UnsupportedChar('\t')));
        assert_eq!(layout.char_count(), 0);
        assert_eq!(layout.line_count(), 0);
    }

    #[test]
    fn scratch_is_reused_between_layouts() {
        let f = font();
        let mut layout = TextLayout::new();
        layout.layout("AB\nCD\nA", &f).unwrap();
        layout.layout("A", &f).unwrap();
        assert_eq!(layout.char_count(), 1);
        assert_eq!(layout.line_widths(), &[10]);
    }

    #[test]
    fn centre_alignment_offsets_by_half_line_width() {
        let layout = TextLayout::compute("AB", &font()).unwrap();
        let pos = Vec2::new(100.0, 50.0);
        let p = layout.aligned_position(pos, 0, 0, HorAlign::Center, VerAlign::Top);
        let w = layout.line_widths()[0] as f32;
        assert_eq!(p.x, pos.x - w / 2.0 + 1.0);
        assert_eq!(p.y, pos.y + 4.0);
    }

    #[test]
    fn bottom_right_alignment() {
        let layout = TextLayout::compute("AB", &font()).unwrap();
        let p = layout.aligned_position(Vec2::zero(), 1, 0, HorAlign::Right, VerAlign::Bottom);
        assert_eq!(p.x, 9.0 - 18.0);
        assert_eq!(p.y, 4.0 - layout.height() as f32);
    }

    #[test]
    fn width_is_widest_line() {
        let layout = TextLayout::compute("AB\nCD", &font()).unwrap();
        assert_eq!(layout.width(), 21);
    }
}
