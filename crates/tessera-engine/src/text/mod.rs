//! Text: font metrics, layout, and font baking.
//!
//! Layout is a pure function of a string and a [`FontArrangement`]; the
//! renderer turns a [`TextLayout`] into one quad per visible glyph.

mod arrangement;
mod font_system;
mod layout;

pub use arrangement::{CHAR_RANGE_BEGIN, CHAR_RANGE_LEN, FontArrangement, GlyphMetrics};
pub use font_system::{BakedFont, FontLoadError, bake_font};
pub use layout::{HorAlign, LayoutError, TextLayout, VerAlign};
