use heapless::Vec;
use log::debug;

use crate::font::Font;

/// Upper bound on rendered columns for one string.
pub const MAX_COLUMNS: usize = 3072;

pub type ColumnBuffer = Vec<u8, MAX_COLUMNS>;

/// Renders `text` into column bytes, one per pixel column.
///
/// Every character contributes `font.width` columns (blank when the font has
/// no glyph for it) followed by `spacing` zero columns, except the last one.
/// Text that does not fit in [`MAX_COLUMNS`] is cut after the last whole
/// glyph, without its trailing gap.
pub fn text_to_columns(text: &str, font: &Font, spacing: u8) -> ColumnBuffer {
    let mut columns = ColumnBuffer::new();
    let mut chars = text.chars().peekable();
    let mut glyph_end = 0;
    let mut truncated = false;

    while let Some(ch) = chars.next() {
        let glyph = font.glyph_columns(ch as u32);
        if columns.extend_from_slice(glyph).is_err() {
            truncated = true;
            break;
        }
        glyph_end = columns.len();

        if chars.peek().is_none() {
            break;
        }

        if (0..spacing).any(|_| columns.push(0).is_err()) {
            truncated = true;
            break;
        }
    }

    if truncated {
        columns.truncate(glyph_end);
        debug!(
            "columns: text truncated at {} columns (capacity {})",
            columns.len(),
            MAX_COLUMNS
        );
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{LARGE, SMALL};

    /// Column count for text that fits: glyphs plus the gaps between them.
    fn columns_width(text: &str, font: &Font, spacing: u8) -> usize {
        let chars = text.chars().count();
        if chars == 0 {
            return 0;
        }
        chars * font.width + (chars - 1) * spacing as usize
    }

    #[test]
    fn empty_text_renders_nothing() {
        assert!(text_to_columns("", &LARGE, 1).is_empty());
    }

    #[test]
    fn hi_in_large_font_is_eleven_columns() {
        let columns = text_to_columns("HI", &LARGE, 1);
        assert_eq!(
            columns.as_slice(),
            &[0x7F, 0x08, 0x08, 0x08, 0x7F, 0x00, 0x00, 0x41, 0x7F, 0x41, 0x00]
        );
    }

    #[test]
    fn length_matches_width_formula() {
        for text in ["a", "Cats sleep 16 hours a day.", "~~", "  "] {
            for (font, spacing) in [(&LARGE, 1u8), (&SMALL, 1), (&LARGE, 3), (&SMALL, 0)] {
                let columns = text_to_columns(text, font, spacing);
                assert_eq!(columns.len(), columns_width(text, font, spacing));
            }
        }
    }

    #[test]
    fn unmapped_characters_render_blank_columns() {
        let columns = text_to_columns("a\u{e9}b", &SMALL, 1);
        assert_eq!(columns.len(), 3 * 3 + 2);
        assert_eq!(&columns[4..7], &[0, 0, 0]);
        assert_eq!(&columns[0..3], SMALL.glyph_columns('a' as u32));
    }

    #[test]
    fn overlong_text_ends_on_glyph_data() {
        let text: std::string::String = std::iter::repeat_n('W', 1000).collect();
        let w = LARGE.glyph_columns('W' as u32);

        // The cap lands at the end of a gap, inside a gap, and inside a glyph.
        for (spacing, expected) in [(1u8, 3071usize), (3, 3069), (2, 3071), (4, 3065)] {
            let columns = text_to_columns(&text, &LARGE, spacing);
            assert_eq!(columns.len(), expected, "spacing {spacing}");
            assert_eq!(&columns[expected - 5..], w, "spacing {spacing}");
        }
    }
}
