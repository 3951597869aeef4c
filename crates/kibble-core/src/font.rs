//! Bitmap fonts for the LED matrix.

mod data;

/// First character code covered by both fonts (space).
pub const FONT_START: u8 = 32;
/// Number of glyphs in each font (space through tilde).
pub const FONT_CHAR_COUNT: usize = 95;

const BLANK: [u8; 8] = [0u8; 8];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FontSize {
    Large,
    Small,
}

impl FontSize {
    pub const ALL: [FontSize; 2] = [FontSize::Large, FontSize::Small];

    pub const fn font(self) -> &'static Font {
        match self {
            FontSize::Large => &LARGE,
            FontSize::Small => &SMALL,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            FontSize::Large => "Large",
            FontSize::Small => "Small",
        }
    }
}

/// Column-encoded font covering a contiguous range of character codes.
#[derive(Debug)]
pub struct Font {
    pub width: usize,
    pub start: u8,
    pub char_count: usize,
    data: &'static [u8],
}

pub static LARGE: Font = Font {
    width: 5,
    start: FONT_START,
    char_count: FONT_CHAR_COUNT,
    data: &data::LARGE,
};

pub static SMALL: Font = Font {
    width: 3,
    start: FONT_START,
    char_count: FONT_CHAR_COUNT,
    data: &data::SMALL,
};

impl Font {
    /// Returns the `width` column bytes for `code`.
    ///
    /// Codes outside the font's range map to blank columns.
    pub fn glyph_columns(&self, code: u32) -> &'static [u8] {
        let start = self.start as u32;
        let end = start + self.char_count as u32;
        if !(start..end).contains(&code) {
            return &BLANK[..self.width];
        }

        let offset = (code - start) as usize * self.width;
        self.data
            .get(offset..offset + self.width)
            .unwrap_or(&BLANK[..self.width])
    }
}
