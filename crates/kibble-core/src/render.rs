//! Matrix geometry, derived render parameters and the frame pipeline.

mod columns;
mod frame;
mod pixel_map;

pub use columns::{ColumnBuffer, MAX_COLUMNS, text_to_columns};
pub use frame::{DisplayContext, OFF};
pub use pixel_map::{MatrixMap, PixelMap};

#[cfg(test)]
pub(crate) use frame::tests::RecordingSink;

use smart_leds::RGB8;

use crate::{
    font::{Font, FontSize},
    settings::{BRIGHTNESS_LEVELS, Settings},
};

pub const MATRIX_WIDTH: usize = 32;
pub const MATRIX_HEIGHT: usize = 8;
pub const NUM_LEDS: usize = MATRIX_WIDTH * MATRIX_HEIGHT;
pub const CHAR_SPACING: u8 = 1;

/// Parameters the frame writer and scroll engine read on every frame.
///
/// Recomputed from [`Settings`] whenever they change, never per frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RenderSettings {
    pub color: RGB8,
    pub font_size: FontSize,
    pub scroll_delay_ms: u16,
    pub char_spacing: u8,
}

impl RenderSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            color: scale_color(settings.text_color.rgb(), settings.brightness),
            font_size: settings.font_size,
            scroll_delay_ms: settings.scroll_delay_ms,
            char_spacing: CHAR_SPACING,
        }
    }

    pub fn font(&self) -> &'static Font {
        self.font_size.font()
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Scales `base` by the LED value of brightness `level` (0..=10, clamped).
pub fn scale_color(base: RGB8, level: u8) -> RGB8 {
    let index = (level as usize).min(BRIGHTNESS_LEVELS.len() - 1);
    let value = BRIGHTNESS_LEVELS[index] as u16;
    let scale = |channel: u8| ((channel as u16 * value) / 255) as u8;

    RGB8 {
        r: scale(base.r),
        g: scale(base.g),
        b: scale(base.b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::TextColor;

    #[test]
    fn brightness_scales_every_channel() {
        let white = RGB8 {
            r: 255,
            g: 255,
            b: 255,
        };
        assert_eq!(scale_color(white, 10), white);
        assert_eq!(scale_color(white, 0), RGB8 { r: 5, g: 5, b: 5 });
        assert_eq!(
            scale_color(TextColor::Orange.rgb(), 3),
            RGB8 { r: 35, g: 17, b: 0 }
        );
    }

    #[test]
    fn out_of_range_level_uses_full_brightness() {
        let red = TextColor::Red.rgb();
        assert_eq!(scale_color(red, 42), scale_color(red, 10));
    }

    #[test]
    fn render_settings_follow_settings_record() {
        let mut settings = Settings::default();
        settings.text_color = TextColor::Blue;
        settings.brightness = 10;
        settings.font_size = FontSize::Small;
        settings.scroll_delay_ms = 120;

        let render = RenderSettings::from_settings(&settings);
        assert_eq!(render.color, RGB8 { r: 0, g: 0, b: 255 });
        assert_eq!(render.font().width, 3);
        assert_eq!(render.scroll_delay_ms, 120);
        assert_eq!(render.char_spacing, 1);
    }
}
