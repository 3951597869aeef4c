use core::fmt::Debug;

use log::info;
use smart_leds::{RGB8, SmartLedsWrite};

use super::{MATRIX_HEIGHT, MATRIX_WIDTH, MatrixMap, NUM_LEDS, RenderSettings, text_to_columns};
use crate::settings::Settings;

pub const OFF: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

/// Owns the LED sink, the pixel map and the frame being composed.
///
/// Every draw call composes a complete frame and pushes it to the sink in a
/// single write.
pub struct DisplayContext<S> {
    sink: S,
    map: MatrixMap,
    frame: [RGB8; NUM_LEDS],
    render: RenderSettings,
    sink_fault_logged: bool,
}

impl<S> DisplayContext<S>
where
    S: SmartLedsWrite<Color = RGB8>,
    S::Error: Debug,
{
    pub fn new(sink: S, render: RenderSettings) -> Self {
        Self {
            sink,
            map: MatrixMap::new(),
            frame: [OFF; NUM_LEDS],
            render,
            sink_fault_logged: false,
        }
    }

    pub fn render_settings(&self) -> &RenderSettings {
        &self.render
    }

    /// Re-derives color, font and delay after a settings change.
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.render = RenderSettings::from_settings(settings);
    }

    /// Last composed frame, indexed by strip position.
    pub fn frame(&self) -> &[RGB8; NUM_LEDS] {
        &self.frame
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn release(self) -> S {
        self.sink
    }

    pub fn clear(&mut self) {
        self.frame.fill(OFF);
        self.flush();
    }

    /// Draws the `MATRIX_WIDTH` columns starting at `scroll_offset`.
    ///
    /// Columns outside `columns` are drawn dark, so any offset is valid.
    pub fn render_frame(&mut self, columns: &[u8], scroll_offset: i32, color: RGB8) {
        for display_col in 0..MATRIX_WIDTH {
            let data_col = scroll_offset as i64 + display_col as i64;
            let bits = if data_col >= 0 && (data_col as usize) < columns.len() {
                columns[data_col as usize]
            } else {
                0
            };
            self.draw_column(display_col, bits, color);
        }
        self.flush();
    }

    /// Shows `message` centered and static; overflow is clipped on the right.
    pub fn show_status(&mut self, message: &str, color: RGB8) {
        let columns = text_to_columns(message, self.render.font(), self.render.char_spacing);
        let start_col = MATRIX_WIDTH.saturating_sub(columns.len()) / 2;

        self.frame.fill(OFF);
        for (i, bits) in columns.iter().enumerate() {
            let display_col = start_col + i;
            if display_col >= MATRIX_WIDTH {
                break;
            }
            self.draw_column(display_col, *bits, color);
        }
        self.flush();
    }

    fn draw_column(&mut self, display_col: usize, bits: u8, color: RGB8) {
        for row in 0..MATRIX_HEIGHT {
            let lit = bits & (1 << row) != 0;
            self.frame[self.map.map(display_col, row)] = if lit { color } else { OFF };
        }
    }

    fn flush(&mut self) {
        if let Err(err) = self.sink.write(self.frame.iter().copied()) {
            if !self.sink_fault_logged {
                info!("matrix: frame write failed: {:?}", err);
                self.sink_fault_logged = true;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        font::LARGE,
        render::{PixelMap, text_to_columns},
    };

    /// Records every frame written to it.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) frames: std::vec::Vec<std::vec::Vec<RGB8>>,
    }

    impl SmartLedsWrite for RecordingSink {
        type Error = ();
        type Color = RGB8;

        fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
        where
            T: IntoIterator<Item = I>,
            I: Into<Self::Color>,
        {
            self.frames
                .push(iterator.into_iter().map(Into::into).collect());
            Ok(())
        }
    }

    struct FailingSink;

    impl SmartLedsWrite for FailingSink {
        type Error = &'static str;
        type Color = RGB8;

        fn write<T, I>(&mut self, _iterator: T) -> Result<(), Self::Error>
        where
            T: IntoIterator<Item = I>,
            I: Into<Self::Color>,
        {
            Err("bus fault")
        }
    }

    const RED: RGB8 = RGB8 { r: 9, g: 0, b: 0 };

    fn lit_count(frame: &[RGB8]) -> usize {
        frame.iter().filter(|px| **px != OFF).count()
    }

    #[test]
    fn out_of_range_offsets_draw_dark_frames() {
        let mut ctx = DisplayContext::new(RecordingSink::default(), RenderSettings::default());
        let columns = text_to_columns("HI", &LARGE, 1);

        ctx.render_frame(&columns, -(MATRIX_WIDTH as i32), RED);
        ctx.render_frame(&columns, columns.len() as i32, RED);
        ctx.render_frame(&columns, i32::MIN, RED);
        ctx.render_frame(&columns, i32::MAX, RED);

        let frames = &ctx.sink().frames;
        assert_eq!(frames.len(), 4);
        for frame in frames {
            assert_eq!(frame.len(), NUM_LEDS);
            assert_eq!(lit_count(frame), 0);
        }
    }

    #[test]
    fn column_bits_light_rows_through_serpentine_map() {
        let mut ctx = DisplayContext::new(RecordingSink::default(), RenderSettings::default());
        // Column 0 lights row 0, column 1 lights row 0 and row 7.
        ctx.render_frame(&[0b0000_0001, 0b1000_0001], 0, RED);

        let map = PixelMap::<MATRIX_WIDTH, MATRIX_HEIGHT>::new();
        let frame = ctx.frame();
        assert_eq!(frame[map.map(0, 0)], RED);
        assert_eq!(frame[map.map(1, 0)], RED);
        assert_eq!(frame[map.map(1, 7)], RED);
        assert_eq!(frame[15], RED);
        assert_eq!(frame[8], RED);
        assert_eq!(lit_count(frame), 3);
    }

    #[test]
    fn negative_offset_shifts_text_right() {
        let mut ctx = DisplayContext::new(RecordingSink::default(), RenderSettings::default());
        ctx.render_frame(&[0xFF], -31, RED);

        let map = PixelMap::<MATRIX_WIDTH, MATRIX_HEIGHT>::new();
        for row in 0..MATRIX_HEIGHT {
            assert_eq!(ctx.frame()[map.map(31, row)], RED);
        }
        assert_eq!(lit_count(ctx.frame()), MATRIX_HEIGHT);
    }

    #[test]
    fn redundant_renders_are_identical() {
        let mut ctx = DisplayContext::new(RecordingSink::default(), RenderSettings::default());
        let columns = text_to_columns("Hey", &LARGE, 1);
        ctx.render_frame(&columns, -4, RED);
        ctx.render_frame(&columns, -4, RED);

        let frames = &ctx.sink().frames;
        assert_eq!(frames[0], frames[1]);
    }

    #[test]
    fn status_is_centered() {
        let mut ctx = DisplayContext::new(RecordingSink::default(), RenderSettings::default());
        // "I" is 5 columns wide: centered start is (32 - 5) / 2 = 13.
        ctx.show_status("I", RED);

        let map = PixelMap::<MATRIX_WIDTH, MATRIX_HEIGHT>::new();
        let lit_columns: std::vec::Vec<usize> = (0..MATRIX_WIDTH)
            .filter(|col| (0..MATRIX_HEIGHT).any(|row| ctx.frame()[map.map(*col, row)] != OFF))
            .collect();
        // Glyph 'I' is 0x00, 0x41, 0x7F, 0x41, 0x00.
        assert_eq!(lit_columns, [14, 15, 16]);
        assert_eq!(ctx.sink().frames.len(), 1);
    }

    #[test]
    fn wide_status_starts_at_left_edge_and_is_clipped() {
        let mut ctx = DisplayContext::new(RecordingSink::default(), RenderSettings::default());
        ctx.show_status("NoWiFi!!", RED);

        let map = PixelMap::<MATRIX_WIDTH, MATRIX_HEIGHT>::new();
        let expected = text_to_columns("NoWiFi!!", &LARGE, 1);
        for col in 0..MATRIX_WIDTH {
            for row in 0..MATRIX_HEIGHT {
                let lit = expected[col] & (1 << row) != 0;
                assert_eq!(ctx.frame()[map.map(col, row)] != OFF, lit);
            }
        }
    }

    #[test]
    fn clear_pushes_dark_frame() {
        let mut ctx = DisplayContext::new(RecordingSink::default(), RenderSettings::default());
        ctx.show_status("Load", RED);
        ctx.clear();
        assert_eq!(lit_count(ctx.sink().frames.last().unwrap()), 0);
    }

    #[test]
    fn sink_errors_do_not_stop_rendering() {
        let mut ctx = DisplayContext::new(FailingSink, RenderSettings::default());
        ctx.render_frame(&[0x01], 0, RED);
        ctx.render_frame(&[0x01], 0, RED);
        assert_eq!(lit_count(ctx.frame()), 1);
    }
}
