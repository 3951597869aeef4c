//! Horizontal scrolling of one string across the matrix.

use core::fmt::Debug;

use embedded_hal_async::delay::DelayNs;
use log::debug;
use smart_leds::{RGB8, SmartLedsWrite};

use crate::{
    input::{InputProvider, Key, poll_key_lossy},
    render::{ColumnBuffer, DisplayContext, MATRIX_WIDTH, RenderSettings, text_to_columns},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScrollStep {
    Drawn,
    Finished,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScrollOutcome {
    Completed,
    Interrupted(Key),
}

impl ScrollOutcome {
    pub const fn interrupted(self) -> bool {
        matches!(self, ScrollOutcome::Interrupted(_))
    }
}

/// Frame cursor over one string.
///
/// Offsets run from `-MATRIX_WIDTH` up to the last column, so the text
/// enters at the right edge and leaves fully at the left.
pub struct Scroll {
    columns: ColumnBuffer,
    color: RGB8,
    delay_ms: u16,
    offset: i32,
}

impl Scroll {
    pub fn new(text: &str, render: &RenderSettings) -> Self {
        Self {
            columns: text_to_columns(text, render.font(), render.char_spacing),
            color: render.color,
            delay_ms: render.scroll_delay_ms,
            offset: -(MATRIX_WIDTH as i32),
        }
    }

    pub fn frame_count(&self) -> usize {
        MATRIX_WIDTH + self.columns.len()
    }

    pub fn delay_ms(&self) -> u16 {
        self.delay_ms
    }

    pub fn is_finished(&self) -> bool {
        self.offset >= self.columns.len() as i32
    }

    pub fn draw_next<S>(&mut self, ctx: &mut DisplayContext<S>) -> ScrollStep
    where
        S: SmartLedsWrite<Color = RGB8>,
        S::Error: Debug,
    {
        if self.is_finished() {
            return ScrollStep::Finished;
        }

        ctx.render_frame(&self.columns, self.offset, self.color);
        self.offset += 1;
        ScrollStep::Drawn
    }
}

/// Scrolls `text` once, polling `input` after every frame.
///
/// Keys that `interrupts` accepts stop the scroll and are handed back to the
/// caller; any other key is dropped.
pub async fn scroll_fact<S, I, D, F>(
    ctx: &mut DisplayContext<S>,
    input: &mut I,
    delay: &mut D,
    text: &str,
    mut interrupts: F,
) -> ScrollOutcome
where
    S: SmartLedsWrite<Color = RGB8>,
    S::Error: Debug,
    I: InputProvider,
    I::Error: Debug,
    D: DelayNs,
    F: FnMut(Key) -> bool,
{
    let mut scroll = Scroll::new(text, ctx.render_settings());

    while scroll.draw_next(ctx) == ScrollStep::Drawn {
        match poll_key_lossy(input) {
            Some(key) if interrupts(key) => {
                debug!("scroll: interrupted by {:?}", key);
                return ScrollOutcome::Interrupted(key);
            }
            Some(key) => debug!("scroll: ignoring {:?}", key),
            None => {}
        }
        delay.delay_ms(scroll.delay_ms() as u32).await;
    }

    ScrollOutcome::Completed
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::*;
    use crate::{
        input::mock::{MockInput, ScriptedInput},
        render::RecordingSink,
    };

    fn any_key(_: Key) -> bool {
        true
    }

    #[derive(Default)]
    struct CountingDelay {
        calls: usize,
        total_ms: u64,
    }

    impl DelayNs for CountingDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.total_ms += (ns / 1_000_000) as u64;
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.calls += 1;
            self.total_ms += ms as u64;
        }
    }

    /// Reports no key for `quiet_polls` polls, then `key` forever.
    struct KeyAfter {
        quiet_polls: usize,
        polls: usize,
        key: Key,
    }

    impl InputProvider for KeyAfter {
        type Error = ();

        fn poll_key(&mut self) -> Result<Option<Key>, Self::Error> {
            self.polls += 1;
            if self.polls > self.quiet_polls {
                Ok(Some(self.key))
            } else {
                Ok(None)
            }
        }
    }

    fn context() -> DisplayContext<RecordingSink> {
        DisplayContext::new(RecordingSink::default(), RenderSettings::default())
    }

    #[test]
    fn hi_scrolls_in_forty_three_frames() {
        let mut ctx = context();
        let mut delay = CountingDelay::default();

        let outcome = block_on(scroll_fact(
            &mut ctx,
            &mut MockInput::new(),
            &mut delay,
            "HI",
            any_key,
        ));

        assert_eq!(outcome, ScrollOutcome::Completed);
        assert!(!outcome.interrupted());
        assert_eq!(ctx.sink().frames.len(), 43);
        assert_eq!(delay.calls, 43);
        assert_eq!(delay.total_ms, 43 * 80);
    }

    #[test]
    fn first_and_last_frames_are_dark() {
        let mut ctx = context();
        block_on(scroll_fact(
            &mut ctx,
            &mut MockInput::new(),
            &mut CountingDelay::default(),
            "HI",
            any_key,
        ));

        let frames = &ctx.sink().frames;
        let lit = |frame: &std::vec::Vec<RGB8>| frame.iter().any(|px| *px != crate::render::OFF);
        // Offset -32 shows nothing; offset 10 shows only the trailing blank column of 'I'.
        assert!(!lit(&frames[0]));
        assert!(!lit(&frames[42]));
        assert!(frames.iter().any(lit));
    }

    #[test]
    fn cursor_frame_count_matches_driver() {
        let render = RenderSettings::default();
        for text in ["", "HI", "Octopuses have three hearts."] {
            let mut ctx = context();
            let mut scroll = Scroll::new(text, &render);
            let expected = scroll.frame_count();

            let mut drawn = 0;
            while scroll.draw_next(&mut ctx) == ScrollStep::Drawn {
                drawn += 1;
            }
            assert_eq!(drawn, expected);
            assert_eq!(scroll.draw_next(&mut ctx), ScrollStep::Finished);
            assert_eq!(ctx.sink().frames.len(), expected);
        }
    }

    #[test]
    fn key_stops_scroll_on_the_same_frame() {
        for quiet in [0usize, 1, 5, 42] {
            let mut ctx = context();
            let mut delay = CountingDelay::default();
            let mut input = KeyAfter {
                quiet_polls: quiet,
                polls: 0,
                key: Key::Enter,
            };

            let outcome = block_on(scroll_fact(&mut ctx, &mut input, &mut delay, "HI", any_key));

            assert_eq!(outcome, ScrollOutcome::Interrupted(Key::Enter));
            assert_eq!(ctx.sink().frames.len(), quiet + 1);
            assert_eq!(delay.calls, quiet);
        }
    }

    #[test]
    fn delay_follows_render_settings() {
        let mut settings = crate::settings::Settings::default();
        settings.scroll_delay_ms = 5;
        let mut ctx = context();
        ctx.apply_settings(&settings);
        let mut delay = CountingDelay::default();

        block_on(scroll_fact(
            &mut ctx,
            &mut MockInput::new(),
            &mut delay,
            "a",
            any_key,
        ));

        assert_eq!(delay.calls, 32 + 5);
        assert_eq!(delay.total_ms, (32 + 5) * 5);
    }

    #[test]
    fn rejected_keys_are_dropped_and_scrolling_continues() {
        let mut ctx = context();
        let mut delay = CountingDelay::default();
        let mut input = ScriptedInput::new(&[Key::Char(b'x'), Key::Down, Key::Escape]);

        let outcome = block_on(scroll_fact(
            &mut ctx,
            &mut input,
            &mut delay,
            "HI",
            |key| key == Key::Escape,
        ));

        assert_eq!(outcome, ScrollOutcome::Interrupted(Key::Escape));
        assert_eq!(ctx.sink().frames.len(), 3);
        assert_eq!(delay.calls, 2);
    }

    #[test]
    fn no_interrupting_keys_means_a_full_pass() {
        let mut ctx = context();
        let mut delay = CountingDelay::default();
        let mut input = ScriptedInput::new(&[Key::Enter, Key::Enter]);

        let outcome = block_on(scroll_fact(&mut ctx, &mut input, &mut delay, "HI", |_| false));

        assert_eq!(outcome, ScrollOutcome::Completed);
        assert_eq!(ctx.sink().frames.len(), 43);
    }
}
