//! Paginated settings menu driven by the keyboard and drawn on the OLED.
//!
//! The menu owns a working copy of [`Settings`]. Every confirmed change is
//! written through the [`SettingsStore`] immediately; the caller reads the
//! final record back with [`SettingsMenu::settings`] once the menu closes.

use core::fmt::Debug;

use embedded_hal_async::delay::DelayNs;
use heapless::{String, Vec};
use log::debug;

use crate::{
    font::FontSize,
    input::{InputProvider, Key, poll_key_lossy},
    settings::{
        ApiSource, BRIGHTNESS_LEVELS, ChangeSet, SCROLL_DELAY_MAX_MS, SCROLL_DELAY_MIN_MS,
        Settings, SettingsStore, TextColor, TextField,
    },
    text_policy::{parse_decimal, push_lossy, push_masked, push_truncated, push_u16},
    time::{Clock, has_elapsed},
};

pub const MENU_TIMEOUT_MS: u32 = 30_000;
pub const SAVED_ACK_MS: u32 = 500;
pub const MENU_POLL_MS: u32 = 50;
pub const MAX_VISIBLE_ITEMS: usize = 5;
/// Characters per OLED line at 8 px per glyph.
pub const LINE_CHARS: usize = 16;
pub const TEXT_WINDOW_CHARS: usize = 16;
pub const NAV_HINT: &str = "<L  UP/DN  R>";

const FIELD_VALUE_CHARS: usize = 10;
const PASSWORD_MASK_MAX: usize = 8;
const CURSOR_BLINK_MS: u32 = 400;
const LINE_BYTES: usize = 64;
const NUMBER_DIGITS: usize = 6;
const TEXT_ENTRY_BYTES: usize = 96;
const MAX_DIALOG_DEPTH: usize = 2;

pub type LineText = String<LINE_BYTES>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitReason {
    Escape,
    Timeout,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MenuExit {
    pub changes: ChangeSet,
    pub reason: ExitReason,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MenuStatus {
    Open,
    Closed(MenuExit),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MenuTick {
    Idle,
    Redraw,
    Closed(MenuExit),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum NumberError {
    NotANumber,
    OutOfRange,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Ack {
    Saved,
    SaveFailed,
}

impl Ack {
    const fn message(self) -> &'static str {
        match self {
            Ack::Saved => "  Saved!",
            Ack::SaveFailed => "Save failed",
        }
    }
}

#[derive(Clone, Debug)]
enum Dialog {
    TextEntry {
        field: TextField,
        buffer: EditBuffer<TEXT_ENTRY_BYTES>,
    },
    NumberEntry {
        buffer: EditBuffer<NUMBER_DIGITS>,
        error: Option<NumberError>,
    },
    Confirm {
        yes: bool,
    },
}

/// One formatted list line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ListRow {
    pub text: LineText,
    pub highlighted: bool,
}

/// Top-level screen: title, page indicator, up to five rows and a footer.
#[derive(Debug)]
pub struct ListView<'a> {
    pub title: &'static str,
    pub page: &'a str,
    pub rows: &'a [ListRow],
    pub footer: &'static str,
}

/// Text or number entry dialog.
#[derive(Debug)]
pub struct EntryView<'a> {
    pub heading: &'a str,
    pub subheading: &'a str,
    /// Visible part of the buffer, unit suffix included for numbers.
    pub text: &'a str,
    /// Cursor position within `text`, in characters.
    pub cursor_col: usize,
    pub cursor_visible: bool,
    pub error: Option<&'a str>,
}

#[derive(Debug)]
pub enum MenuView<'a> {
    List(ListView<'a>),
    TextEntry(EntryView<'a>),
    NumberEntry(EntryView<'a>),
    Confirm { yes_selected: bool },
}

/// Status display used while the menu is open.
pub trait MenuDisplay {
    type Error;

    /// Powers the panel on or off. Turning it off also blanks it.
    fn set_enabled(&mut self, enabled: bool) -> Result<(), Self::Error>;
    fn show(&mut self, view: &MenuView<'_>) -> Result<(), Self::Error>;
}

pub struct SettingsMenu {
    settings: Settings,
    screen_idx: usize,
    cursors: [usize; SCREEN_COUNT],
    dialogs: Vec<Dialog, MAX_DIALOG_DEPTH>,
    changes: ChangeSet,
    last_activity_ms: u32,
    ack: Option<(Ack, u32)>,
    pending_redraw: bool,
    last_blink_slot: Option<u32>,
}

include!("screens.rs");
include!("edit_buffer.rs");
include!("input.rs");
include!("view.rs");
include!("runner.rs");
