//! Persisted user settings and the storage abstraction.

mod record;

pub use record::{RECORD_CAPACITY, RecordError, decode_record, encode_record};

use heapless::String;
use log::debug;
use smart_leds::RGB8;

use crate::font::FontSize;

/// LED value for each brightness level, index = level.
pub const BRIGHTNESS_LEVELS: [u8; 11] = [5, 10, 20, 35, 55, 80, 110, 145, 185, 220, 255];
pub const MAX_BRIGHTNESS_LEVEL: u8 = (BRIGHTNESS_LEVELS.len() - 1) as u8;
pub const DEFAULT_BRIGHTNESS_LEVEL: u8 = 3;

pub const SCROLL_DELAY_MIN_MS: u16 = 5;
pub const SCROLL_DELAY_MAX_MS: u16 = 500;
pub const DEFAULT_SCROLL_DELAY_MS: u16 = 80;

pub const MAX_SSID_LEN: usize = 32;
pub const MAX_PASSWORD_LEN: usize = 64;
pub const MAX_API_KEY_LEN: usize = 96;

/// Which fact collection the badge pulls from.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ApiSource {
    #[default]
    Recent,
    All,
}

impl ApiSource {
    pub const ALL: [ApiSource; 2] = [ApiSource::Recent, ApiSource::All];

    pub const fn path(self) -> &'static str {
        match self {
            ApiSource::Recent => "/api/facts/recent",
            ApiSource::All => "/api/facts",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ApiSource::Recent => "Recent Facts",
            ApiSource::All => "All Facts",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TextColor {
    #[default]
    White,
    Blue,
    Green,
    Yellow,
    Orange,
    Red,
    Pink,
    Purple,
}

impl TextColor {
    pub const ALL: [TextColor; 8] = [
        TextColor::White,
        TextColor::Blue,
        TextColor::Green,
        TextColor::Yellow,
        TextColor::Orange,
        TextColor::Red,
        TextColor::Pink,
        TextColor::Purple,
    ];

    /// Unscaled palette color.
    pub const fn rgb(self) -> RGB8 {
        let (r, g, b) = match self {
            TextColor::White => (255, 255, 255),
            TextColor::Blue => (0, 0, 255),
            TextColor::Green => (0, 255, 0),
            TextColor::Yellow => (255, 255, 0),
            TextColor::Orange => (255, 128, 0),
            TextColor::Red => (255, 0, 0),
            TextColor::Pink => (255, 50, 150),
            TextColor::Purple => (128, 0, 255),
        };
        RGB8 { r, g, b }
    }

    pub const fn label(self) -> &'static str {
        match self {
            TextColor::White => "White",
            TextColor::Blue => "Blue",
            TextColor::Green => "Green",
            TextColor::Yellow => "Yellow",
            TextColor::Orange => "Orange",
            TextColor::Red => "Red",
            TextColor::Pink => "Pink",
            TextColor::Purple => "Purple",
        }
    }
}

/// User-tunable settings that survive reboot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    pub api_source: ApiSource,
    pub wifi_ssid: String<MAX_SSID_LEN>,
    pub wifi_password: String<MAX_PASSWORD_LEN>,
    pub api_key: String<MAX_API_KEY_LEN>,
    pub text_color: TextColor,
    pub brightness: u8,
    pub font_size: FontSize,
    pub scroll_delay_ms: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_source: ApiSource::Recent,
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            api_key: String::new(),
            text_color: TextColor::White,
            brightness: DEFAULT_BRIGHTNESS_LEVEL,
            font_size: FontSize::Large,
            scroll_delay_ms: DEFAULT_SCROLL_DELAY_MS,
        }
    }
}

impl Settings {
    /// Clamps numeric fields into their valid ranges.
    pub fn sanitized(mut self) -> Self {
        self.brightness = self.brightness.min(MAX_BRIGHTNESS_LEVEL);
        self.scroll_delay_ms = self
            .scroll_delay_ms
            .clamp(SCROLL_DELAY_MIN_MS, SCROLL_DELAY_MAX_MS);
        self
    }

    pub fn text(&self, field: TextField) -> &str {
        match field {
            TextField::WifiSsid => &self.wifi_ssid,
            TextField::WifiPassword => &self.wifi_password,
            TextField::ApiKey => &self.api_key,
        }
    }

    /// Replaces a text field, keeping as many leading characters as fit.
    pub fn set_text(&mut self, field: TextField, value: &str) {
        match field {
            TextField::WifiSsid => copy_truncated(&mut self.wifi_ssid, value),
            TextField::WifiPassword => copy_truncated(&mut self.wifi_password, value),
            TextField::ApiKey => copy_truncated(&mut self.api_key, value),
        }
    }
}

fn copy_truncated<const N: usize>(dst: &mut String<N>, value: &str) {
    dst.clear();
    for ch in value.chars() {
        if dst.push(ch).is_err() {
            break;
        }
    }
}

/// Free-text settings edited through the text entry dialog.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextField {
    WifiSsid,
    WifiPassword,
    ApiKey,
}

impl TextField {
    pub const ALL: [TextField; 3] = [TextField::WifiSsid, TextField::WifiPassword, TextField::ApiKey];

    pub const fn label(self) -> &'static str {
        match self {
            TextField::WifiSsid => "WiFi SSID",
            TextField::WifiPassword => "WiFi Password",
            TextField::ApiKey => "API Key",
        }
    }

    pub const fn max_len(self) -> usize {
        match self {
            TextField::WifiSsid => MAX_SSID_LEN,
            TextField::WifiPassword => MAX_PASSWORD_LEN,
            TextField::ApiKey => MAX_API_KEY_LEN,
        }
    }

    pub const fn is_secret(self) -> bool {
        matches!(self, TextField::WifiPassword)
    }
}

/// Which groups of settings differ between two records.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ChangeSet {
    /// Color, brightness, font or scroll speed.
    pub display: bool,
    /// WiFi SSID or password.
    pub wifi: bool,
    /// API source or key.
    pub source: bool,
}

impl ChangeSet {
    pub fn between(before: &Settings, after: &Settings) -> Self {
        Self {
            display: before.text_color != after.text_color
                || before.brightness != after.brightness
                || before.font_size != after.font_size
                || before.scroll_delay_ms != after.scroll_delay_ms,
            wifi: before.wifi_ssid != after.wifi_ssid
                || before.wifi_password != after.wifi_password,
            source: before.api_source != after.api_source || before.api_key != after.api_key,
        }
    }

    pub fn merge(&mut self, other: ChangeSet) {
        self.display |= other.display;
        self.wifi |= other.wifi;
        self.source |= other.source;
    }

    pub const fn any(&self) -> bool {
        self.display || self.wifi || self.source
    }

    pub const fn requires_reconnect(&self) -> bool {
        self.wifi
    }

    /// New credentials or a new source both invalidate the cached facts.
    pub const fn requires_refetch(&self) -> bool {
        self.wifi || self.source
    }
}

/// Abstract settings persistence backend.
pub trait SettingsStore {
    type Error;

    fn load(&mut self) -> Result<Option<Settings>, Self::Error>;
    fn save(&mut self, settings: &Settings) -> Result<(), Self::Error>;
}

/// Loads stored settings, falling back to defaults when missing or unreadable.
pub fn load_or_default<S>(store: &mut S) -> Settings
where
    S: SettingsStore,
    S::Error: core::fmt::Debug,
{
    match store.load() {
        Ok(Some(settings)) => settings.sanitized(),
        Ok(None) => {
            debug!("settings: no stored record, using defaults");
            Settings::default()
        }
        Err(err) => {
            debug!("settings: load failed ({:?}), using defaults", err);
            Settings::default()
        }
    }
}
