//! Binary settings record stored in flash.
//!
//! Layout (little endian):
//!
//! ```text
//! magic:u32  version:u8  payload_len:u16  payload[payload_len]  checksum:u32
//! payload = { tag:u8 len:u8 value[len] }*
//! ```
//!
//! Unknown tags are skipped, missing tags keep their defaults, and values
//! that cannot be interpreted leave the field at its default.

use core::str;

use heapless::String;
use log::debug;

use super::{ApiSource, Settings, TextColor};
use crate::font::FontSize;

pub const RECORD_MAGIC: u32 = 0x454C_424B; // "KBLE"
pub const RECORD_VERSION: u8 = 1;
/// Largest encoded record, header and checksum included.
pub const RECORD_CAPACITY: usize = 256;

const HEADER_LEN: usize = 7;
const CHECKSUM_LEN: usize = 4;

const TAG_API_SOURCE: u8 = 1;
const TAG_WIFI_SSID: u8 = 2;
const TAG_WIFI_PASSWORD: u8 = 3;
const TAG_API_KEY: u8 = 4;
const TAG_TEXT_COLOR: u8 = 5;
const TAG_BRIGHTNESS: u8 = 6;
const TAG_FONT_SIZE: u8 = 7;
const TAG_SCROLL_DELAY: u8 = 8;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RecordError {
    BufferTooSmall,
    Truncated,
    Checksum,
    UnsupportedVersion(u8),
}

/// Encodes `settings` into `out`, returning the number of bytes used.
pub fn encode_record(settings: &Settings, out: &mut [u8]) -> Result<usize, RecordError> {
    let mut writer = Writer {
        out,
        len: HEADER_LEN,
    };

    writer.entry(TAG_API_SOURCE, &[api_source_code(settings.api_source)])?;
    writer.entry(TAG_WIFI_SSID, settings.wifi_ssid.as_bytes())?;
    writer.entry(TAG_WIFI_PASSWORD, settings.wifi_password.as_bytes())?;
    writer.entry(TAG_API_KEY, settings.api_key.as_bytes())?;
    writer.entry(TAG_TEXT_COLOR, &[text_color_code(settings.text_color)])?;
    writer.entry(TAG_BRIGHTNESS, &[settings.brightness])?;
    writer.entry(TAG_FONT_SIZE, &[font_size_code(settings.font_size)])?;
    writer.entry(TAG_SCROLL_DELAY, &settings.scroll_delay_ms.to_le_bytes())?;

    let payload_len = writer.len - HEADER_LEN;
    let total = writer.len + CHECKSUM_LEN;
    let out = writer.out;
    if total > out.len() {
        return Err(RecordError::BufferTooSmall);
    }

    out[0..4].copy_from_slice(&RECORD_MAGIC.to_le_bytes());
    out[4] = RECORD_VERSION;
    out[5..7].copy_from_slice(&(payload_len as u16).to_le_bytes());
    let checksum = checksum32(&out[..HEADER_LEN + payload_len]);
    out[HEADER_LEN + payload_len..total].copy_from_slice(&checksum.to_le_bytes());
    Ok(total)
}

/// Decodes a record.
///
/// Erased flash or a foreign magic yields `Ok(None)`. The result is not
/// clamped; callers pass it through [`Settings::sanitized`].
pub fn decode_record(bytes: &[u8]) -> Result<Option<Settings>, RecordError> {
    if bytes.len() < HEADER_LEN {
        return Ok(None);
    }
    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != RECORD_MAGIC {
        return Ok(None);
    }

    let version = bytes[4];
    if version != RECORD_VERSION {
        return Err(RecordError::UnsupportedVersion(version));
    }

    let payload_len = u16::from_le_bytes([bytes[5], bytes[6]]) as usize;
    let payload_end = HEADER_LEN + payload_len;
    if payload_end + CHECKSUM_LEN > bytes.len() {
        return Err(RecordError::Truncated);
    }

    let expected = u32::from_le_bytes([
        bytes[payload_end],
        bytes[payload_end + 1],
        bytes[payload_end + 2],
        bytes[payload_end + 3],
    ]);
    if checksum32(&bytes[..payload_end]) != expected {
        return Err(RecordError::Checksum);
    }

    let mut settings = Settings::default();
    let payload = &bytes[HEADER_LEN..payload_end];
    let mut pos = 0usize;
    while pos < payload.len() {
        if pos + 2 > payload.len() {
            return Err(RecordError::Truncated);
        }
        let tag = payload[pos];
        let len = payload[pos + 1] as usize;
        let start = pos + 2;
        let end = start + len;
        if end > payload.len() {
            return Err(RecordError::Truncated);
        }
        apply_entry(&mut settings, tag, &payload[start..end]);
        pos = end;
    }

    Ok(Some(settings))
}

fn apply_entry(settings: &mut Settings, tag: u8, value: &[u8]) {
    match (tag, value) {
        (TAG_API_SOURCE, [code]) => {
            if let Some(source) = api_source_from_code(*code) {
                settings.api_source = source;
            }
        }
        (TAG_WIFI_SSID, _) => read_text(&mut settings.wifi_ssid, value),
        (TAG_WIFI_PASSWORD, _) => read_text(&mut settings.wifi_password, value),
        (TAG_API_KEY, _) => read_text(&mut settings.api_key, value),
        (TAG_TEXT_COLOR, [code]) => {
            if let Some(color) = TextColor::ALL.get(*code as usize) {
                settings.text_color = *color;
            }
        }
        (TAG_BRIGHTNESS, [level]) => settings.brightness = *level,
        (TAG_FONT_SIZE, [code]) => {
            if let Some(size) = FontSize::ALL.get(*code as usize) {
                settings.font_size = *size;
            }
        }
        (TAG_SCROLL_DELAY, [lo, hi]) => settings.scroll_delay_ms = u16::from_le_bytes([*lo, *hi]),
        _ => debug!("settings: skipping record tag {} ({} bytes)", tag, value.len()),
    }
}

fn read_text<const N: usize>(dst: &mut String<N>, value: &[u8]) {
    let Ok(text) = str::from_utf8(value) else {
        debug!("settings: ignoring non-utf8 text entry");
        return;
    };
    dst.clear();
    for ch in text.chars() {
        if dst.push(ch).is_err() {
            break;
        }
    }
}

struct Writer<'a> {
    out: &'a mut [u8],
    len: usize,
}

impl Writer<'_> {
    fn entry(&mut self, tag: u8, value: &[u8]) -> Result<(), RecordError> {
        let len = u8::try_from(value.len()).map_err(|_| RecordError::BufferTooSmall)?;
        let end = self.len + 2 + value.len();
        if end > self.out.len() {
            return Err(RecordError::BufferTooSmall);
        }
        self.out[self.len] = tag;
        self.out[self.len + 1] = len;
        self.out[self.len + 2..end].copy_from_slice(value);
        self.len = end;
        Ok(())
    }
}

fn api_source_code(source: ApiSource) -> u8 {
    match source {
        ApiSource::Recent => 0,
        ApiSource::All => 1,
    }
}

fn api_source_from_code(code: u8) -> Option<ApiSource> {
    ApiSource::ALL.get(code as usize).copied()
}

fn text_color_code(color: TextColor) -> u8 {
    TextColor::ALL
        .iter()
        .position(|c| *c == color)
        .unwrap_or(0) as u8
}

fn font_size_code(size: FontSize) -> u8 {
    match size {
        FontSize::Large => 0,
        FontSize::Small => 1,
    }
}

fn checksum32(bytes: &[u8]) -> u32 {
    let mut hash = 0x811C9DC5u32;
    for b in bytes {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::TextField;

    fn sample() -> Settings {
        let mut settings = Settings::default();
        settings.api_source = ApiSource::All;
        settings.set_text(TextField::WifiSsid, "badge-net");
        settings.set_text(TextField::WifiPassword, "p@ss word");
        settings.set_text(TextField::ApiKey, "kbl_0123456789");
        settings.text_color = TextColor::Purple;
        settings.brightness = 9;
        settings.font_size = FontSize::Small;
        settings.scroll_delay_ms = 250;
        settings
    }

    #[test]
    fn encoded_record_decodes_to_same_settings() {
        let mut buf = [0xFFu8; RECORD_CAPACITY];
        let len = encode_record(&sample(), &mut buf).unwrap();
        assert!(len <= RECORD_CAPACITY);
        assert_eq!(decode_record(&buf).unwrap(), Some(sample()));
    }

    #[test]
    fn longest_strings_fit_in_capacity() {
        let mut settings = Settings::default();
        let long = "y".repeat(200);
        for field in TextField::ALL {
            settings.set_text(field, &long);
        }
        let mut buf = [0u8; RECORD_CAPACITY];
        let len = encode_record(&settings, &mut buf).unwrap();
        assert_eq!(decode_record(&buf[..len]).unwrap(), Some(settings));
    }

    #[test]
    fn erased_flash_is_no_record() {
        assert_eq!(decode_record(&[0xFF; RECORD_CAPACITY]), Ok(None));
        assert_eq!(decode_record(&[]), Ok(None));
    }

    #[test]
    fn flipped_byte_fails_checksum() {
        let mut buf = [0u8; RECORD_CAPACITY];
        encode_record(&sample(), &mut buf).unwrap();
        buf[HEADER_LEN + 3] ^= 0x20;
        assert_eq!(decode_record(&buf), Err(RecordError::Checksum));
    }

    #[test]
    fn small_buffer_is_rejected() {
        let mut buf = [0u8; 16];
        assert_eq!(
            encode_record(&sample(), &mut buf),
            Err(RecordError::BufferTooSmall)
        );
    }

    fn build(entries: &[(u8, &[u8])]) -> std::vec::Vec<u8> {
        let mut payload = std::vec::Vec::new();
        for (tag, value) in entries {
            payload.push(*tag);
            payload.push(value.len() as u8);
            payload.extend_from_slice(value);
        }
        let mut out = std::vec::Vec::new();
        out.extend_from_slice(&RECORD_MAGIC.to_le_bytes());
        out.push(RECORD_VERSION);
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(&payload);
        let checksum = checksum32(&out);
        out.extend_from_slice(&checksum.to_le_bytes());
        out
    }

    #[test]
    fn unknown_tags_are_skipped_and_missing_tags_default() {
        let bytes = build(&[
            (42, &b"future"[..]),
            (TAG_TEXT_COLOR, &[5][..]),
            (TAG_BRIGHTNESS, &[7][..]),
        ]);
        let settings = decode_record(&bytes).unwrap().unwrap();

        assert_eq!(settings.text_color, TextColor::Red);
        assert_eq!(settings.brightness, 7);
        assert_eq!(settings.api_source, ApiSource::Recent);
        assert_eq!(settings.scroll_delay_ms, 80);
    }

    #[test]
    fn invalid_values_keep_defaults_per_field() {
        let bytes = build(&[
            (TAG_TEXT_COLOR, &[200][..]),
            (TAG_FONT_SIZE, &[1][..]),
            (TAG_WIFI_SSID, &[0xFF, 0xFE][..]),
            (TAG_SCROLL_DELAY, &[1][..]),
        ]);
        let settings = decode_record(&bytes).unwrap().unwrap();

        assert_eq!(settings.text_color, TextColor::White);
        assert_eq!(settings.font_size, FontSize::Small);
        assert!(settings.wifi_ssid.is_empty());
        assert_eq!(settings.scroll_delay_ms, 80);
    }

    #[test]
    fn out_of_range_values_survive_decode_for_clamping() {
        let bytes = build(&[
            (TAG_BRIGHTNESS, &[50][..]),
            (TAG_SCROLL_DELAY, &2000u16.to_le_bytes()[..]),
        ]);
        let settings = decode_record(&bytes).unwrap().unwrap().sanitized();
        assert_eq!(settings.brightness, 10);
        assert_eq!(settings.scroll_delay_ms, 500);
    }

    #[test]
    fn entry_running_past_payload_is_truncated() {
        let mut bytes = build(&[(TAG_BRIGHTNESS, &[4][..])]);
        // Claim a 9-byte value inside a 3-byte payload.
        bytes[HEADER_LEN + 1] = 9;
        let checksum = checksum32(&bytes[..HEADER_LEN + 3]);
        bytes[HEADER_LEN + 3..HEADER_LEN + 7].copy_from_slice(&checksum.to_le_bytes());
        assert_eq!(decode_record(&bytes), Err(RecordError::Truncated));
    }

    #[test]
    fn other_versions_are_rejected() {
        let mut bytes = build(&[]);
        bytes[4] = 9;
        assert_eq!(
            decode_record(&bytes),
            Err(RecordError::UnsupportedVersion(9))
        );
    }
}
