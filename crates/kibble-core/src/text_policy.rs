//! Shared text shaping and truncation policies for the menu display.

use heapless::String;

pub const ELLIPSIS: &str = "..";

/// Appends `text` cut to `max_chars` characters, ending in ".." when cut.
///
/// Characters that no longer fit in `out` are dropped.
pub fn push_truncated<const N: usize>(out: &mut String<N>, text: &str, max_chars: usize) {
    let total = text.chars().count();
    if total <= max_chars {
        push_lossy(out, text);
        return;
    }

    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    for ch in text.chars().take(keep) {
        if out.push(ch).is_err() {
            return;
        }
    }
    push_lossy(out, &ELLIPSIS[..max_chars.min(ELLIPSIS.len())]);
}

/// Appends one `*` per character of `secret`, at most `max_mask`.
pub fn push_masked<const N: usize>(out: &mut String<N>, secret: &str, max_mask: usize) {
    for _ in 0..secret.chars().count().min(max_mask) {
        if out.push('*').is_err() {
            return;
        }
    }
}

pub fn push_lossy<const N: usize>(out: &mut String<N>, text: &str) {
    for ch in text.chars() {
        if out.push(ch).is_err() {
            return;
        }
    }
}

pub fn push_u16<const N: usize>(out: &mut String<N>, value: u16) {
    let mut digits = [0u8; 5];
    let len = write_u16_ascii(value, &mut digits);
    for digit in &digits[..len] {
        if out.push(*digit as char).is_err() {
            return;
        }
    }
}

/// Parses a non-empty run of ASCII digits. Anything else is `None`.
pub fn parse_decimal(text: &str) -> Option<u32> {
    if text.is_empty() {
        return None;
    }

    let mut value = 0u32;
    for byte in text.bytes() {
        if !byte.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add((byte - b'0') as u32)?;
    }
    Some(value)
}

pub fn write_u16_ascii(mut value: u16, out: &mut [u8]) -> usize {
    if out.is_empty() {
        return 0;
    }

    if value == 0 {
        out[0] = b'0';
        return 1;
    }

    let mut tmp = [0u8; 5];
    let mut n = 0usize;
    while value > 0 && n < tmp.len() {
        tmp[n] = b'0' + (value % 10) as u8;
        value /= 10;
        n += 1;
    }

    let len = n.min(out.len());
    for i in 0..len {
        out[i] = tmp[n - 1 - i];
    }
    len
}
