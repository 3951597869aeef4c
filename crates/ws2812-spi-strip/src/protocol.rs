//! Wire-level encoding of WS2812 data as an SPI bit stream.
//!
//! With the bus clocked at [`SPI_HZ`] every SPI bit lasts 312.5 ns, so one
//! WS2812 data bit is sent as four SPI bits:
//! - `0` as `1000` (0.31 us high, 0.94 us low)
//! - `1` as `1110` (0.94 us high, 0.31 us low)

/// SPI clock the encoding is timed for.
pub const SPI_HZ: u32 = 3_200_000;
/// SPI bytes per color channel byte.
pub const BYTES_PER_CHANNEL: usize = 4;
/// SPI bytes per LED (three channels).
pub const BYTES_PER_LED: usize = 3 * BYTES_PER_CHANNEL;
/// Low bytes appended after each frame to latch it (300 us).
pub const RESET_BYTES: usize = 120;

const ZERO_PATTERN: u8 = 0b1000;
const ONE_PATTERN: u8 = 0b1110;

/// Buffer length needed to send `led_count` LEDs plus the latch.
pub const fn buffer_len(led_count: usize) -> usize {
    led_count * BYTES_PER_LED + RESET_BYTES
}

/// Expands one channel byte, MSB first.
#[inline]
pub fn encode_channel(value: u8) -> [u8; BYTES_PER_CHANNEL] {
    let mut out = [0u8; BYTES_PER_CHANNEL];
    for (i, slot) in out.iter_mut().enumerate() {
        let hi = (value >> (7 - 2 * i)) & 1;
        let lo = (value >> (6 - 2 * i)) & 1;
        *slot = (pattern(hi) << 4) | pattern(lo);
    }
    out
}

#[inline]
const fn pattern(bit: u8) -> u8 {
    if bit == 0 { ZERO_PATTERN } else { ONE_PATTERN }
}

/// Writes one LED in the chip's green, red, blue order.
#[inline]
pub fn encode_led(red: u8, green: u8, blue: u8, out: &mut [u8; BYTES_PER_LED]) {
    for (chunk, value) in out.chunks_exact_mut(BYTES_PER_CHANNEL).zip([green, red, blue]) {
        chunk.copy_from_slice(&encode_channel(value));
    }
}
