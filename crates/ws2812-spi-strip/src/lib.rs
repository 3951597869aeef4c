#![cfg_attr(not(test), no_std)]

//! WS2812 LED chain driver over a plain SPI bus (MOSI only).

pub mod protocol;

use embedded_hal::spi::SpiBus;
use smart_leds::{RGB8, SmartLedsWrite};

/// Driver errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error<SpiErr> {
    /// SPI transfer failed.
    Spi(SpiErr),
    /// The frame has more LEDs than the encode buffer can hold.
    BufferTooSmall,
}

/// WS2812 driver.
///
/// The caller provides the encode buffer, sized with [`protocol::buffer_len`]
/// for the longest chain it will write.
#[derive(Debug)]
pub struct Ws2812<'buf, SPI> {
    spi: SPI,
    buffer: &'buf mut [u8],
}

impl<'buf, SPI> Ws2812<'buf, SPI>
where
    SPI: SpiBus<u8>,
{
    /// Creates a new driver instance. The bus must run at [`protocol::SPI_HZ`].
    pub fn new(spi: SPI, buffer: &'buf mut [u8]) -> Self {
        Self { spi, buffer }
    }

    /// Largest chain this driver can write in one frame.
    pub fn capacity(&self) -> usize {
        self.buffer.len().saturating_sub(protocol::RESET_BYTES) / protocol::BYTES_PER_LED
    }

    /// Releases the owned bus.
    pub fn release(self) -> SPI {
        self.spi
    }

    fn send(&mut self, led_count: usize) -> Result<(), Error<SPI::Error>> {
        let data_len = led_count * protocol::BYTES_PER_LED;
        let end = data_len + protocol::RESET_BYTES;
        self.buffer[data_len..end].fill(0);
        self.spi.write(&self.buffer[..end]).map_err(Error::Spi)?;
        self.spi.flush().map_err(Error::Spi)
    }
}

impl<SPI> SmartLedsWrite for Ws2812<'_, SPI>
where
    SPI: SpiBus<u8>,
{
    type Error = Error<SPI::Error>;
    type Color = RGB8;

    /// Encodes and sends one full frame followed by the latch gap.
    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        let capacity = self.capacity();
        let mut led_count = 0;

        for color in iterator {
            if led_count == capacity {
                return Err(Error::BufferTooSmall);
            }
            let color: RGB8 = color.into();
            let start = led_count * protocol::BYTES_PER_LED;
            let slot = <&mut [u8; protocol::BYTES_PER_LED]>::try_from(
                &mut self.buffer[start..start + protocol::BYTES_PER_LED],
            )
            .map_err(|_| Error::BufferTooSmall)?;
            protocol::encode_led(color.r, color.g, color.b, slot);
            led_count += 1;
        }

        self.send(led_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::spi::{ErrorKind, ErrorType};

    #[derive(Default)]
    struct RecordingBus {
        written: Vec<u8>,
        flushes: usize,
        fail: bool,
    }

    impl ErrorType for RecordingBus {
        type Error = ErrorKind;
    }

    impl SpiBus<u8> for RecordingBus {
        fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
            words.fill(0);
            Ok(())
        }

        fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
            if self.fail {
                return Err(ErrorKind::Other);
            }
            self.written.extend_from_slice(words);
            Ok(())
        }

        fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
            read.fill(0);
            self.write(write)
        }

        fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
            words.fill(0);
            Ok(())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn frame_is_encoded_then_latched() {
        let mut buffer = [0xAAu8; protocol::buffer_len(2)];
        let mut leds = Ws2812::new(RecordingBus::default(), &mut buffer);
        leds.write([RGB8::new(0, 0xFF, 0), RGB8::new(0x80, 0, 0)])
            .unwrap();

        let bus = leds.release();
        assert_eq!(bus.written.len(), protocol::buffer_len(2));
        assert_eq!(&bus.written[0..4], &[0xEE; 4]);
        assert_eq!(&bus.written[4..12], &[0x88; 8]);
        assert_eq!(&bus.written[12..16], &[0x88; 4]);
        assert_eq!(&bus.written[16..20], &[0xE8, 0x88, 0x88, 0x88]);
        assert!(bus.written[24..].iter().all(|byte| *byte == 0));
        assert_eq!(bus.flushes, 1);
    }

    #[test]
    fn short_frame_sends_only_used_leds() {
        let mut buffer = [0u8; protocol::buffer_len(4)];
        let mut leds = Ws2812::new(RecordingBus::default(), &mut buffer);
        leds.write([RGB8::default()]).unwrap();
        assert_eq!(leds.release().written.len(), protocol::buffer_len(1));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut buffer = [0u8; protocol::buffer_len(1)];
        let mut leds = Ws2812::new(RecordingBus::default(), &mut buffer);
        assert_eq!(leds.capacity(), 1);
        assert_eq!(
            leds.write([RGB8::default(), RGB8::default()]),
            Err(Error::BufferTooSmall)
        );
        assert!(leds.release().written.is_empty());
    }

    #[test]
    fn bus_errors_are_wrapped() {
        let mut buffer = [0u8; protocol::buffer_len(1)];
        let bus = RecordingBus {
            fail: true,
            ..RecordingBus::default()
        };
        let mut leds = Ws2812::new(bus, &mut buffer);
        assert_eq!(
            leds.write([RGB8::default()]),
            Err(Error::Spi(ErrorKind::Other))
        );
    }
}
