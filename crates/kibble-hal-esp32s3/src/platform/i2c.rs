//! Shared I2C bus helpers.

use embedded_hal::i2c::I2c;
use log::info;

/// I2C address of the SSD1306 menu display.
pub const SSD1306_ADDR: u8 = 0x3C;

/// Returns whether a device acknowledges a one-byte read at `address`.
pub fn device_present<I2C>(i2c: &mut I2C, address: u8) -> bool
where
    I2C: I2c,
{
    let mut probe = [0u8; 1];
    i2c.read(address, &mut probe).is_ok()
}

/// Which optional peripherals answered on the bus at boot.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Peripherals {
    pub keyboard: bool,
    pub oled: bool,
}

impl Peripherals {
    pub fn detect<I2C>(i2c: &mut I2C) -> Self
    where
        I2C: I2c,
    {
        let detected = Self {
            keyboard: device_present(i2c, crate::input::cardkb::CARDKB_ADDR),
            oled: device_present(i2c, SSD1306_ADDR),
        };
        if detected.keyboard {
            info!("i2c: CardKB detected at 0x{:02X}", crate::input::cardkb::CARDKB_ADDR);
        }
        if detected.oled {
            info!("i2c: OLED detected at 0x{:02X}", SSD1306_ADDR);
        }
        detected
    }

    /// The settings menu needs both a keyboard and somewhere to draw.
    pub const fn menu_available(self) -> bool {
        self.keyboard && self.oled
    }
}
