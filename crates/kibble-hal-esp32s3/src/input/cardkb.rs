//! M5Stack CardKB I2C keyboard.
//!
//! The keyboard answers every one-byte read with the code of the last key
//! pressed, or 0 when nothing is pending.

use embedded_hal::i2c::I2c;

use kibble_core::input::{InputProvider, Key};

/// Default I2C address of the CardKB.
pub const CARDKB_ADDR: u8 = 0x5F;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CardKbError<I2cErr> {
    I2c(I2cErr),
}

#[derive(Debug)]
pub struct CardKb<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> CardKb<I2C>
where
    I2C: I2c,
{
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: CARDKB_ADDR,
        }
    }

    /// Reads the pending key code; 0 means no key.
    pub fn read_code(&mut self) -> Result<u8, CardKbError<I2C::Error>> {
        let mut code = [0u8; 1];
        self.i2c
            .read(self.address, &mut code)
            .map_err(CardKbError::I2c)?;
        Ok(code[0])
    }

    /// Drops any key pressed before the caller started listening.
    pub fn drain(&mut self) {
        for _ in 0..4 {
            match self.read_code() {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    }
}

impl<I2C> InputProvider for CardKb<I2C>
where
    I2C: I2c,
{
    type Error = CardKbError<I2C::Error>;

    fn poll_key(&mut self) -> Result<Option<Key>, Self::Error> {
        Ok(Key::from_code(self.read_code()?))
    }
}
