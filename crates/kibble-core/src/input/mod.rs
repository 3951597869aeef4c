//! Input abstraction layer.

pub mod mock;

use log::debug;

/// Raw key codes produced by the CardKB keyboard.
pub mod codes {
    pub const UP: u8 = 0xB5;
    pub const DOWN: u8 = 0xB6;
    pub const LEFT: u8 = 0xB4;
    pub const RIGHT: u8 = 0xB7;
    pub const ENTER: u8 = 0x0D;
    pub const BACKSPACE: u8 = 0x08;
    pub const ESCAPE: u8 = 0x1B;
}

/// Logical keys consumed by the scroll engine and the settings menu.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Backspace,
    Escape,
    /// Printable ASCII, 0x20..=0x7E.
    Char(u8),
    /// Any other non-zero code.
    Other(u8),
}

impl Key {
    /// Decodes a raw keyboard byte; 0 means no key.
    pub const fn from_code(code: u8) -> Option<Key> {
        let key = match code {
            0 => return None,
            codes::UP => Key::Up,
            codes::DOWN => Key::Down,
            codes::LEFT => Key::Left,
            codes::RIGHT => Key::Right,
            codes::ENTER => Key::Enter,
            codes::BACKSPACE => Key::Backspace,
            codes::ESCAPE => Key::Escape,
            0x20..=0x7E => Key::Char(code),
            other => Key::Other(other),
        };
        Some(key)
    }

    pub const fn code(self) -> u8 {
        match self {
            Key::Up => codes::UP,
            Key::Down => codes::DOWN,
            Key::Left => codes::LEFT,
            Key::Right => codes::RIGHT,
            Key::Enter => codes::ENTER,
            Key::Backspace => codes::BACKSPACE,
            Key::Escape => codes::ESCAPE,
            Key::Char(code) | Key::Other(code) => code,
        }
    }
}

/// Polled key source.
pub trait InputProvider {
    type Error;

    fn poll_key(&mut self) -> Result<Option<Key>, Self::Error>;
}

impl<T: InputProvider + ?Sized> InputProvider for &mut T {
    type Error = T::Error;

    fn poll_key(&mut self) -> Result<Option<Key>, Self::Error> {
        (**self).poll_key()
    }
}

/// An absent keyboard never reports a key.
impl<T: InputProvider> InputProvider for Option<T> {
    type Error = T::Error;

    fn poll_key(&mut self) -> Result<Option<Key>, Self::Error> {
        match self {
            Some(input) => input.poll_key(),
            None => Ok(None),
        }
    }
}

/// Polls once, treating a bus error as "no key".
pub fn poll_key_lossy<I>(input: &mut I) -> Option<Key>
where
    I: InputProvider,
    I::Error: core::fmt::Debug,
{
    match input.poll_key() {
        Ok(key) => key,
        Err(err) => {
            debug!("input: poll failed: {:?}", err);
            None
        }
    }
}
