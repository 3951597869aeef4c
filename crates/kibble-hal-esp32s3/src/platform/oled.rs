//! SSD1306 128x64 OLED used only while the settings menu is open.

use embedded_hal::i2c::I2c;
use kibble_core::menu::{MenuDisplay, MenuView};
use log::debug;
use ssd1306::{I2CDisplayInterface, Ssd1306, mode::BufferedGraphicsMode, prelude::*};

use crate::render::{MenuRenderer, menu::OledMenuRenderer};

type Driver<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OledError {
    Init,
    Power,
    Draw,
    Flush,
}

pub struct OledDisplay<I2C, R = OledMenuRenderer> {
    display: Driver<I2C>,
    renderer: R,
}

impl<I2C> OledDisplay<I2C, OledMenuRenderer>
where
    I2C: I2c,
{
    pub fn new(i2c: I2C) -> Self {
        Self::with_renderer(i2c, OledMenuRenderer::new())
    }
}

impl<I2C, R> OledDisplay<I2C, R>
where
    I2C: I2c,
    R: MenuRenderer,
{
    pub fn with_renderer(i2c: I2C, renderer: R) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        Self { display, renderer }
    }

    /// Initializes the controller and leaves the panel dark.
    pub fn initialize(&mut self) -> Result<(), OledError> {
        self.display.init().map_err(|err| {
            debug!("oled: init failed: {:?}", err);
            OledError::Init
        })?;
        self.set_enabled(false)
    }
}

impl<I2C, R> MenuDisplay for OledDisplay<I2C, R>
where
    I2C: I2c,
    R: MenuRenderer,
{
    type Error = OledError;

    fn set_enabled(&mut self, enabled: bool) -> Result<(), Self::Error> {
        if !enabled {
            self.display.clear_buffer();
            self.display.flush().map_err(|_| OledError::Flush)?;
        }
        self.display
            .set_display_on(enabled)
            .map_err(|_| OledError::Power)
    }

    fn show(&mut self, view: &MenuView<'_>) -> Result<(), Self::Error> {
        self.display.clear_buffer();
        self.renderer
            .render(view, &mut self.display)
            .map_err(|_| OledError::Draw)?;
        self.display.flush().map_err(|_| OledError::Flush)
    }
}
