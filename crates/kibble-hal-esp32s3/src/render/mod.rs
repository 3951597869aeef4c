pub mod menu;

use embedded_graphics::{draw_target::DrawTarget, pixelcolor::BinaryColor};
use kibble_core::menu::MenuView;

/// Draws a menu view onto a monochrome target.
///
/// The target is expected to be blank; nothing is flushed.
pub trait MenuRenderer {
    fn render<D>(&mut self, view: &MenuView<'_>, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>;
}
