//! 128x64 menu layout: a title band above row 16 and the list or dialog
//! below it, drawn in an 8 px cell font so 16 characters fit per line.

use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle, ascii::FONT_5X8},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use kibble_core::menu::{EntryView, ListView, MenuView, NAV_HINT};

use super::MenuRenderer;

const PANEL_WIDTH: i32 = 128;
const CELL: i32 = 8;

const CELL_FONT: MonoFont<'static> = MonoFont {
    character_spacing: 3,
    ..FONT_5X8
};

const TITLE_Y: i32 = 4;
const SEPARATOR_Y: i32 = 15;
const FIRST_ROW_Y: i32 = 18;
const FOOTER_Y: i32 = 56;
const HINT_X: i32 = 8;
const ACK_X: i32 = 32;

const ENTRY_SUBHEADING_Y: i32 = 10;
const ENTRY_SEPARATOR_Y: i32 = 19;
const ENTRY_TEXT_Y: i32 = 24;
const ENTRY_CURSOR_Y: i32 = 33;
const ENTRY_ERROR_Y: i32 = 40;
const ENTRY_OK_Y: i32 = 48;

#[derive(Debug, Default, Clone, Copy)]
pub struct OledMenuRenderer;

impl OledMenuRenderer {
    pub const fn new() -> Self {
        Self
    }
}

impl MenuRenderer for OledMenuRenderer {
    fn render<D>(&mut self, view: &MenuView<'_>, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        match view {
            MenuView::List(list) => draw_list(list, target),
            MenuView::TextEntry(entry) | MenuView::NumberEntry(entry) => draw_entry(entry, target),
            MenuView::Confirm { yes_selected } => draw_confirm(*yes_selected, target),
        }
    }
}

fn draw_list<D>(list: &ListView<'_>, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    text(list.title, 0, TITLE_Y, BinaryColor::On, target)?;
    let page_x = PANEL_WIDTH - list.page.len() as i32 * CELL;
    text(list.page, page_x, TITLE_Y, BinaryColor::On, target)?;
    hline(0, SEPARATOR_Y, PANEL_WIDTH, target)?;

    for (i, row) in list.rows.iter().enumerate() {
        let y = FIRST_ROW_Y + i as i32 * CELL;
        if row.highlighted {
            Rectangle::new(Point::new(0, y - 1), Size::new(PANEL_WIDTH as u32, 9))
                .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                .draw(target)?;
            text(&row.text, 0, y, BinaryColor::Off, target)?;
        } else {
            text(&row.text, 0, y, BinaryColor::On, target)?;
        }
    }

    let footer_x = if list.footer == NAV_HINT { HINT_X } else { ACK_X };
    text(list.footer, footer_x, FOOTER_Y, BinaryColor::On, target)?;
    Ok(())
}

fn draw_entry<D>(entry: &EntryView<'_>, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    text(entry.heading, 0, 0, BinaryColor::On, target)?;
    text(entry.subheading, 0, ENTRY_SUBHEADING_Y, BinaryColor::On, target)?;
    hline(0, ENTRY_SEPARATOR_Y, PANEL_WIDTH, target)?;
    text(entry.text, 0, ENTRY_TEXT_Y, BinaryColor::On, target)?;

    if entry.cursor_visible {
        hline(entry.cursor_col as i32 * CELL, ENTRY_CURSOR_Y, CELL - 1, target)?;
    }
    if let Some(error) = entry.error {
        text(error, 0, ENTRY_ERROR_Y, BinaryColor::On, target)?;
    }

    text("ENT=OK", 0, ENTRY_OK_Y, BinaryColor::On, target)?;
    text("ESC=CANCEL", 0, FOOTER_Y, BinaryColor::On, target)?;
    Ok(())
}

fn draw_confirm<D>(yes_selected: bool, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    text("ARE YOU SURE", 16, 4, BinaryColor::On, target)?;
    text("YOU WANT TO", 20, 14, BinaryColor::On, target)?;
    text("CHANGE THIS?", 16, 24, BinaryColor::On, target)?;

    let (yes, no) = if yes_selected {
        ("> YES", "  NO")
    } else {
        ("  YES", "> NO")
    };
    text(yes, 40, 40, BinaryColor::On, target)?;
    text(no, 40, 50, BinaryColor::On, target)?;
    Ok(())
}

fn text<D>(s: &str, x: i32, y: i32, color: BinaryColor, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let style = MonoTextStyle::new(&CELL_FONT, color);
    Text::with_baseline(s, Point::new(x, y), style, Baseline::Top).draw(target)?;
    Ok(())
}

fn hline<D>(x: i32, y: i32, len: i32, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Line::new(Point::new(x, y), Point::new(x + len - 1, y))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(target)
}
