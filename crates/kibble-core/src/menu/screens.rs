pub const SCREEN_COUNT: usize = 6;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SelectTarget {
    ApiSource,
    TextColor,
    Brightness,
    FontSize,
}

impl SelectTarget {
    pub const fn option_count(self) -> usize {
        match self {
            SelectTarget::ApiSource => ApiSource::ALL.len(),
            SelectTarget::TextColor => TextColor::ALL.len(),
            SelectTarget::Brightness => BRIGHTNESS_LEVELS.len(),
            SelectTarget::FontSize => FontSize::ALL.len(),
        }
    }

    /// Index of the option matching the stored value.
    fn checked_index(self, settings: &Settings) -> Option<usize> {
        match self {
            SelectTarget::ApiSource => ApiSource::ALL
                .iter()
                .position(|source| *source == settings.api_source),
            SelectTarget::TextColor => TextColor::ALL
                .iter()
                .position(|color| *color == settings.text_color),
            SelectTarget::Brightness => {
                let level = settings.brightness as usize;
                (level < BRIGHTNESS_LEVELS.len()).then_some(level)
            }
            SelectTarget::FontSize => FontSize::ALL
                .iter()
                .position(|size| *size == settings.font_size),
        }
    }

    fn apply(self, settings: &mut Settings, index: usize) {
        match self {
            SelectTarget::ApiSource => {
                if let Some(source) = ApiSource::ALL.get(index) {
                    settings.api_source = *source;
                }
            }
            SelectTarget::TextColor => {
                if let Some(color) = TextColor::ALL.get(index) {
                    settings.text_color = *color;
                }
            }
            SelectTarget::Brightness => {
                if index < BRIGHTNESS_LEVELS.len() {
                    settings.brightness = index as u8;
                }
            }
            SelectTarget::FontSize => {
                if let Some(size) = FontSize::ALL.get(index) {
                    settings.font_size = *size;
                }
            }
        }
    }

    fn push_label<const N: usize>(self, index: usize, out: &mut String<N>) {
        match self {
            SelectTarget::ApiSource => {
                if let Some(source) = ApiSource::ALL.get(index) {
                    push_lossy(out, source.label());
                }
            }
            SelectTarget::TextColor => {
                if let Some(color) = TextColor::ALL.get(index) {
                    push_lossy(out, color.label());
                }
            }
            SelectTarget::Brightness => {
                push_lossy(out, "Level ");
                push_u16(out, index as u16);
            }
            SelectTarget::FontSize => {
                if let Some(size) = FontSize::ALL.get(index) {
                    push_lossy(out, size.label());
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScreenKind {
    Select(SelectTarget),
    TextEntry,
    NumberEntry {
        min: u16,
        max: u16,
        unit: &'static str,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScreenSpec {
    pub title: &'static str,
    pub kind: ScreenKind,
}

impl ScreenSpec {
    pub const fn item_count(&self) -> usize {
        match self.kind {
            ScreenKind::Select(target) => target.option_count(),
            ScreenKind::TextEntry => TextField::ALL.len(),
            // "Current: ..." and "Edit value".
            ScreenKind::NumberEntry { .. } => 2,
        }
    }
}

pub const SCREENS: [ScreenSpec; SCREEN_COUNT] = [
    ScreenSpec {
        title: "DATA SOURCE",
        kind: ScreenKind::Select(SelectTarget::ApiSource),
    },
    ScreenSpec {
        title: "WIFI & API",
        kind: ScreenKind::TextEntry,
    },
    ScreenSpec {
        title: "TEXT COLOR",
        kind: ScreenKind::Select(SelectTarget::TextColor),
    },
    ScreenSpec {
        title: "BRIGHTNESS",
        kind: ScreenKind::Select(SelectTarget::Brightness),
    },
    ScreenSpec {
        title: "FONT SIZE",
        kind: ScreenKind::Select(SelectTarget::FontSize),
    },
    ScreenSpec {
        title: "SCROLL SPEED",
        kind: ScreenKind::NumberEntry {
            min: SCROLL_DELAY_MIN_MS,
            max: SCROLL_DELAY_MAX_MS,
            unit: "ms",
        },
    },
];

/// First item index to show so that `selected` stays visible.
pub fn compute_scroll_offset(selected: usize, total: usize, max_visible: usize) -> usize {
    if total <= max_visible {
        return 0;
    }
    selected.saturating_sub(2).min(total - max_visible)
}
