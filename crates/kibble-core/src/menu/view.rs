impl SettingsMenu {
    pub fn new(settings: Settings, now_ms: u32) -> Self {
        Self {
            settings: settings.sanitized(),
            screen_idx: 0,
            cursors: [0; SCREEN_COUNT],
            dialogs: Vec::new(),
            changes: ChangeSet::default(),
            last_activity_ms: now_ms,
            ack: None,
            pending_redraw: true,
            last_blink_slot: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }

    pub fn changes(&self) -> ChangeSet {
        self.changes
    }

    pub fn screen_index(&self) -> usize {
        self.screen_idx
    }

    pub fn cursor(&self) -> usize {
        self.cursors[self.screen_idx]
    }

    pub fn dialog_depth(&self) -> usize {
        self.dialogs.len()
    }

    /// Advances timers; reports whether the display needs a redraw.
    pub fn tick(&mut self, now_ms: u32) -> MenuTick {
        if has_elapsed(now_ms, self.last_activity_ms, MENU_TIMEOUT_MS) {
            debug!("menu: closed after inactivity");
            return match self.close(ExitReason::Timeout) {
                MenuStatus::Closed(exit) => MenuTick::Closed(exit),
                MenuStatus::Open => MenuTick::Idle,
            };
        }

        if let Some((_, since)) = self.ack {
            if has_elapsed(now_ms, since, SAVED_ACK_MS) {
                self.ack = None;
                self.pending_redraw = true;
            }
        }

        let editing = matches!(
            self.dialogs.last(),
            Some(Dialog::TextEntry { .. } | Dialog::NumberEntry { .. })
        );
        if editing {
            let slot = now_ms / CURSOR_BLINK_MS;
            if self.last_blink_slot != Some(slot) {
                self.last_blink_slot = Some(slot);
                self.pending_redraw = true;
            }
        } else {
            self.last_blink_slot = None;
        }

        if self.pending_redraw {
            self.pending_redraw = false;
            MenuTick::Redraw
        } else {
            MenuTick::Idle
        }
    }

    pub fn with_view<F, R>(&self, now_ms: u32, f: F) -> R
    where
        F: FnOnce(&MenuView<'_>) -> R,
    {
        let cursor_visible = (now_ms / CURSOR_BLINK_MS) % 2 == 1;

        match self.dialogs.last() {
            Some(Dialog::Confirm { yes }) => f(&MenuView::Confirm { yes_selected: *yes }),
            Some(Dialog::TextEntry { field, buffer }) => {
                let mut label = LineText::new();
                push_truncated(&mut label, field.label(), LINE_CHARS);
                let (text, cursor_col) = buffer.window(TEXT_WINDOW_CHARS);

                f(&MenuView::TextEntry(EntryView {
                    heading: "EDIT:",
                    subheading: &label,
                    text,
                    cursor_col,
                    cursor_visible,
                    error: None,
                }))
            }
            Some(Dialog::NumberEntry { buffer, error }) => {
                let screen = SCREENS[self.screen_idx];
                let (min, max, unit) = match screen.kind {
                    ScreenKind::NumberEntry { min, max, unit } => (min, max, unit),
                    _ => (SCROLL_DELAY_MIN_MS, SCROLL_DELAY_MAX_MS, "ms"),
                };

                let mut range = LineText::new();
                push_u16(&mut range, min);
                push_lossy(&mut range, "-");
                push_u16(&mut range, max);

                let mut text = LineText::new();
                push_lossy(&mut text, buffer.as_str());
                push_lossy(&mut text, unit);

                let mut message = LineText::new();
                match error {
                    Some(NumberError::NotANumber) => push_lossy(&mut message, "Not a number!"),
                    Some(NumberError::OutOfRange) => {
                        push_lossy(&mut message, &range);
                        push_lossy(&mut message, " only!");
                    }
                    None => {}
                }
                push_lossy(&mut range, unit);

                f(&MenuView::NumberEntry(EntryView {
                    heading: screen.title,
                    subheading: &range,
                    text: &text,
                    cursor_col: buffer.cursor(),
                    cursor_visible,
                    error: error.map(|_| message.as_str()),
                }))
            }
            None => {
                let rows = self.list_rows();
                let mut page = String::<8>::new();
                push_u16(&mut page, (self.screen_idx + 1) as u16);
                push_lossy(&mut page, "/");
                push_u16(&mut page, SCREEN_COUNT as u16);

                f(&MenuView::List(ListView {
                    title: SCREENS[self.screen_idx].title,
                    page: &page,
                    rows: &rows,
                    footer: self.ack.map(|(ack, _)| ack.message()).unwrap_or(NAV_HINT),
                }))
            }
        }
    }

    fn list_rows(&self) -> Vec<ListRow, MAX_VISIBLE_ITEMS> {
        let screen = SCREENS[self.screen_idx];
        let total = screen.item_count();
        let selected = self.cursors[self.screen_idx].min(total.saturating_sub(1));
        let offset = compute_scroll_offset(selected, total, MAX_VISIBLE_ITEMS);
        let checked = match screen.kind {
            ScreenKind::Select(target) => target.checked_index(&self.settings),
            _ => None,
        };

        let mut rows = Vec::new();
        for index in offset..(offset + MAX_VISIBLE_ITEMS).min(total) {
            let mut item = LineText::new();
            self.push_item_label(screen.kind, index, &mut item);

            let highlighted = index == selected;
            let suffix = if checked == Some(index) { " *" } else { "" };

            let mut label = LineText::new();
            push_lossy(&mut label, if highlighted { ">" } else { " " });
            push_lossy(&mut label, &item);

            let mut text = LineText::new();
            push_truncated(&mut text, &label, LINE_CHARS - suffix.len());
            push_lossy(&mut text, suffix);

            if rows.push(ListRow { text, highlighted }).is_err() {
                break;
            }
        }
        rows
    }

    fn push_item_label(&self, kind: ScreenKind, index: usize, out: &mut LineText) {
        match kind {
            ScreenKind::Select(target) => target.push_label(index, out),
            ScreenKind::TextEntry => {
                let Some(field) = TextField::ALL.get(index).copied() else {
                    return;
                };
                push_lossy(out, field.label());
                push_lossy(out, ":");

                let value = self.settings.text(field);
                if value.is_empty() {
                    push_lossy(out, "(not set)");
                } else if field.is_secret() {
                    push_masked(out, value, PASSWORD_MASK_MAX);
                } else {
                    push_truncated(out, value, FIELD_VALUE_CHARS);
                }
            }
            ScreenKind::NumberEntry { unit, .. } => {
                if index == 0 {
                    push_lossy(out, "Current: ");
                    push_u16(out, self.settings.scroll_delay_ms);
                    push_lossy(out, unit);
                } else {
                    push_lossy(out, "Edit value");
                }
            }
        }
    }
}
