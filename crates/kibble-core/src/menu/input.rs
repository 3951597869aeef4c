impl SettingsMenu {
    /// Applies one key press.
    ///
    /// Every accepted key restarts the inactivity deadline.
    pub fn handle_key<S>(&mut self, key: Key, now_ms: u32, store: &mut S) -> MenuStatus
    where
        S: SettingsStore,
        S::Error: Debug,
    {
        self.last_activity_ms = now_ms;
        self.pending_redraw = true;

        let Some(top) = self.dialogs.pop() else {
            return self.apply_list_input(key, now_ms, store);
        };

        match top {
            Dialog::Confirm { yes } => self.apply_confirm_input(yes, key, now_ms, store),
            Dialog::TextEntry { field, buffer } => self.apply_text_input(field, buffer, key),
            Dialog::NumberEntry { buffer, .. } => self.apply_number_input(buffer, key),
        }
        MenuStatus::Open
    }

    fn apply_list_input<S>(&mut self, key: Key, now_ms: u32, store: &mut S) -> MenuStatus
    where
        S: SettingsStore,
        S::Error: Debug,
    {
        let screen = SCREENS[self.screen_idx];
        let cursor = self.cursors[self.screen_idx];

        match key {
            Key::Left => {
                self.screen_idx = (self.screen_idx + SCREEN_COUNT - 1) % SCREEN_COUNT;
                debug!("menu: screen {}", screen_title(self.screen_idx));
            }
            Key::Right => {
                self.screen_idx = (self.screen_idx + 1) % SCREEN_COUNT;
                debug!("menu: screen {}", screen_title(self.screen_idx));
            }
            Key::Up => {
                self.cursors[self.screen_idx] = cursor.saturating_sub(1);
            }
            Key::Down => {
                let last = screen.item_count().saturating_sub(1);
                self.cursors[self.screen_idx] = (cursor + 1).min(last);
            }
            Key::Enter => match screen.kind {
                ScreenKind::Select(target) => {
                    debug!("menu: select {:?} option {}", target, cursor);
                    self.commit(now_ms, store, |settings| target.apply(settings, cursor));
                }
                ScreenKind::TextEntry => {
                    let field = TextField::ALL[cursor.min(TextField::ALL.len() - 1)];
                    let buffer = EditBuffer::seeded(self.settings.text(field), field.max_len());
                    debug!("menu: editing {}", field.label());
                    self.push_dialog(Dialog::TextEntry { field, buffer });
                }
                ScreenKind::NumberEntry { .. } => {
                    let mut digits = String::<8>::new();
                    push_u16(&mut digits, self.settings.scroll_delay_ms);
                    let buffer = EditBuffer::seeded(&digits, NUMBER_DIGITS);
                    self.push_dialog(Dialog::NumberEntry {
                        buffer,
                        error: None,
                    });
                }
            },
            Key::Escape => {
                debug!("menu: closed by escape");
                return self.close(ExitReason::Escape);
            }
            _ => {}
        }

        MenuStatus::Open
    }

    fn apply_text_input(&mut self, field: TextField, mut buffer: EditBuffer<TEXT_ENTRY_BYTES>, key: Key) {
        match key {
            Key::Escape => {
                debug!("menu: edit of {} cancelled", field.label());
                return;
            }
            Key::Enter => {
                self.push_dialog(Dialog::TextEntry { field, buffer });
                self.push_dialog(Dialog::Confirm { yes: true });
                return;
            }
            Key::Backspace => buffer.backspace(),
            Key::Left => buffer.move_left(),
            Key::Right => buffer.move_right(),
            Key::Char(byte) => {
                let _ = buffer.insert(byte);
            }
            _ => {}
        }
        self.push_dialog(Dialog::TextEntry { field, buffer });
    }

    fn apply_number_input(&mut self, mut buffer: EditBuffer<NUMBER_DIGITS>, key: Key) {
        let mut error = None;

        match key {
            Key::Escape => return,
            Key::Enter => match validate_number(buffer.as_str()) {
                Ok(_) => {
                    self.push_dialog(Dialog::NumberEntry {
                        buffer,
                        error: None,
                    });
                    self.push_dialog(Dialog::Confirm { yes: true });
                    return;
                }
                Err(err) => {
                    debug!("menu: rejected number {:?}: {:?}", buffer.as_str(), err);
                    error = Some(err);
                }
            },
            Key::Backspace => buffer.backspace(),
            Key::Left => buffer.move_left(),
            Key::Right => buffer.move_right(),
            Key::Char(byte) if byte.is_ascii_digit() => {
                let _ = buffer.insert(byte);
            }
            _ => {}
        }

        self.push_dialog(Dialog::NumberEntry { buffer, error });
    }

    fn apply_confirm_input<S>(&mut self, yes: bool, key: Key, now_ms: u32, store: &mut S)
    where
        S: SettingsStore,
        S::Error: Debug,
    {
        match key {
            Key::Up | Key::Down => self.push_dialog(Dialog::Confirm { yes: !yes }),
            Key::Enter if yes => {
                if let Some(entry) = self.dialogs.pop() {
                    self.commit_entry(entry, now_ms, store);
                }
            }
            Key::Enter | Key::Escape => {
                debug!("menu: change declined");
                self.dialogs.pop();
            }
            _ => self.push_dialog(Dialog::Confirm { yes }),
        }
    }

    fn commit_entry<S>(&mut self, entry: Dialog, now_ms: u32, store: &mut S)
    where
        S: SettingsStore,
        S::Error: Debug,
    {
        match entry {
            Dialog::TextEntry { field, buffer } => {
                self.commit(now_ms, store, |settings| {
                    settings.set_text(field, buffer.as_str())
                });
            }
            Dialog::NumberEntry { buffer, .. } => {
                if let Ok(value) = validate_number(buffer.as_str()) {
                    self.commit(now_ms, store, |settings| settings.scroll_delay_ms = value);
                }
            }
            Dialog::Confirm { .. } => {}
        }
    }

    /// Applies `change` to the working settings, persists and acknowledges.
    fn commit<S, F>(&mut self, now_ms: u32, store: &mut S, change: F)
    where
        S: SettingsStore,
        S::Error: Debug,
        F: FnOnce(&mut Settings),
    {
        let before = self.settings.clone();
        change(&mut self.settings);
        self.changes
            .merge(ChangeSet::between(&before, &self.settings));

        let ack = match store.save(&self.settings) {
            Ok(()) => Ack::Saved,
            Err(err) => {
                debug!("menu: settings save failed: {:?}", err);
                Ack::SaveFailed
            }
        };
        self.ack = Some((ack, now_ms));
    }

    fn push_dialog(&mut self, dialog: Dialog) {
        if self.dialogs.push(dialog).is_err() {
            debug!("menu: dialog stack full");
        }
    }

    fn close(&mut self, reason: ExitReason) -> MenuStatus {
        self.dialogs.clear();
        self.ack = None;
        MenuStatus::Closed(MenuExit {
            changes: self.changes,
            reason,
        })
    }
}

fn validate_number(text: &str) -> Result<u16, NumberError> {
    let value = parse_decimal(text).ok_or(NumberError::NotANumber)?;
    if value < SCROLL_DELAY_MIN_MS as u32 || value > SCROLL_DELAY_MAX_MS as u32 {
        return Err(NumberError::OutOfRange);
    }
    Ok(value as u16)
}

fn screen_title(index: usize) -> &'static str {
    SCREENS.get(index).map(|screen| screen.title).unwrap_or("?")
}
