/// Single-line ASCII buffer with an insertion cursor.
#[derive(Clone, Debug)]
struct EditBuffer<const N: usize> {
    bytes: [u8; N],
    len: usize,
    limit: usize,
    cursor: usize,
}

impl<const N: usize> EditBuffer<N> {
    fn with_limit(limit: usize) -> Self {
        Self {
            bytes: [0u8; N],
            len: 0,
            limit: limit.min(N),
            cursor: 0,
        }
    }

    /// Seeds the buffer with `value`, cursor at the end.
    ///
    /// Non-ASCII characters become `?`; anything past the limit is dropped.
    fn seeded(value: &str, limit: usize) -> Self {
        let mut buffer = Self::with_limit(limit);
        for ch in value.chars() {
            if buffer.len >= buffer.limit {
                break;
            }
            buffer.bytes[buffer.len] = if ch.is_ascii() { ch as u8 } else { b'?' };
            buffer.len += 1;
        }
        buffer.cursor = buffer.len;
        buffer
    }

    fn len(&self) -> usize {
        self.len
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn insert(&mut self, byte: u8) -> bool {
        if self.len >= self.limit {
            return false;
        }
        self.bytes.copy_within(self.cursor..self.len, self.cursor + 1);
        self.bytes[self.cursor] = byte;
        self.len += 1;
        self.cursor += 1;
        true
    }

    /// Deletes the character before the cursor.
    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.bytes.copy_within(self.cursor..self.len, self.cursor - 1);
        self.len -= 1;
        self.cursor -= 1;
    }

    fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len);
    }

    fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..self.len]).unwrap_or("?")
    }

    /// Slice of at most `width` characters that keeps the cursor visible,
    /// plus the cursor column inside it.
    fn window(&self, width: usize) -> (&str, usize) {
        if self.len <= width {
            return (self.as_str(), self.cursor);
        }

        let start = (self.cursor + 2).saturating_sub(width);
        let end = (start + width).min(self.len);
        let text = core::str::from_utf8(&self.bytes[start..end]).unwrap_or("?");
        (text, self.cursor - start)
    }
}
