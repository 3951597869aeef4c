use super::{InputProvider, Key};

/// Input source for boards without a keyboard attached.
#[derive(Default, Debug, Clone, Copy)]
pub struct MockInput;

impl MockInput {
    pub const fn new() -> Self {
        Self
    }
}

impl InputProvider for MockInput {
    type Error = core::convert::Infallible;

    fn poll_key(&mut self) -> Result<Option<Key>, Self::Error> {
        Ok(None)
    }
}

/// Replays a fixed key sequence, one key per poll, then reports no key.
#[derive(Debug, Clone)]
pub struct ScriptedInput<'a> {
    keys: &'a [Key],
    cursor: usize,
}

impl<'a> ScriptedInput<'a> {
    pub const fn new(keys: &'a [Key]) -> Self {
        Self { keys, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.keys.len().saturating_sub(self.cursor)
    }
}

impl InputProvider for ScriptedInput<'_> {
    type Error = core::convert::Infallible;

    fn poll_key(&mut self) -> Result<Option<Key>, Self::Error> {
        let Some(key) = self.keys.get(self.cursor).copied() else {
            return Ok(None);
        };
        self.cursor = self.cursor.saturating_add(1);
        Ok(Some(key))
    }
}
