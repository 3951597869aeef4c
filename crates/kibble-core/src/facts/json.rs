//! Pulls fact strings out of the API response body.
//!
//! Only the `topics[].facts[].content` path is read; every other value is
//! walked over without being stored.

use heapless::String;
use log::debug;

use super::{Fact, FactList, FetchError};

const MAX_DEPTH: usize = 24;
const KEY_BYTES: usize = 16;

/// Collects every non-empty `content` string, in document order.
///
/// Escapes are decoded and characters outside ASCII become `?`, since the
/// matrix fonts only cover printable ASCII. Facts beyond [`super::MAX_FACTS`]
/// and characters beyond [`super::FACT_BYTES`] are dropped.
///
/// A body that stops mid-document still yields the facts completed before
/// the cut. Malformed input anywhere else is a parse error.
pub fn extract_facts(body: &[u8]) -> Result<FactList, FetchError> {
    let mut cursor = Cursor { bytes: body, pos: 0 };
    let mut facts = FactList::new();

    cursor.skip_ws();
    let walked = if cursor.peek() == Some(b'{') {
        cursor.for_each_member(0, |c, key, depth| {
            if key == "topics" && c.peek() == Some(b'[') {
                c.for_each_element(depth, |c, depth| collect_topic(c, depth, &mut facts))
            } else {
                c.skip_value(depth)
            }
        })
    } else {
        cursor.skip_value(0)
    };

    match walked {
        Ok(()) => {}
        Err(FetchError::Parse) if cursor.at_end() && !facts.is_empty() => {
            debug!(
                "facts: body ends mid-document after {} bytes, keeping {} facts",
                body.len(),
                facts.len()
            );
            return Ok(facts);
        }
        Err(err) => return Err(err),
    }

    cursor.skip_ws();
    if cursor.peek().is_some() {
        debug!("facts: trailing bytes after payload at {}", cursor.pos);
    }

    if facts.is_empty() {
        return Err(FetchError::Empty);
    }
    Ok(facts)
}

fn collect_topic(c: &mut Cursor<'_>, depth: usize, facts: &mut FactList) -> Result<(), FetchError> {
    if c.peek() != Some(b'{') {
        return c.skip_value(depth);
    }

    c.for_each_member(depth, |c, key, depth| {
        if key == "facts" && c.peek() == Some(b'[') {
            c.for_each_element(depth, |c, depth| collect_fact(c, depth, facts))
        } else {
            c.skip_value(depth)
        }
    })
}

fn collect_fact(c: &mut Cursor<'_>, depth: usize, facts: &mut FactList) -> Result<(), FetchError> {
    if c.peek() != Some(b'{') {
        return c.skip_value(depth);
    }

    c.for_each_member(depth, |c, key, depth| {
        if key != "content" || c.peek() != Some(b'"') {
            return c.skip_value(depth);
        }

        let mut fact = Fact::new();
        c.read_string(&mut fact)?;
        if fact.is_empty() {
            return Ok(());
        }
        if facts.push(fact).is_err() {
            debug!("facts: list full, dropping extra facts");
        }
        Ok(())
    })
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn bump(&mut self) -> Result<u8, FetchError> {
        let byte = self.peek().ok_or(FetchError::Parse)?;
        self.pos += 1;
        Ok(byte)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), FetchError> {
        self.skip_ws();
        if self.bump()? == byte {
            Ok(())
        } else {
            Err(FetchError::Parse)
        }
    }

    /// Calls `f` with the cursor on each member value of an object.
    ///
    /// `f` must consume the value.
    fn for_each_member<F>(&mut self, depth: usize, mut f: F) -> Result<(), FetchError>
    where
        F: FnMut(&mut Self, &str, usize) -> Result<(), FetchError>,
    {
        if depth >= MAX_DEPTH {
            return Err(FetchError::Parse);
        }
        self.expect(b'{')?;
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(());
        }

        loop {
            self.skip_ws();
            if self.peek() != Some(b'"') {
                return Err(FetchError::Parse);
            }
            let mut key = String::<KEY_BYTES>::new();
            self.read_string(&mut key)?;
            self.expect(b':')?;
            self.skip_ws();
            f(self, key.as_str(), depth + 1)?;

            self.skip_ws();
            match self.bump()? {
                b',' => continue,
                b'}' => return Ok(()),
                _ => return Err(FetchError::Parse),
            }
        }
    }

    /// Calls `f` with the cursor on each element of an array.
    fn for_each_element<F>(&mut self, depth: usize, mut f: F) -> Result<(), FetchError>
    where
        F: FnMut(&mut Self, usize) -> Result<(), FetchError>,
    {
        if depth >= MAX_DEPTH {
            return Err(FetchError::Parse);
        }
        self.expect(b'[')?;
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(());
        }

        loop {
            self.skip_ws();
            f(self, depth + 1)?;

            self.skip_ws();
            match self.bump()? {
                b',' => continue,
                b']' => return Ok(()),
                _ => return Err(FetchError::Parse),
            }
        }
    }

    fn skip_value(&mut self, depth: usize) -> Result<(), FetchError> {
        self.skip_ws();
        match self.peek().ok_or(FetchError::Parse)? {
            b'{' => self.for_each_member(depth, |c, _, depth| c.skip_value(depth)),
            b'[' => self.for_each_element(depth, |c, depth| c.skip_value(depth)),
            b'"' => self.read_string(&mut String::<0>::new()),
            b't' => self.literal(b"true"),
            b'f' => self.literal(b"false"),
            b'n' => self.literal(b"null"),
            b'-' | b'0'..=b'9' => {
                while matches!(
                    self.peek(),
                    Some(b'-' | b'+' | b'.' | b'e' | b'E' | b'0'..=b'9')
                ) {
                    self.pos += 1;
                }
                Ok(())
            }
            _ => Err(FetchError::Parse),
        }
    }

    fn literal(&mut self, word: &[u8]) -> Result<(), FetchError> {
        let end = self.pos + word.len();
        if self.bytes.get(self.pos..end) == Some(word) {
            self.pos = end;
            return Ok(());
        }

        let rest = &self.bytes[self.pos..];
        if rest.len() < word.len() && word.starts_with(rest) {
            self.pos = self.bytes.len();
        }
        Err(FetchError::Parse)
    }

    /// Decodes a string literal into `out`, dropping what does not fit.
    fn read_string<const N: usize>(&mut self, out: &mut String<N>) -> Result<(), FetchError> {
        if self.bump()? != b'"' {
            return Err(FetchError::Parse);
        }

        loop {
            let ch = match self.bump()? {
                b'"' => return Ok(()),
                b'\\' => self.read_escape()?,
                byte if byte < 0x20 => return Err(FetchError::Parse),
                byte if byte < 0x80 => byte as char,
                // Continuation bytes belong to the lead byte already replaced.
                0x80..=0xBF => continue,
                _ => '?',
            };
            let _ = out.push(ch);
        }
    }

    fn read_escape(&mut self) -> Result<char, FetchError> {
        let ch = match self.bump()? {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' | b'f' => ' ',
            b'n' | b'r' | b't' => ' ',
            b'u' => {
                let unit = self.read_hex4()?;
                let low_follows = self.bytes.get(self.pos..self.pos + 2) == Some(&b"\\u"[..]);
                if (0xD800..0xDC00).contains(&unit) && low_follows {
                    // Surrogate pair: one character, one replacement.
                    self.pos += 2;
                    self.read_hex4()?;
                    '?'
                } else if (0x20..0x7F).contains(&unit) {
                    unit as u8 as char
                } else if unit < 0x20 {
                    ' '
                } else {
                    '?'
                }
            }
            _ => return Err(FetchError::Parse),
        };
        Ok(ch)
    }

    fn read_hex4(&mut self) -> Result<u16, FetchError> {
        let mut value = 0u16;
        for _ in 0..4 {
            let digit = match self.bump()? {
                byte @ b'0'..=b'9' => byte - b'0',
                byte @ b'a'..=b'f' => byte - b'a' + 10,
                byte @ b'A'..=b'F' => byte - b'A' + 10,
                _ => return Err(FetchError::Parse),
            };
            value = (value << 4) | digit as u16;
        }
        Ok(value)
    }
}
