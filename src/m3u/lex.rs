//! Line-oriented m3u tokenizer
//!
//! Real-world playlists are frequently a little broken, so the lexer never
//! rejects input. The only error it reports is one from the reader itself.

use std::io::{self, BufRead};

use super::{Tag, Value};

/// Characters stripped when deciding whether an attribute value is empty.
const PADDING: &[char] = &['\t', '=', ',', ' '];

/// Tokenize a whole playlist.
pub fn parse<R: BufRead>(reader: R) -> io::Result<Vec<Tag>> {
    Lexer::new(reader).parse()
}

/// Streaming tokenizer. A tag is only complete once the next header (or
/// the end of input) is reached, since content lines belong to the tag
/// above them.
pub struct Lexer<R> {
    reader: R,
    buf: Vec<u8>,
    pending: Option<Tag>,
}

impl<R: BufRead> Lexer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
            pending: None,
        }
    }

    /// Collect every remaining tag.
    pub fn parse(mut self) -> io::Result<Vec<Tag>> {
        let mut tags = Vec::new();
        while let Some(tag) = self.next_tag()? {
            tags.push(tag);
        }
        Ok(tags)
    }

    /// Return the next complete tag, or `None` at end of input.
    pub fn next_tag(&mut self) -> io::Result<Option<Tag>> {
        while self.read_line()? {
            let text = String::from_utf8_lossy(&self.buf);
            let line = text.trim_start_matches(&[' ', '\t'][..]);
            if let Some(header) = line.strip_prefix('#') {
                if let Some(done) = self.pending.replace(lex_tag(header)) {
                    return Ok(Some(done));
                }
            } else if !line.is_empty() {
                match self.pending.as_mut() {
                    Some(tag) => tag.lines.push(line.to_string()),
                    None => tracing::trace!(line, "content line before first tag dropped"),
                }
            }
        }
        Ok(self.pending.take())
    }

    fn read_line(&mut self) -> io::Result<bool> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(false);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        Ok(true)
    }
}

impl<R: BufRead> Iterator for Lexer<R> {
    type Item = io::Result<Tag>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_tag().transpose()
    }
}

/// Lex a header line with the leading `#` already removed.
fn lex_tag(header: &str) -> Tag {
    match header.split_once(':') {
        Some((name, fields)) => {
            let mut tag = Tag::new(name);
            lex_fields(fields, &mut tag);
            tag
        }
        None => Tag::new(header),
    }
}

/// Split the comma separated field list of a tag.
///
/// Fields are read as `KEY=VALUE` only until the first keyless field. After
/// that every field is positional, because trailing URLs and base64 blobs
/// routinely contain `=`.
fn lex_fields(mut s: &str, tag: &mut Tag) {
    let mut keyed = true;
    while !s.is_empty() {
        let stop = if keyed {
            s.find(|c: char| c == ',' || c == '=')
        } else {
            s.find(',')
        };
        let rest = match stop {
            Some(i) if s.as_bytes()[i] == b'=' => {
                let key = &s[..i];
                let (value, quoted, rest) = attr_value(&s[i + 1..]);
                if value.trim_matches(PADDING).is_empty() {
                    // base64 padding, not an attribute
                    tag.args.push(Value::new(format!("{}={}", key, value)));
                    keyed = false;
                } else {
                    tag.insert(
                        key,
                        Value {
                            text: value.to_string(),
                            quoted,
                            wrapped: false,
                        },
                    );
                }
                rest
            }
            Some(i) => {
                tag.args.push(Value::new(&s[..i]));
                keyed = false;
                &s[i..]
            }
            None => {
                tag.args.push(Value::new(s));
                keyed = false;
                ""
            }
        };
        match rest.strip_prefix(',') {
            Some(next) => s = next,
            None => break,
        }
    }
}

/// Read an attribute value. Returns the value, whether it was quoted, and
/// the unread remainder starting at the separator.
fn attr_value(s: &str) -> (&str, bool, &str) {
    if let Some(inner) = s.strip_prefix('"') {
        match inner.find('"') {
            Some(end) => (&inner[..end], true, &inner[end + 1..]),
            None => (inner, true, ""),
        }
    } else {
        match s.find(',') {
            Some(end) => (&s[..end], false, &s[end..]),
            None => (s, false, ""),
        }
    }
}
