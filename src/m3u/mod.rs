//! Generic m3u tag representation
//!
//! A playlist is a sequence of `#NAME[:fields]` header lines, each followed
//! by zero or more content lines. This module knows nothing about HLS
//! semantics; it only preserves what was written:
//! - positional fields in `args`, in order
//! - `KEY=VALUE` attributes in `flags`, with `keys` recording first-seen order
//! - whether an attribute value was double-quoted
//! - the content lines following the header

pub mod lex;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use lex::{parse, Lexer};

/// A single field value inside a tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub text: String,
    /// Rendered inside double quotes
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub quoted: bool,
    /// Rendered on its own line. The lexer never sets it; callers building
    /// tags by hand may.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub wrapped: bool,
}

impl Value {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
            wrapped: false,
        }
    }

    pub fn wrapped(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
            wrapped: true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.text)
        } else if self.wrapped {
            write!(f, "\n{}", self.text)
        } else {
            f.write_str(&self.text)
        }
    }
}

/// One `#NAME` header and the content lines that follow it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    /// Attribute names in the order they were first seen. Always the key
    /// set of `flags`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub flags: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set an attribute, appending the key only the first time it is seen.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if !self.flags.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.flags.insert(key, value);
    }

    /// Zero-based positional argument, or "" when absent
    pub fn arg(&self, n: usize) -> &str {
        self.args.get(n).map(|v| v.text.as_str()).unwrap_or("")
    }

    /// Attribute value, or "" when absent
    pub fn flag(&self, key: &str) -> &str {
        self.flags.get(key).map(|v| v.text.as_str()).unwrap_or("")
    }

    /// First content line, or "" when absent
    pub fn line(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or("")
    }

    /// Resolve a wire name to text.
    ///
    /// `""` is the tag's primary value: its first argument, falling back to
    /// the first content line. `$1`..`$5` are positional arguments, `$file`
    /// is the first content line, anything else is an attribute name.
    pub fn value(&self, wire: &str) -> &str {
        match wire {
            "" => match self.args.first() {
                Some(v) => &v.text,
                None => self.line(),
            },
            "$file" => self.line(),
            _ => match positional(wire) {
                Some(n) => self.arg(n),
                None => self.flag(wire),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.args.is_empty() && self.flags.is_empty() && self.lines.is_empty()
    }
}

/// Map `$1`..`$5` to a zero-based argument index.
pub(crate) fn positional(wire: &str) -> Option<usize> {
    let n: usize = wire.strip_prefix('$')?.parse().ok()?;
    (1..=5).contains(&n).then(|| n - 1)
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.name)?;
        let mut sep = ':';
        for v in &self.args {
            write!(f, "{}{}", sep, v)?;
            sep = ',';
        }
        for k in &self.keys {
            if let Some(v) = self.flags.get(k) {
                write!(f, "{}{}={}", sep, k, v)?;
                sep = ',';
            }
        }
        for line in &self.lines {
            write!(f, "\n{}", line)?;
        }
        Ok(())
    }
}
