//! SQL literal encoding for column values
//!
//! Escaping follows the MySQL client library: the rules depend on the
//! session character set and on whether the server runs with
//! `NO_BACKSLASH_ESCAPES`, so they are captured per connection in
//! [`EscapeRules`] and never guessed from the value alone.

use crate::domain::Value;

/// Multibyte encodings whose trail bytes may collide with `\` or `'`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MultiByte {
    None,
    Gbk,
    Gb18030,
    Big5,
    Sjis,
}

impl MultiByte {
    fn for_charset(charset: &str) -> Self {
        match charset.to_ascii_lowercase().as_str() {
            "gbk" | "gb2312" => MultiByte::Gbk,
            "gb18030" => MultiByte::Gb18030,
            "big5" => MultiByte::Big5,
            "sjis" | "cp932" => MultiByte::Sjis,
            _ => MultiByte::None,
        }
    }

    fn is_lead(self, b: u8) -> bool {
        match self {
            MultiByte::None => false,
            MultiByte::Gbk | MultiByte::Gb18030 => (0x81..=0xFE).contains(&b),
            MultiByte::Big5 => (0xA1..=0xF9).contains(&b),
            MultiByte::Sjis => (0x81..=0x9F).contains(&b) || (0xE0..=0xFC).contains(&b),
        }
    }

    /// Length of the well-formed multibyte character at the start of `bytes`
    fn char_len(self, bytes: &[u8]) -> Option<usize> {
        let (&lead, rest) = bytes.split_first()?;
        if !self.is_lead(lead) {
            return None;
        }
        let trail = *rest.first()?;
        let two_byte = match self {
            MultiByte::None => false,
            MultiByte::Gbk | MultiByte::Gb18030 => {
                (0x40..=0x7E).contains(&trail) || (0x80..=0xFE).contains(&trail)
            }
            MultiByte::Big5 => (0x40..=0x7E).contains(&trail) || (0xA1..=0xFE).contains(&trail),
            MultiByte::Sjis => (0x40..=0x7E).contains(&trail) || (0x80..=0xFC).contains(&trail),
        };
        if two_byte {
            return Some(2);
        }
        if self == MultiByte::Gb18030 && (0x30..=0x39).contains(&trail) {
            if let [b3, b4, ..] = &rest[1..] {
                if (0x81..=0xFE).contains(b3) && (0x30..=0x39).contains(b4) {
                    return Some(4);
                }
            }
        }
        None
    }
}

/// Quoting rules of one database session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeRules {
    charset: String,
    multibyte: MultiByte,
    no_backslash_escapes: bool,
}

impl EscapeRules {
    pub fn new(charset: &str, no_backslash_escapes: bool) -> Self {
        Self {
            charset: charset.to_string(),
            multibyte: MultiByte::for_charset(charset),
            no_backslash_escapes,
        }
    }

    /// Build rules from the session's `@@sql_mode` value
    pub fn from_session(charset: &str, sql_mode: &str) -> Self {
        let no_backslash_escapes = sql_mode
            .split(',')
            .any(|mode| mode.trim().eq_ignore_ascii_case("NO_BACKSLASH_ESCAPES"));
        Self::new(charset, no_backslash_escapes)
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn no_backslash_escapes(&self) -> bool {
        self.no_backslash_escapes
    }

    /// Append the escaped form of `bytes` (without surrounding quotes)
    pub fn escape_into(&self, bytes: &[u8], out: &mut Vec<u8>) {
        out.reserve(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if let Some(len) = self.multibyte.char_len(&bytes[i..]) {
                out.extend_from_slice(&bytes[i..i + len]);
                i += len;
                continue;
            }

            let b = bytes[i];
            i += 1;

            if self.no_backslash_escapes {
                if b == b'\'' {
                    out.extend_from_slice(b"''");
                } else {
                    out.push(b);
                }
                continue;
            }

            // A lead byte without a valid trail is escaped so it cannot swallow the next quote
            if self.multibyte.is_lead(b) {
                out.push(b'\\');
                out.push(b);
                continue;
            }

            match b {
                0 => out.extend_from_slice(b"\\0"),
                b'\n' => out.extend_from_slice(b"\\n"),
                b'\r' => out.extend_from_slice(b"\\r"),
                b'\\' => out.extend_from_slice(b"\\\\"),
                b'\'' => out.extend_from_slice(b"\\'"),
                b'"' => out.extend_from_slice(b"\\\""),
                0x1A => out.extend_from_slice(b"\\Z"),
                _ => out.push(b),
            }
        }
    }

    /// Backtick-quote an identifier given as session-charset bytes.
    ///
    /// Embedded backticks are doubled unless they are the trail byte of a
    /// multibyte character.
    pub fn quote_identifier(&self, name: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(name.len() + 2);
        out.push(b'`');
        let mut i = 0;
        while i < name.len() {
            if let Some(len) = self.multibyte.char_len(&name[i..]) {
                out.extend_from_slice(&name[i..i + len]);
                i += len;
                continue;
            }
            if name[i] == b'`' {
                out.push(b'`');
            }
            out.push(name[i]);
            i += 1;
        }
        out.push(b'`');
        out
    }
}

impl Default for EscapeRules {
    fn default() -> Self {
        Self::new("utf8mb4", false)
    }
}

/// Append the SQL literal for `value`: `NULL`, or a quoted escaped string
pub fn encode_value(rules: &EscapeRules, value: &Value, out: &mut Vec<u8>) {
    match value.as_bytes() {
        None => out.extend_from_slice(b"NULL"),
        Some(bytes) => {
            out.push(b'\'');
            rules.escape_into(bytes, out);
            out.push(b'\'');
        }
    }
}
