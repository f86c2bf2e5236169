//! Line scanner for key-file text.
//!
//! Turns a buffer into a stream of [`Scanned`] tokens (comment, section
//! header, key/value pair), each tagged with its 1-based starting line.
//! Blank lines are dropped here. A token may span several physical lines:
//!
//! - a quoted value runs until its closing `"`, line breaks included;
//! - an unquoted value ending in `\` continues on the next line, the pieces
//!   joined with `\n`. A blank line, a `[section]` line or the end of input
//!   stops the continuation and the `\` stays part of the value. Any other
//!   line is taken as continuation text, even one that looks like
//!   `key = value`.
//!
//! In an unquoted value, a comment marker preceded by whitespace starts an
//! inline comment that runs to the end of the line. A marker glued to the
//! preceding text (`color = #fff`, `a#b`) is literal. Inside quotes the
//! marker is always literal.
//!
//! The scanner knows nothing about groups; attaching entries and comments to
//! their section is the parser's job.

use std::iter::{Enumerate, Peekable};
use std::str::Lines;

use crate::error::ParseReason;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// Full-line comment, text after the marker.
    Comment(String),
    /// `[name]`, trimmed name.
    Section(String),
    Pair {
        key: String,
        value: String,
        quoted: bool,
        inline_comment: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Scanned {
    pub line: usize,
    pub token: Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScanError {
    pub line: usize,
    pub reason: ParseReason,
}

pub(crate) struct Scanner<'a> {
    lines: Peekable<Enumerate<Lines<'a>>>,
    delimiter: char,
    comment: char,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str, delimiter: char, comment: char) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Self {
            lines: text.lines().enumerate().peekable(),
            delimiter,
            comment,
        }
    }

    fn section(&self, line: usize, text: &str) -> Result<Token, ScanError> {
        let err = |reason| ScanError { line, reason };
        let close = text.find(']').ok_or(err(ParseReason::MissingBracket))?;
        let name = text[1..close].trim();
        if name.is_empty() {
            return Err(err(ParseReason::EmptySectionName));
        }
        let rest = text[close + 1..].trim();
        if !rest.is_empty() && !rest.starts_with(self.comment) {
            return Err(err(ParseReason::TextAfterSection));
        }
        Ok(Token::Section(name.to_string()))
    }

    fn pair(&mut self, line: usize, text: &str) -> Result<Token, ScanError> {
        let err = |reason| ScanError { line, reason };
        let (raw_key, rest) = split_unescaped(text, self.delimiter)
            .ok_or(err(ParseReason::MissingDelimiter))?;
        let key = unescape_key(raw_key.trim(), self.delimiter);
        if key.is_empty() {
            return Err(err(ParseReason::EmptyKey));
        }
        let value = rest.trim();
        if value.is_empty() {
            return Err(err(ParseReason::KeyHasNullValue));
        }

        if let Some(opened) = value.strip_prefix('"') {
            let (inner, after) = self.quoted_value(line, opened)?;
            let after = after.trim();
            let inline_comment = if after.is_empty() {
                None
            } else if let Some(c) = after.strip_prefix(self.comment) {
                Some(c.to_string())
            } else {
                return Err(err(ParseReason::TextAfterValue));
            };
            return Ok(Token::Pair {
                key,
                value: unescape_quoted(&inner),
                quoted: true,
                inline_comment,
            });
        }

        let (first, note) = split_comment(value, self.comment);
        let mut value = first.to_string();
        let mut notes: Vec<&str> = note.into_iter().collect();
        while value.ends_with('\\') {
            let Some((_, next)) = self.lines.next_if(|(_, l)| continues_value(l)) else {
                break;
            };
            value.pop();
            let kept = value.trim_end().len();
            value.truncate(kept);
            value.push('\n');
            let (text, note) = split_comment(next.trim(), self.comment);
            value.push_str(text);
            notes.extend(note);
        }
        Ok(Token::Pair {
            key,
            value,
            quoted: false,
            inline_comment: (!notes.is_empty()).then(|| notes.join("\n")),
        })
    }

    /// Collect a quoted value, pulling further lines until the closing quote.
    /// Returns the raw (still escaped) inner text and whatever follows the
    /// closing quote.
    fn quoted_value(&mut self, line: usize, opened: &str) -> Result<(String, String), ScanError> {
        let mut buf = opened.to_string();
        loop {
            if let Some(close) = find_closing_quote(&buf) {
                let after = buf[close + 1..].to_string();
                buf.truncate(close);
                return Ok((buf, after));
            }
            let Some((_, next)) = self.lines.next() else {
                return Err(ScanError {
                    line,
                    reason: ParseReason::UnterminatedQuote,
                });
            };
            buf.push('\n');
            buf.push_str(next);
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Scanned, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (idx, raw) = self.lines.next()?;
            let line = idx + 1;
            let text = raw.trim();
            if text.is_empty() {
                continue;
            }
            let token = if let Some(c) = text.strip_prefix(self.comment) {
                Ok(Token::Comment(c.to_string()))
            } else if text.starts_with('[') {
                self.section(line, text)
            } else {
                self.pair(line, text)
            };
            return Some(token.map(|token| Scanned { line, token }));
        }
    }
}

fn is_delimiter(c: char, delimiter: char) -> bool {
    if delimiter.is_whitespace() {
        c.is_whitespace()
    } else {
        c == delimiter
    }
}

fn continues_value(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty() && !t.starts_with('[')
}

/// Split an unquoted value at the first comment marker that follows
/// whitespace. Returns the value (trimmed) and the comment text after the
/// marker.
fn split_comment(text: &str, comment: char) -> (&str, Option<&str>) {
    let mut after_blank = false;
    for (i, c) in text.char_indices() {
        if c == comment && after_blank {
            return (text[..i].trim_end(), Some(&text[i + c.len_utf8()..]));
        }
        after_blank = c.is_whitespace();
    }
    (text, None)
}

/// True if `value` written without quotes would not read back unchanged.
pub(crate) fn needs_quotes(value: &str, comment: char) -> bool {
    value.is_empty()
        || value.starts_with('"')
        || value.split('\n').enumerate().any(|(i, line)| {
            line.is_empty()
                || line.trim() != line
                || line.ends_with('\\')
                || (i > 0 && line.starts_with('['))
                || split_comment(line, comment).1.is_some()
        })
}

/// Split at the first delimiter not preceded by a backslash.
fn split_unescaped(text: &str, delimiter: char) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
        } else if is_delimiter(c, delimiter) {
            return Some((&text[..i], &text[i + c.len_utf8()..]));
        }
    }
    None
}

fn find_closing_quote(text: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            return Some(i);
        }
    }
    None
}

fn unescape_key(raw: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && (next == '\\' || is_delimiter(next, delimiter))
        {
            out.push(next);
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}

/// Escape backslashes and delimiter characters inside a key.
pub(crate) fn escape_key(key: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        if c == '\\' || is_delimiter(c, delimiter) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Resolve `\n`, `\t`, `\\` and `\"` inside a quoted value. Unknown escapes
/// are kept verbatim.
pub(crate) fn unescape_quoted(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Inverse of [`unescape_quoted`].
pub(crate) fn escape_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}
