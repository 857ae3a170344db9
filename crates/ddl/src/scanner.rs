//! Cursor over DDL text.
//!
//! A small hand-written scanner shared by the property parsers and the
//! statement option splitter. Keywords match case-insensitively and only at
//! word boundaries.

use crate::error::{Error, Result};
use crate::identifier::{self, Identifier};

/// Position-tracking reader over a statement fragment.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Unconsumed input.
    pub fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// True once only whitespace remains.
    pub fn is_done(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.input.len()
    }

    pub fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.rest().chars().next()
    }

    /// Consume `c` if it is the next non-whitespace character.
    pub fn eat_char(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn expect_char(&mut self, c: char) -> Result<()> {
        if self.eat_char(c) {
            Ok(())
        } else {
            Err(Error::parse(format!("'{c}'"), self.rest()))
        }
    }

    /// Consume a (possibly multi-word) keyword such as `IF NOT EXISTS`.
    ///
    /// Leaves the scanner untouched when the keyword does not match.
    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        let start = self.pos;
        for word in keyword.split_whitespace() {
            self.skip_whitespace();
            let rest = self.rest();
            let matched = rest.len() >= word.len()
                && rest.is_char_boundary(word.len())
                && rest[..word.len()].eq_ignore_ascii_case(word)
                && !rest[word.len()..].starts_with(is_word_char);
            if !matched {
                self.pos = start;
                return false;
            }
            self.pos += word.len();
        }
        true
    }

    pub fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(Error::parse(keyword, self.rest().trim_start()))
        }
    }

    /// Consume a run of word characters (letters, digits, `_`, `$`).
    pub fn word(&mut self) -> Option<&'a str> {
        self.skip_whitespace();
        let rest = self.rest();
        let end = rest.find(|c: char| !is_word_char(c)).unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        self.pos += end;
        Some(&rest[..end])
    }

    pub fn identifier(&mut self) -> Result<Identifier> {
        let rest = self.rest();
        let (ident, remaining) = identifier::extract(rest)?;
        self.pos += rest.len() - remaining.len();
        Ok(ident)
    }

    /// Consume a single-quoted string literal and return the raw fragment,
    /// quotes included.
    pub fn raw_string_literal(&mut self) -> Result<&'a str> {
        self.skip_whitespace();
        let rest = self.rest();
        let end = string_literal_end(rest)?;
        self.pos += end;
        Ok(&rest[..end])
    }

    /// Consume a single-quoted string literal and return its unescaped value.
    pub fn string_literal(&mut self) -> Result<String> {
        let raw = self.raw_string_literal()?;
        Ok(unescape_string(raw))
    }

    /// Consume a parenthesised group, returning it with its parentheses.
    ///
    /// Parentheses inside string literals are ignored.
    pub fn balanced_group(&mut self) -> Result<&'a str> {
        self.skip_whitespace();
        let rest = self.rest();
        if !rest.starts_with('(') {
            return Err(Error::parse("'('", rest));
        }

        let mut depth = 0usize;
        let mut i = 0;
        while i < rest.len() {
            let c = rest[i..].chars().next().unwrap_or_default();
            match c {
                '\'' => {
                    i += string_literal_end(&rest[i..])?;
                    continue;
                }
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += i + 1;
                        return Ok(&rest[..=i]);
                    }
                }
                _ => {}
            }
            i += c.len_utf8();
        }
        Err(Error::parse("')'", rest))
    }

    /// Consume one value token: a string literal, a parenthesised group, a
    /// quoted identifier, or a bare run up to whitespace, `,` or `)`.
    pub fn value_token(&mut self) -> Result<&'a str> {
        match self.peek() {
            Some('\'') => self.raw_string_literal(),
            Some('(') => self.balanced_group(),
            Some('"') => {
                let rest = self.rest();
                let (_, remaining) = identifier::extract(rest)?;
                let len = rest.len() - remaining.len();
                self.pos += len;
                Ok(&rest[..len])
            }
            Some(_) => {
                let rest = self.rest();
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == ',' || c == ')')
                    .unwrap_or(rest.len());
                if end == 0 {
                    return Err(Error::parse("value", rest));
                }
                self.pos += end;
                Ok(&rest[..end])
            }
            None => Err(Error::parse("value", "")),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Byte length of the string literal at the start of `text`.
fn string_literal_end(text: &str) -> Result<usize> {
    if !text.starts_with('\'') {
        return Err(Error::parse("string literal", text));
    }

    let mut chars = text.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '\'' => {
                if matches!(chars.peek(), Some((_, '\''))) {
                    chars.next();
                    continue;
                }
                return Ok(i + 1);
            }
            _ => {}
        }
    }
    Err(Error::parse("closing quote", text))
}

/// Strip the quotes from a string literal and resolve its escapes.
pub fn unescape_string(raw: &str) -> String {
    let inner = raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(raw);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                out.push('\'');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Render a string as a single-quoted literal.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}
