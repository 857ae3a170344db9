//! Object name grammar.
//!
//! Names are either bare words (`letters`, `digits`, `_`, `$`, not starting
//! with a digit) or double-quoted with `""` as the escaped quote. Bare names
//! are case-insensitive and normalise to upper case; a quoted name whose
//! content is already a valid upper-case bare word is the same object as the
//! bare form.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Regex fragment matching one identifier, for anchored statement patterns.
pub const PATTERN: &str = r#"(?:[A-Za-z_][A-Za-z0-9_$]*|"(?:[^"]|"")+")"#;

/// A validated object name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    name: String,
    quoted: bool,
}

impl Identifier {
    fn bare(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            quoted: false,
        }
    }

    fn quoted(inner: String) -> Self {
        if is_bare(&inner) && inner == inner.to_ascii_uppercase() {
            return Self {
                name: inner,
                quoted: false,
            };
        }
        Self {
            name: inner,
            quoted: true,
        }
    }

    /// Parse text that must consist of exactly one identifier.
    pub fn parse(text: &str) -> Result<Self> {
        let (ident, rest) = extract(text)?;
        if !rest.trim().is_empty() {
            return Err(Error::parse("end of identifier", rest.trim_start()));
        }
        Ok(ident)
    }

    /// Build an identifier from a user supplied name.
    ///
    /// Valid identifier text is parsed as such; anything else (for example
    /// `info@example.com`) becomes a quoted identifier with that content.
    pub fn from_name(name: &str) -> Result<Self> {
        if let Ok(ident) = Self::parse(name) {
            return Ok(ident);
        }
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::parse("identifier", name));
        }
        Ok(Self::quoted(trimmed.to_string()))
    }

    /// Identifier for a bare word fixed at compile time, such as a system
    /// object name.
    pub fn from_static(word: &'static str) -> Self {
        debug_assert!(is_bare(word), "{word} is not a bare identifier");
        Self::bare(word)
    }

    /// The normalised name without quoting.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Whether this name needs quotes to be rendered.
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Compare against user supplied name text.
    pub fn matches(&self, name: &str) -> bool {
        Self::from_name(name).is_ok_and(|other| &other == self)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.name.replace('"', "\"\""))
        } else {
            f.write_str(&self.name)
        }
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_name(&raw).map_err(serde::de::Error::custom)
    }
}

/// Whether `s` is a complete bare identifier.
pub fn is_bare(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(is_ident_char),
        _ => false,
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Extract the identifier at the start of `text` (after whitespace).
///
/// Returns the identifier and the remaining input.
pub fn extract(text: &str) -> Result<(Identifier, &str)> {
    let trimmed = text.trim_start();

    if let Some(body) = trimmed.strip_prefix('"') {
        let mut name = String::new();
        let mut chars = body.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c != '"' {
                name.push(c);
                continue;
            }
            if matches!(chars.peek(), Some((_, '"'))) {
                chars.next();
                name.push('"');
                continue;
            }
            if name.is_empty() {
                return Err(Error::parse("non-empty quoted identifier", trimmed));
            }
            return Ok((Identifier::quoted(name), &body[i + 1..]));
        }
        return Err(Error::parse("closing '\"'", trimmed));
    }

    match trimmed.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return Err(Error::parse("identifier", trimmed)),
    }

    let end = trimmed
        .char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map_or(trimmed.len(), |(i, _)| i);

    Ok((Identifier::bare(&trimmed[..end]), &trimmed[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bare() {
        let (ident, rest) = extract("  my_wh SIZE = 1").unwrap();
        assert_eq!(ident.as_str(), "MY_WH");
        assert!(!ident.is_quoted());
        assert_eq!(rest, " SIZE = 1");
    }

    #[test]
    fn test_extract_quoted_with_escape() {
        let (ident, rest) = extract(r#""say ""hi""" rest"#).unwrap();
        assert_eq!(ident.as_str(), r#"say "hi""#);
        assert!(ident.is_quoted());
        assert_eq!(rest, " rest");
        assert_eq!(ident.to_string(), r#""say ""hi""""#);
    }

    #[test]
    fn test_extract_rejects_leading_digit() {
        assert!(matches!(extract("1abc"), Err(Error::Parse { .. })));
        assert!(matches!(extract(""), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_extract_unterminated_quote() {
        assert!(extract(r#""abc"#).is_err());
        assert!(extract(r#""""#).is_err());
    }

    #[test]
    fn test_bare_is_case_insensitive() {
        assert_eq!(Identifier::parse("Analytics").unwrap(), Identifier::parse("ANALYTICS").unwrap());
        assert_eq!(Identifier::parse(r#""ANALYTICS""#).unwrap(), Identifier::parse("analytics").unwrap());
        assert_ne!(Identifier::parse(r#""analytics""#).unwrap(), Identifier::parse("analytics").unwrap());
    }

    #[test]
    fn test_parse_rejects_trailing_text() {
        assert!(Identifier::parse("a b").is_err());
        assert!(Identifier::parse("a.b").is_err());
    }

    #[test]
    fn test_from_name_quotes_unusual_names() {
        let ident = Identifier::from_name("info@example.com").unwrap();
        assert!(ident.is_quoted());
        assert_eq!(ident.to_string(), r#""info@example.com""#);
        assert!(ident.matches(r#""info@example.com""#));
        assert!(Identifier::from_name("   ").is_err());
    }

    #[test]
    fn test_from_static_matches_parse() {
        assert_eq!(Identifier::from_static("public"), Identifier::parse("PUBLIC").unwrap());
        assert!(!Identifier::from_static("SYSADMIN").is_quoted());
    }

    #[test]
    fn test_is_bare() {
        assert!(is_bare("A1_$"));
        assert!(is_bare("_x"));
        assert!(!is_bare("1a"));
        assert!(!is_bare("a-b"));
        assert!(!is_bare(""));
    }

    #[test]
    fn test_serde_as_string() {
        let ident: Identifier = serde_json::from_str("\"sales\"").unwrap();
        assert_eq!(serde_json::to_string(&ident).unwrap(), "\"SALES\"");
    }
}
