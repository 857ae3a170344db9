//! Option list splitting for observed statements.
//!
//! Splits the tail of a `CREATE` statement (everything after the object
//! name) into raw `KEY = value` pairs. Values are returned as DDL fragments
//! so the owning property descriptor decides how to parse them.

use crate::error::{Error, Result};
use crate::scanner::Scanner;

/// One option as written in a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOption {
    /// Upper-cased option name
    pub key: String,
    /// Unparsed value fragment
    pub value: String,
}

/// Split an option list such as `WAREHOUSE_SIZE = XSMALL COMMENT = 'x'`.
///
/// Accepts the optional `WITH` keyword, comma separators and the
/// `TAG (k = 'v', ...)` form whose value is the parenthesised group.
pub fn split_options(text: &str) -> Result<Vec<RawOption>> {
    let mut scanner = Scanner::new(text.trim().trim_end_matches(';'));
    let mut options = Vec::new();

    while !scanner.is_done() {
        if scanner.eat_char(',') || scanner.eat_keyword("WITH") {
            continue;
        }

        let key = scanner
            .word()
            .ok_or_else(|| Error::parse("option name", scanner.rest()))?
            .to_ascii_uppercase();

        let value = if key == "TAG" && scanner.peek() == Some('(') {
            scanner.balanced_group()?
        } else {
            scanner.expect_char('=')?;
            scanner.value_token()?
        };

        options.push(RawOption {
            key,
            value: value.to_string(),
        });
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(text: &str) -> Vec<(String, String)> {
        split_options(text)
            .unwrap()
            .into_iter()
            .map(|o| (o.key, o.value))
            .collect()
    }

    #[test]
    fn test_split_simple_options() {
        assert_eq!(
            pairs("warehouse_size = XSMALL AUTO_SUSPEND=60 comment = 'a b'"),
            vec![
                ("WAREHOUSE_SIZE".to_string(), "XSMALL".to_string()),
                ("AUTO_SUSPEND".to_string(), "60".to_string()),
                ("COMMENT".to_string(), "'a b'".to_string()),
            ]
        );
    }

    #[test]
    fn test_split_with_keyword_and_tags() {
        assert_eq!(
            pairs("WITH COMMENT = 'x', TAG (a = '1', b = '2');"),
            vec![
                ("COMMENT".to_string(), "'x'".to_string()),
                ("TAG".to_string(), "(a = '1', b = '2')".to_string()),
            ]
        );
    }

    #[test]
    fn test_split_empty() {
        assert!(split_options("   ").unwrap().is_empty());
    }

    #[test]
    fn test_split_rejects_missing_equals() {
        assert!(split_options("COMMENT 'x'").is_err());
        assert!(split_options("= 1").is_err());
        assert!(split_options("COMMENT =").is_err());
    }
}
