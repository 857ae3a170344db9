//! Typed property descriptors.
//!
//! A [`Prop`] names one statement option and knows how to render a value
//! into DDL, parse a DDL fragment back into a value, and coerce a loosely
//! typed record value (JSON/TOML) at construction time. Resource kinds
//! declare their options as an ordered list of descriptors; rendering walks
//! that list so output order never depends on how a value was supplied.

use crate::enums::{self, ParsableEnum};
use crate::error::{Error, Result};
use crate::identifier::Identifier;
use crate::scanner::{self, Scanner};
use serde::Serialize;
use serde_json::Value;

/// A typed property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PropValue {
    /// Explicit SQL `NULL` (only for nullable properties)
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    /// Canonical spelling of an enum variant
    Enum(&'static str),
    Ident(Identifier),
    Tags(Tags),
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Enum(s) => Some(s),
            Self::Ident(ident) => Some(ident.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl<E: ParsableEnum> From<E> for PropValue {
    fn from(variant: E) -> Self {
        Self::Enum(variant.as_str())
    }
}

/// Ordered `key = 'value'` tag assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tags(Vec<(Identifier, String)>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a tag, replacing an existing assignment in place.
    pub fn insert(&mut self, key: Identifier, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.matches(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &str)> {
        self.0.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Whether every assignment here also holds in `other`.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.0
            .iter()
            .all(|(key, value)| other.0.iter().any(|(k, v)| k == key && v == value))
    }

    /// Apply `other`'s assignments on top of these.
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in &other.0 {
            self.insert(key.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn render(&self) -> String {
        let pairs: Vec<String> = self
            .0
            .iter()
            .map(|(k, v)| format!("{k} = {}", scanner::quote_string(v)))
            .collect();
        format!("({})", pairs.join(", "))
    }

    fn parse(fragment: &str) -> Result<Self> {
        let mut scanner = Scanner::new(fragment);
        let mut tags = Tags::new();
        scanner.expect_char('(')?;
        if !scanner.eat_char(')') {
            loop {
                let key = scanner.identifier()?;
                scanner.expect_char('=')?;
                let value = scanner.string_literal()?;
                tags.insert(key, value);
                if scanner.eat_char(',') {
                    continue;
                }
                scanner.expect_char(')')?;
                break;
            }
        }
        if !scanner.is_done() {
            return Err(Error::parse("end of tag list", scanner.rest()));
        }
        Ok(tags)
    }
}

/// Value shape of a property.
#[derive(Debug, Clone, Copy)]
pub enum PropKind {
    /// Single-quoted string literal; case-insensitive strings are stored
    /// upper-cased
    String { case_insensitive: bool },
    /// Integer, optionally accepting `NULL`
    Int { nullable: bool },
    Bool,
    /// One variant of a closed enum domain
    Enum {
        domain: &'static str,
        parse: fn(&str) -> Result<&'static str>,
    },
    Identifier,
    /// Parenthesised tag assignments rendered as `TAG (k = 'v', ...)`
    Tags,
}

/// A named, typed statement option.
#[derive(Debug, Clone, Copy)]
pub struct Prop {
    pub name: &'static str,
    pub kind: PropKind,
}

impl Prop {
    pub const fn string(name: &'static str) -> Self {
        Self {
            name,
            kind: PropKind::String {
                case_insensitive: false,
            },
        }
    }

    /// String compared without regard to case (e.g. login names).
    pub const fn upper_string(name: &'static str) -> Self {
        Self {
            name,
            kind: PropKind::String {
                case_insensitive: true,
            },
        }
    }

    pub const fn int(name: &'static str) -> Self {
        Self {
            name,
            kind: PropKind::Int { nullable: false },
        }
    }

    pub const fn nullable_int(name: &'static str) -> Self {
        Self {
            name,
            kind: PropKind::Int { nullable: true },
        }
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self {
            name,
            kind: PropKind::Bool,
        }
    }

    pub const fn enumeration<E: ParsableEnum>(name: &'static str) -> Self {
        Self {
            name,
            kind: PropKind::Enum {
                domain: E::DOMAIN,
                parse: enums::canonical::<E>,
            },
        }
    }

    pub const fn identifier(name: &'static str) -> Self {
        Self {
            name,
            kind: PropKind::Identifier,
        }
    }

    pub const fn tags() -> Self {
        Self {
            name: "TAG",
            kind: PropKind::Tags,
        }
    }

    /// Render `NAME = value`, or nothing when the value is absent.
    ///
    /// An empty tag list is also omitted.
    pub fn render(&self, value: Option<&PropValue>) -> Option<String> {
        let value = value?;
        if let PropValue::Tags(tags) = value {
            if tags.is_empty() {
                return None;
            }
            return Some(format!("{} {}", self.name, tags.render()));
        }
        Some(format!("{} = {}", self.name, self.render_value(value)))
    }

    /// Render only the value part of the option.
    pub fn render_value(&self, value: &PropValue) -> String {
        match value {
            PropValue::Null => "NULL".to_string(),
            PropValue::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            PropValue::Int(n) => n.to_string(),
            PropValue::Str(s) => scanner::quote_string(s),
            PropValue::Enum(variant) => {
                if crate::identifier::is_bare(variant) {
                    (*variant).to_string()
                } else {
                    scanner::quote_string(variant)
                }
            }
            PropValue::Ident(ident) => ident.to_string(),
            PropValue::Tags(tags) => tags.render(),
        }
    }

    /// Parse the value part of an option as rendered in DDL.
    pub fn parse(&self, fragment: &str) -> Result<PropValue> {
        let fragment = fragment.trim();
        match self.kind {
            PropKind::String { case_insensitive } => {
                let mut scanner = Scanner::new(fragment);
                let value = scanner.string_literal()?;
                if !scanner.is_done() {
                    return Err(Error::parse("end of string", scanner.rest()));
                }
                Ok(PropValue::Str(self.fold_case(value, case_insensitive)))
            }
            PropKind::Int { nullable } => {
                if nullable && fragment.eq_ignore_ascii_case("NULL") {
                    return Ok(PropValue::Null);
                }
                fragment
                    .parse::<i64>()
                    .map(PropValue::Int)
                    .map_err(|_| Error::parse(format!("integer for {}", self.name), fragment))
            }
            PropKind::Bool => {
                if fragment.eq_ignore_ascii_case("TRUE") {
                    Ok(PropValue::Bool(true))
                } else if fragment.eq_ignore_ascii_case("FALSE") {
                    Ok(PropValue::Bool(false))
                } else {
                    Err(Error::parse(format!("TRUE or FALSE for {}", self.name), fragment))
                }
            }
            PropKind::Enum { parse, .. } => {
                let raw = if fragment.starts_with('\'') {
                    scanner::unescape_string(fragment)
                } else {
                    fragment.to_string()
                };
                parse(&raw).map(PropValue::Enum)
            }
            PropKind::Identifier => Identifier::parse(fragment).map(PropValue::Ident),
            PropKind::Tags => Tags::parse(fragment).map(PropValue::Tags),
        }
    }

    /// Coerce a record value (as found in JSON or TOML definitions).
    ///
    /// JSON `null` is accepted only by nullable integers; strings are
    /// accepted for booleans and integers when they parse cleanly.
    pub fn coerce(&self, value: &Value) -> Result<PropValue> {
        match (self.kind, value) {
            (PropKind::Int { nullable: true }, Value::Null) => Ok(PropValue::Null),
            (_, Value::Null) => Err(Error::invalid_value(self.name, "null is not allowed")),
            (PropKind::String { case_insensitive }, Value::String(s)) => {
                Ok(PropValue::Str(self.fold_case(s.clone(), case_insensitive)))
            }
            (PropKind::Int { .. }, Value::Number(n)) => n
                .as_i64()
                .map(PropValue::Int)
                .ok_or_else(|| Error::invalid_value(self.name, format!("{n} is not an integer"))),
            (PropKind::Int { .. } | PropKind::Bool, Value::String(s)) => self.parse(s),
            (PropKind::Bool, Value::Bool(b)) => Ok(PropValue::Bool(*b)),
            (PropKind::Enum { parse, .. }, Value::String(s)) => parse(s).map(PropValue::Enum),
            (PropKind::Identifier, Value::String(s)) => {
                Identifier::from_name(s).map(PropValue::Ident)
            }
            (PropKind::Tags, Value::Object(map)) => {
                let mut tags = Tags::new();
                for (key, value) in map {
                    let Value::String(value) = value else {
                        return Err(Error::invalid_value(self.name, format!("tag {key} must be a string")));
                    };
                    tags.insert(Identifier::from_name(key)?, value.clone());
                }
                Ok(PropValue::Tags(tags))
            }
            (kind, other) => Err(Error::invalid_value(
                self.name,
                format!("expected {}, got {other}", kind_label(kind)),
            )),
        }
    }

    fn fold_case(&self, value: String, case_insensitive: bool) -> String {
        if case_insensitive {
            value.to_uppercase()
        } else {
            value
        }
    }
}

fn kind_label(kind: PropKind) -> &'static str {
    match kind {
        PropKind::String { .. } => "a string",
        PropKind::Int { .. } => "an integer",
        PropKind::Bool => "a boolean",
        PropKind::Enum { domain, .. } => domain,
        PropKind::Identifier => "a name",
        PropKind::Tags => "a table of tags",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    crate::parsable_enum! {
        enum Size("warehouse size") {
            XSmall => "XSMALL",
            Small => "SMALL",
        }
    }

    crate::parsable_enum! {
        enum Kind("warehouse type") {
            Standard => "STANDARD",
            SnowparkOptimized => "SNOWPARK-OPTIMIZED",
        }
    }

    #[test]
    fn test_render_absent_is_omitted() {
        assert_eq!(Prop::string("COMMENT").render(None), None);
        assert_eq!(Prop::tags().render(Some(&PropValue::Tags(Tags::new()))), None);
    }

    #[test]
    fn test_render_null_only_when_explicit() {
        let prop = Prop::nullable_int("AUTO_SUSPEND");
        assert_eq!(prop.render(Some(&PropValue::Null)).unwrap(), "AUTO_SUSPEND = NULL");
        assert_eq!(prop.parse("null").unwrap(), PropValue::Null);
        assert!(Prop::int("MAX_CLUSTER_COUNT").parse("NULL").is_err());
    }

    #[test]
    fn test_string_quotes_and_escapes() {
        let prop = Prop::string("COMMENT");
        let value = PropValue::Str("Bob's warehouse".to_string());
        let rendered = prop.render(Some(&value)).unwrap();
        assert_eq!(rendered, r"COMMENT = 'Bob\'s warehouse'");
        assert_eq!(prop.parse(r"'Bob\'s warehouse'").unwrap(), value);
        assert_eq!(prop.parse("'Bob''s warehouse'").unwrap(), value);
        assert!(prop.parse("unquoted").is_err());
    }

    #[test]
    fn test_int_rejects_non_integers() {
        let prop = Prop::int("MAX_CLUSTER_COUNT");
        assert_eq!(prop.parse("3").unwrap(), PropValue::Int(3));
        assert!(prop.parse("three").is_err());
        assert!(prop.coerce(&json!(1.5)).is_err());
        assert_eq!(prop.coerce(&json!("4")).unwrap(), PropValue::Int(4));
    }

    #[test]
    fn test_enum_delegates_to_domain() {
        let prop = Prop::enumeration::<Size>("WAREHOUSE_SIZE");
        assert_eq!(prop.parse("small").unwrap(), PropValue::Enum("SMALL"));
        assert_eq!(prop.coerce(&json!("x-small")).unwrap_err(), Error::InvalidEnumValue {
            domain: "warehouse size",
            value: "x-small".to_string(),
        });
    }

    #[test]
    fn test_enum_with_separator_renders_quoted() {
        let prop = Prop::enumeration::<Kind>("WAREHOUSE_TYPE");
        let value = prop.coerce(&json!("snowpark optimized")).unwrap();
        assert_eq!(prop.render(Some(&value)).unwrap(), "WAREHOUSE_TYPE = 'SNOWPARK-OPTIMIZED'");
        assert_eq!(prop.parse("'SNOWPARK-OPTIMIZED'").unwrap(), value);
        assert_eq!(prop.parse("SNOWPARK-OPTIMIZED").unwrap(), value);
    }

    #[test]
    fn test_bool_parse() {
        let prop = Prop::boolean("AUTO_RESUME");
        assert_eq!(prop.parse("true").unwrap(), PropValue::Bool(true));
        assert_eq!(prop.parse("FALSE").unwrap(), PropValue::Bool(false));
        assert!(prop.parse("yes").is_err());
    }

    #[test]
    fn test_upper_string_folds_case() {
        let prop = Prop::upper_string("LOGIN_NAME");
        assert_eq!(
            prop.coerce(&json!("all_uppercase")).unwrap(),
            prop.parse("'ALL_UPPERCASE'").unwrap()
        );
    }

    #[test]
    fn test_tags_preserve_order() {
        let prop = Prop::tags();
        let value = prop.coerce(&json!({"team": "data", "env": "prod"})).unwrap();
        let rendered = prop.render(Some(&value)).unwrap();
        assert_eq!(rendered, "TAG (TEAM = 'data', ENV = 'prod')");

        let parsed = prop.parse("(b = '2', a = '1')").unwrap();
        assert_eq!(prop.render_value(&parsed), "(B = '2', A = '1')");
    }

    #[test]
    fn test_tags_subset_and_merge() {
        let Ok(PropValue::Tags(mut have)) = Prop::tags().parse("(team = 'data', env = 'prod')") else {
            panic!("tags expected");
        };
        let Ok(PropValue::Tags(want)) = Prop::tags().parse("(env = 'prod')") else {
            panic!("tags expected");
        };
        assert!(Tags::new().is_subset_of(&have));
        assert!(want.is_subset_of(&have));
        assert!(!have.is_subset_of(&want));

        let Ok(PropValue::Tags(update)) = Prop::tags().parse("(env = 'dev', owner = 'ops')") else {
            panic!("tags expected");
        };
        have.merge(&update);
        assert_eq!(have.get("team"), Some("data"));
        assert_eq!(have.get("env"), Some("dev"));
        assert_eq!(have.len(), 3);
    }

    #[test]
    fn test_tags_malformed() {
        let prop = Prop::tags();
        assert!(prop.parse("(a = 1)").is_err());
        assert!(prop.parse("(a = 'x'").is_err());
        assert!(prop.parse("a = 'x'").is_err());
        assert!(prop.parse("(a = 'x') trailing").is_err());
        assert_eq!(prop.parse("()").unwrap(), PropValue::Tags(Tags::new()));
    }

    #[test]
    fn test_identifier_prop() {
        let prop = Prop::identifier("RESOURCE_MONITOR");
        let value = prop.coerce(&json!("monthly_cap")).unwrap();
        assert_eq!(prop.render(Some(&value)).unwrap(), "RESOURCE_MONITOR = MONTHLY_CAP");
        assert_eq!(prop.parse("MONTHLY_CAP").unwrap(), value);
    }

    #[test]
    fn test_coerce_type_mismatch() {
        let err = Prop::boolean("AUTO_RESUME").coerce(&json!(3)).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
        assert!(Prop::string("COMMENT").coerce(&json!(null)).is_err());
    }
}
