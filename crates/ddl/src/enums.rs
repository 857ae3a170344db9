//! Closed-domain string values.
//!
//! Every enum-valued attribute (warehouse size, scaling policy, edition, ...)
//! is a plain Rust enum implementing [`ParsableEnum`]. Parsing ignores case
//! and treats `-`, `_` and spaces as the same separator, so
//! `"SNOWPARK-OPTIMIZED"`, `"snowpark_optimized"` and `"Snowpark Optimized"`
//! all resolve to one variant.

use crate::error::{Error, Result};

/// A closed set of named string variants.
pub trait ParsableEnum: Sized + Copy + 'static {
    /// Human-readable domain name used in error messages.
    const DOMAIN: &'static str;

    /// Every variant, in declaration order.
    const VARIANTS: &'static [Self];

    /// Canonical spelling of this variant.
    fn as_str(&self) -> &'static str;

    /// Resolve raw text to a declared variant.
    fn parse(raw: &str) -> Result<Self> {
        let wanted = normalize(raw);
        Self::VARIANTS
            .iter()
            .copied()
            .find(|variant| normalize(variant.as_str()) == wanted)
            .ok_or_else(|| Error::InvalidEnumValue {
                domain: Self::DOMAIN,
                value: raw.to_string(),
            })
    }
}

/// Normalise case and separators for enum lookup.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Parse to the canonical spelling of `E`.
///
/// Used as a type-erased parser by enum-valued property descriptors.
pub fn canonical<E: ParsableEnum>(raw: &str) -> Result<&'static str> {
    E::parse(raw).map(|variant| variant.as_str())
}

/// Declare a [`ParsableEnum`] along with `Display`, `FromStr` and serde
/// support.
///
/// ```
/// ddl::parsable_enum! {
///     /// Scaling policy of a multi-cluster warehouse.
///     pub enum ScalingPolicy("scaling policy") {
///         Standard => "STANDARD",
///         Economy => "ECONOMY",
///     }
/// }
///
/// use ddl::ParsableEnum;
/// assert_eq!(ScalingPolicy::parse("economy").unwrap(), ScalingPolicy::Economy);
/// ```
#[macro_export]
macro_rules! parsable_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident($domain:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $crate::ParsableEnum for $name {
            const DOMAIN: &'static str = $domain;
            const VARIANTS: &'static [Self] = &[$(Self::$variant),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::ParsableEnum::as_str(self))
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::Error;

            fn from_str(s: &str) -> $crate::Result<Self> {
                <Self as $crate::ParsableEnum>::parse(s)
            }
        }

        impl $crate::__private::serde::Serialize for $name {
            fn serialize<S: $crate::__private::serde::Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str($crate::ParsableEnum::as_str(self))
            }
        }

        impl<'de> $crate::__private::serde::Deserialize<'de> for $name {
            fn deserialize<D: $crate::__private::serde::Deserializer<'de>>(deserializer: D) -> ::std::result::Result<Self, D::Error> {
                let raw = <::std::string::String as $crate::__private::serde::Deserialize>::deserialize(deserializer)?;
                <Self as $crate::ParsableEnum>::parse(&raw).map_err($crate::__private::serde::de::Error::custom)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::parsable_enum! {
        enum WarehouseType("warehouse type") {
            Standard => "STANDARD",
            SnowparkOptimized => "SNOWPARK-OPTIMIZED",
        }
    }

    #[test]
    fn test_parse_ignores_case_and_separators() {
        for raw in ["SNOWPARK-OPTIMIZED", "snowpark_optimized", "Snowpark Optimized"] {
            assert_eq!(WarehouseType::parse(raw).unwrap(), WarehouseType::SnowparkOptimized);
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = WarehouseType::parse("turbo").unwrap_err();
        assert_eq!(
            err,
            Error::InvalidEnumValue {
                domain: "warehouse type",
                value: "turbo".to_string()
            }
        );
    }

    #[test]
    fn test_canonical_spelling() {
        assert_eq!(canonical::<WarehouseType>(" standard ").unwrap(), "STANDARD");
        assert_eq!(WarehouseType::SnowparkOptimized.to_string(), "SNOWPARK-OPTIMIZED");
    }

    #[test]
    fn test_from_str_and_serde() {
        let parsed: WarehouseType = "snowpark optimized".parse().unwrap();
        assert_eq!(parsed, WarehouseType::SnowparkOptimized);
        let json = serde_json::to_string(&parsed).unwrap();
        assert_eq!(json, "\"SNOWPARK-OPTIMIZED\"");
        let back: WarehouseType = serde_json::from_str("\"snowpark-optimized\"").unwrap();
        assert_eq!(back, parsed);
    }
}
