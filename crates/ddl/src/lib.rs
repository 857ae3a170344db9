//! # ddl
//!
//! Grammar building blocks for warehouse DDL.
//!
//! - [`identifier`]: validate and extract object names (bare or quoted)
//! - [`enums`]: closed-domain values with separator/case-insensitive parsing
//! - [`props`]: typed property descriptors that render, parse and coerce
//!   statement options
//! - [`statement`]: split the option list of an observed statement
//!
//! ## Example
//!
//! ```
//! use ddl::{Identifier, Prop, PropValue};
//!
//! let name = Identifier::parse("analytics_wh")?;
//! assert_eq!(name.to_string(), "ANALYTICS_WH");
//!
//! let prop = Prop::int("AUTO_SUSPEND");
//! assert_eq!(prop.render(Some(&PropValue::Int(60))).as_deref(), Some("AUTO_SUSPEND = 60"));
//! assert_eq!(prop.parse("60")?, PropValue::Int(60));
//! # Ok::<(), ddl::Error>(())
//! ```

pub mod enums;
mod error;
pub mod identifier;
pub mod props;
pub mod scanner;
pub mod statement;

pub use enums::ParsableEnum;
pub use error::{Error, Result};
pub use identifier::Identifier;
pub use props::{Prop, PropKind, PropValue, Tags};
pub use statement::{RawOption, split_options};

#[doc(hidden)]
pub mod __private {
    pub use serde;
}
