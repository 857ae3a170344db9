//! The seam between blueprints and a live account.
//!
//! Planning only reads through a [`Connection`]; applying also executes
//! statements. [`crate::memory::MemoryConnection`] is the in-process
//! implementation used by tests and offline runs.

use crate::error::ProviderError;
use crate::kind::{Edition, ResourceKind};
use crate::resource::{Location, Urn};
use ddl::Identifier;
use serde::{Deserialize, Serialize};

/// Account-level facts read once per connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub account: String,
    pub account_edition: Edition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Identifier>,
}

impl SessionContext {
    pub fn new(account: impl Into<String>, account_edition: Edition) -> Self {
        Self {
            account: account.into(),
            account_edition,
            role: None,
            database: None,
            schema: None,
        }
    }
}

/// Observed state of one remote object.
///
/// Property values are DDL fragments; the owning kind's descriptors parse
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub name: Identifier,
    pub owner: Option<Identifier>,
    pub properties: Vec<(String, String)>,
}

impl Descriptor {
    pub fn get(&self, prop: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(prop))
            .map(|(_, value)| value.as_str())
    }

    /// Set or replace a property fragment.
    pub fn set(&mut self, prop: &str, fragment: impl Into<String>) {
        let fragment = fragment.into();
        match self
            .properties
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(prop))
        {
            Some(entry) => entry.1 = fragment,
            None => self.properties.push((prop.to_ascii_uppercase(), fragment)),
        }
    }
}

/// A connection to an account.
pub trait Connection {
    /// Stable key identifying the account and credentials behind this
    /// connection, used to share cached reads.
    fn identity(&self) -> String;

    /// Read the session context.
    fn session(&self) -> Result<SessionContext, ProviderError>;

    /// Look up one object. `Ok(None)` means it does not exist.
    fn describe(&self, urn: &Urn) -> Result<Option<Descriptor>, ProviderError>;

    /// Names of the objects of `kind` directly inside `location`.
    fn list(&self, kind: ResourceKind, location: &Location) -> Result<Vec<Identifier>, ProviderError>;

    /// Execute one statement.
    fn execute(&mut self, sql: &str) -> Result<(), ProviderError>;
}
