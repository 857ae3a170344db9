//! Error types for planning and applying blueprints.
//!
//! Authoring mistakes (unknown properties, misplaced resources) surface as
//! [`Error`] before anything touches a connection. Failures reported by a
//! connection are [`ProviderError`]s, categorised so the executor can tell
//! feature-gated statements, which it skips, from fatal ones.

use crate::kind::ResourceKind;
use crate::resource::Urn;
use thiserror::Error;

/// Provider error code for a feature the account has not enabled.
pub const FEATURE_NOT_ENABLED: u32 = 3078;

/// Provider error code for a feature the account edition does not support.
pub const UNSUPPORTED_FEATURE: u32 = 2;

/// Categories of provider errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The statement needs a feature that is unavailable on this account
    FeatureGate,
    /// Anything else
    Other,
}

impl ErrorCategory {
    /// Whether a statement failing with this category can be skipped
    /// without aborting the rest of the plan.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::FeatureGate)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::FeatureGate => "Feature not available on this account",
            Self::Other => "Statement failed",
        }
    }
}

/// An error reported by a connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error {code}: {message}")]
pub struct ProviderError {
    pub code: u32,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.code {
            FEATURE_NOT_ENABLED | UNSUPPORTED_FEATURE => ErrorCategory::FeatureGate,
            _ => ErrorCategory::Other,
        }
    }

    pub fn is_feature_gate(&self) -> bool {
        self.category().is_skippable()
    }
}

/// Errors raised while building, planning or applying a blueprint.
#[derive(Debug, Error)]
pub enum Error {
    /// Grammar error from parsing or coercing a value
    #[error(transparent)]
    Ddl(#[from] ddl::Error),

    #[error("{kind} has no property {property:?}")]
    UnknownProperty { kind: ResourceKind, property: String },

    /// A resource was added to a container that cannot hold it
    #[error("{kind} {name} cannot be placed in {container}")]
    InvalidScope {
        kind: ResourceKind,
        name: String,
        container: String,
    },

    #[error("{kind} does not take an owner")]
    NotOwnable { kind: ResourceKind },

    #[error("{kind} definition has no name")]
    MissingName { kind: ResourceKind },

    #[error("expected a {expected} resource, got {found}")]
    WrongKind {
        expected: ResourceKind,
        found: ResourceKind,
    },

    #[error("{0} is declared more than once")]
    DuplicateResource(Urn),

    /// A resource names an object that is neither declared nor present
    #[error("{referenced_by} refers to {urn}, which is not declared and does not exist")]
    MissingResource { urn: Urn, referenced_by: Urn },

    #[error("unrecognised statement: {0}")]
    UnrecognizedStatement(String),

    /// A connection failed while observing remote state
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A statement failed during apply
    #[error("failed to apply {urn} with `{sql}`: {source}")]
    ApplyFailed {
        urn: Urn,
        sql: String,
        #[source]
        source: ProviderError,
    },
}

impl Error {
    pub(crate) fn unrecognized(sql: &str) -> Self {
        let mut text: String = sql.trim().chars().take(60).collect();
        if text.len() < sql.trim().len() {
            text.push_str("...");
        }
        Self::UnrecognizedStatement(text)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
