//! # Blueprint
//!
//! Declarative management of warehouse account objects.
//!
//! A [`Blueprint`] holds the objects an account should have. Planning
//! compares them against what a [`Connection`] reports and produces an
//! ordered [`Plan`] of `CREATE`, `ALTER` and `DROP` statements; applying
//! runs that plan with the right role and containers for each statement.
//!
//! ## Core Concepts
//!
//! - **Resource**: one object of a [`ResourceKind`], with typed properties
//! - **Database / Schema**: containers that place their contents
//! - **Plan**: two-phase ordered actions, containers first and drops last
//! - **Executor**: runs actions, skipping feature-gated ones and stopping
//!   at the first real failure
//!
//! ## Example
//!
//! ```
//! use blueprint::{Blueprint, Database, Edition, MemoryConnection, Resource, ResourceKind};
//!
//! let mut conn = MemoryConnection::new("acme", Edition::Standard);
//!
//! let mut bp = Blueprint::new("analytics");
//! let mut db = Database::named("analytics")?;
//! db.add(Resource::new(ResourceKind::Schema, "raw")?)?;
//! bp.add(db)?;
//! bp.add(Resource::new(ResourceKind::Warehouse, "loading_wh")?)?;
//!
//! let plan = bp.plan(&conn)?;
//! assert_eq!(plan.len(), 3);
//! assert!(bp.apply(&mut conn, &plan).is_success());
//!
//! bp.cache().reset_cache();
//! assert!(bp.plan(&conn)?.is_empty());
//! # Ok::<(), blueprint::Error>(())
//! ```

pub mod connection;
mod error;
pub mod executor;
pub mod kind;
pub mod memory;
pub mod plan;
pub mod planner;
pub mod resource;
pub mod scope;
pub mod session;

pub use connection::{Connection, Descriptor, SessionContext};
pub use error::{Error, ErrorCategory, FEATURE_NOT_ENABLED, ProviderError, Result, UNSUPPORTED_FEATURE};
pub use executor::{
    ActionOutcome, ActionStatus, ApplyReport, ApplySummary, ExecuteOptions, NoProgress, ProgressCallback, execute,
};
pub use kind::{Edition, KindSpec, Mutability, PropSpec, ResourceKind};
pub use memory::MemoryConnection;
pub use plan::{Action, Exclusion, Plan, PlanSummary, PropChange, diff};
pub use planner::{Blueprint, Node, RunMode};
pub use resource::{Location, Resource, Urn};
pub use scope::{Database, PUBLIC_SCHEMA, Schema, Scope};
pub use session::ObservationCache;
