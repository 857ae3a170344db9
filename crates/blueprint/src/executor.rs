//! Execution engine - runs plan actions in order against a connection
//!
//! Before each action the executor switches role, database, schema and
//! compute pool as needed so every statement runs in its resource's
//! container. The context starts unknown, so the first action always
//! switches. A statement that fails with a feature-gate error is skipped;
//! any other failure stops the run and leaves the remaining actions
//! unattempted.

use crate::connection::Connection;
use crate::error::{Error, ProviderError, Result};
use crate::kind::ResourceKind;
use crate::plan::{Action, Plan};
use crate::resource::{Resource, Urn};
use crate::scope::PUBLIC;
use ddl::Identifier;
use log::{error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One `USE` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextSwitch {
    Role(Identifier),
    Database(Identifier),
    Schema(Identifier),
    ComputePool(Identifier),
}

impl ContextSwitch {
    pub fn sql(&self) -> String {
        match self {
            Self::Role(name) => format!("USE ROLE {name}"),
            Self::Database(name) => format!("USE DATABASE {name}"),
            Self::Schema(name) => format!("USE SCHEMA {name}"),
            Self::ComputePool(name) => format!("USE COMPUTE POOL {name}"),
        }
    }
}

/// The session's current role and containers as far as the executor
/// knows. `None` means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    pub role: Option<Identifier>,
    pub database: Option<Identifier>,
    pub schema: Option<Identifier>,
    pub compute_pool: Option<Identifier>,
}

impl ExecutionContext {
    fn satisfies(&self, switch: &ContextSwitch) -> bool {
        match switch {
            ContextSwitch::Role(name) => self.role.as_ref() == Some(name),
            ContextSwitch::Database(name) => self.database.as_ref() == Some(name),
            ContextSwitch::Schema(name) => self.schema.as_ref() == Some(name),
            ContextSwitch::ComputePool(name) => self.compute_pool.as_ref() == Some(name),
        }
    }

    /// Track a successful switch.
    pub fn record(&mut self, switch: &ContextSwitch) {
        match switch {
            ContextSwitch::Role(name) => self.role = Some(name.clone()),
            ContextSwitch::Database(name) => {
                self.database = Some(name.clone());
                self.schema = Some(PUBLIC.clone());
            }
            ContextSwitch::Schema(name) => self.schema = Some(name.clone()),
            ContextSwitch::ComputePool(name) => self.compute_pool = Some(name.clone()),
        }
    }

    /// Switches needed before running a statement for `resource`.
    pub fn switches_for(&self, resource: &Resource) -> Vec<ContextSwitch> {
        let location = resource.location();
        let candidates = [
            Some(ContextSwitch::Role(resource.role().clone())),
            location.database.clone().map(ContextSwitch::Database),
            location.schema.clone().map(ContextSwitch::Schema),
            resource.compute_pool().cloned().map(ContextSwitch::ComputePool),
        ];

        let mut projected = self.clone();
        let mut switches = Vec::new();
        for switch in candidates.into_iter().flatten() {
            if !projected.satisfies(&switch) {
                projected.record(&switch);
                switches.push(switch);
            }
        }
        switches
    }

    /// Forget whatever an executed action may have changed.
    ///
    /// Creating or dropping a container can move the session's current
    /// database or schema, so those become unknown.
    fn after(&mut self, action: &Action) {
        let resource = action.resource();
        match (action, resource.kind()) {
            (Action::Create(_) | Action::Drop(_), ResourceKind::Database) => {
                self.database = None;
                self.schema = None;
            }
            (Action::Create(_) | Action::Drop(_), ResourceKind::Schema) => self.schema = None,
            (Action::Drop(_), ResourceKind::Role) if self.role.as_ref() == Some(resource.name()) => {
                self.role = None;
            }
            (Action::Drop(_), ResourceKind::ComputePool) => self.compute_pool = None,
            _ => {}
        }
    }
}

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't run anything, report every action as skipped
    pub dry_run: bool,
    /// Checked before each action; once set, the rest are aborted
    pub cancel: Option<Arc<AtomicBool>>,
}

impl ExecuteOptions {
    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// What happened to one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    Applied,
    Skipped { code: Option<u32>, reason: String },
    Failed { error: ProviderError },
    /// Not attempted because an earlier action failed or the run was
    /// cancelled
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub urn: Urn,
    pub verb: &'static str,
    /// The statement that produced the status
    pub sql: String,
    pub status: ActionStatus,
}

/// Summary of execution results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub created: usize,
    pub altered: usize,
    pub dropped: usize,
    pub skipped: usize,
    pub failed: usize,
    pub aborted: usize,
}

impl ApplySummary {
    /// Total number of statements that changed the account
    pub fn total_changes(&self) -> usize {
        self.created + self.altered + self.dropped
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn add(&mut self, outcome: &ActionOutcome) {
        match (&outcome.status, outcome.verb) {
            (ActionStatus::Applied, "create") => self.created += 1,
            (ActionStatus::Applied, "alter") => self.altered += 1,
            (ActionStatus::Applied, _) => self.dropped += 1,
            (ActionStatus::Skipped { .. }, _) => self.skipped += 1,
            (ActionStatus::Failed { .. }, _) => self.failed += 1,
            (ActionStatus::Aborted, _) => self.aborted += 1,
        }
    }
}

/// Per-action results of running a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub outcomes: Vec<ActionOutcome>,
}

impl ApplyReport {
    pub fn summary(&self) -> ApplySummary {
        let mut summary = ApplySummary::default();
        for outcome in &self.outcomes {
            summary.add(outcome);
        }
        summary
    }

    /// The failure that stopped the run, if any.
    pub fn failure(&self) -> Option<&ActionOutcome> {
        self.outcomes
            .iter()
            .find(|o| matches!(o.status, ActionStatus::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failure().is_none()
    }

    /// Turn a failed run into [`Error::ApplyFailed`].
    pub fn into_result(self) -> Result<Self> {
        match self.failure() {
            Some(ActionOutcome {
                urn,
                sql,
                status: ActionStatus::Failed { error },
                ..
            }) => Err(Error::ApplyFailed {
                urn: urn.clone(),
                sql: sql.clone(),
                source: error.clone(),
            }),
            _ => Ok(self),
        }
    }
}

/// Progress callback for execution operations
pub trait ProgressCallback {
    /// Called once before the first action
    fn on_start(&mut self, _total: usize) {}

    fn on_action_start(&mut self, index: usize, action: &Action);

    fn on_action_complete(&mut self, index: usize, outcome: &ActionOutcome);

    /// Called once after the last action
    fn on_finish(&mut self) {}
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_action_start(&mut self, _index: usize, _action: &Action) {}
    fn on_action_complete(&mut self, _index: usize, _outcome: &ActionOutcome) {}
}

/// Run a plan's actions in order.
pub fn execute<P: ProgressCallback>(
    conn: &mut dyn Connection,
    plan: &Plan,
    opts: &ExecuteOptions,
    progress: &mut P,
) -> ApplyReport {
    let mut report = ApplyReport::default();
    let mut context = ExecutionContext::default();
    let mut halted = false;

    progress.on_start(plan.len());
    for (index, action) in plan.iter().enumerate() {
        progress.on_action_start(index, action);

        let (sql, status) = if halted || opts.cancelled() {
            halted = true;
            (action.sql(), ActionStatus::Aborted)
        } else if opts.dry_run {
            (
                action.sql(),
                ActionStatus::Skipped {
                    code: None,
                    reason: "dry run".to_string(),
                },
            )
        } else {
            run_action(conn, &mut context, action)
        };

        if matches!(status, ActionStatus::Failed { .. }) {
            halted = true;
        }
        let outcome = ActionOutcome {
            urn: action.urn(),
            verb: action.verb(),
            sql,
            status,
        };
        progress.on_action_complete(index, &outcome);
        report.outcomes.push(outcome);
    }
    progress.on_finish();

    report
}

/// Switch context and run one action; returns the statement that decided
/// the outcome.
fn run_action(conn: &mut dyn Connection, context: &mut ExecutionContext, action: &Action) -> (String, ActionStatus) {
    let urn = action.urn();

    for switch in context.switches_for(action.resource()) {
        let sql = switch.sql();
        match conn.execute(&sql) {
            Ok(()) => context.record(&switch),
            Err(err) => {
                let status = classify(&urn, &sql, err);
                return (sql, status);
            }
        }
    }

    let sql = action.sql();
    match conn.execute(&sql) {
        Ok(()) => {
            info!("Applied {urn}: {sql}");
            context.after(action);
            (sql, ActionStatus::Applied)
        }
        Err(err) => {
            let status = classify(&urn, &sql, err);
            (sql, status)
        }
    }
}

fn classify(urn: &Urn, sql: &str, err: ProviderError) -> ActionStatus {
    if err.is_feature_gate() {
        warn!("Skipping {urn}: {} ({err})", err.category().description());
        ActionStatus::Skipped {
            code: Some(err.code),
            reason: err.message,
        }
    } else {
        error!("Failed {urn} with `{sql}`: {err}");
        ActionStatus::Failed { error: err }
    }
}
