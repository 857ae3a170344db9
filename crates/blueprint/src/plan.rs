//! Plans and property diffs.
//!
//! A [`Plan`] is an ordered list of [`Action`]s. Only properties a
//! definition sets are compared against observed state, so values the
//! account picked on its own never show up as drift.

use crate::connection::{Descriptor, SessionContext};
use crate::error::Result;
use crate::kind::{Edition, Mutability};
use crate::resource::{Resource, Urn};
use ddl::PropValue;
use std::fmt;

/// One property that differs between desired and observed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropChange {
    pub name: &'static str,
    /// Observed value, `None` when the object does not report one
    pub from: Option<PropValue>,
    pub to: PropValue,
    pub mutability: Mutability,
}

/// A single planned statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create(Resource),
    Alter {
        resource: Resource,
        changes: Vec<PropChange>,
    },
    Drop(Resource),
}

impl Action {
    /// An in-place alter, or `None` when no change renders an assignment.
    pub fn alter(resource: Resource, changes: Vec<PropChange>) -> Option<Self> {
        let names: Vec<&str> = changes.iter().map(|c| c.name).collect();
        resource.alter_sql(&names)?;
        Some(Self::Alter { resource, changes })
    }

    pub fn resource(&self) -> &Resource {
        match self {
            Self::Create(resource) | Self::Drop(resource) => resource,
            Self::Alter { resource, .. } => resource,
        }
    }

    pub fn urn(&self) -> Urn {
        self.resource().urn()
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Alter { .. } => "alter",
            Self::Drop(_) => "drop",
        }
    }

    /// The statement this action runs.
    pub fn sql(&self) -> String {
        match self {
            Self::Create(resource) => resource.create_sql(false),
            Self::Alter { resource, changes } => {
                let names: Vec<&str> = changes.iter().map(|c| c.name).collect();
                let sql = resource.alter_sql(&names);
                debug_assert!(sql.is_some(), "alter of {} sets nothing", resource.urn());
                sql.unwrap_or_default()
            }
            Self::Drop(resource) => resource.drop_sql(false),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb(), self.urn())
    }
}

/// A desired resource left out because the account edition lacks its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub urn: Urn,
    pub edition: Edition,
}

/// Counts of planned actions by verb.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub alter: usize,
    pub drop: usize,
}

impl PlanSummary {
    pub fn total(&self) -> usize {
        self.create + self.alter + self.drop
    }
}

/// Ordered actions that converge an account on a blueprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub session: SessionContext,
    pub actions: Vec<Action>,
    pub excluded: Vec<Exclusion>,
}

impl Plan {
    pub fn new(session: SessionContext) -> Self {
        Self {
            session,
            actions: Vec::new(),
            excluded: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    /// Statements in execution order, without context switches.
    pub fn sql(&self) -> Vec<String> {
        self.actions.iter().map(Action::sql).collect()
    }

    /// Hex digest of the plan's statements.
    ///
    /// Two plans with the same fingerprint run the same statements, so a
    /// reviewed plan can be checked against a freshly computed one before
    /// applying.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for sql in self.sql() {
            hasher.update(sql.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for action in &self.actions {
            match action {
                Action::Create(_) => summary.create += 1,
                Action::Alter { .. } => summary.alter += 1,
                Action::Drop(_) => summary.drop += 1,
            }
        }
        summary
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Compare the properties a resource sets against an observed descriptor.
///
/// Create-only properties are never compared. Tags compare by the keys the
/// resource sets; other tags on the object are left alone, so an empty tag
/// list matches any object.
pub fn diff(desired: &Resource, observed: &Descriptor) -> Result<Vec<PropChange>> {
    let mut changes = Vec::new();

    for (spec, want) in desired.values() {
        if spec.mutability == Mutability::CreateOnly {
            continue;
        }

        let have = observed
            .get(spec.name())
            .map(|fragment| spec.prop.parse(fragment))
            .transpose()?;

        let unchanged = match (&have, want) {
            (Some(PropValue::Tags(have)), PropValue::Tags(want)) => want.is_subset_of(have),
            (Some(have), want) => have == want,
            (None, PropValue::Tags(tags)) => tags.is_empty(),
            (None, _) => false,
        };
        if unchanged {
            continue;
        }

        changes.push(PropChange {
            name: spec.name(),
            from: have,
            to: want.clone(),
            mutability: spec.mutability,
        });
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ResourceKind;
    use serde_json::json;

    fn user(attrs: &[(&str, serde_json::Value)]) -> Resource {
        Resource::from_attrs(ResourceKind::User, attrs.iter().cloned()).unwrap()
    }

    #[test]
    fn test_diff_identical_is_empty() {
        let wh = Resource::new(ResourceKind::Warehouse, "wh").unwrap();
        assert!(diff(&wh, &wh.describe()).unwrap().is_empty());
    }

    #[test]
    fn test_diff_ignores_unset_props() {
        let desired = Resource::new(ResourceKind::Warehouse, "wh").unwrap();
        let mut observed = desired.describe();
        observed.set("AUTO_SUSPEND", "600");
        observed.set("COMMENT", "'set by hand'");
        assert!(diff(&desired, &observed).unwrap().is_empty());
    }

    #[test]
    fn test_diff_reports_changed_value() {
        let desired = Resource::from_attrs(
            ResourceKind::Warehouse,
            [("name", json!("wh")), ("auto_suspend", json!(60))],
        )
        .unwrap();
        let mut observed = desired.describe();
        observed.set("AUTO_SUSPEND", "600");

        let changes = diff(&desired, &observed).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].name, "AUTO_SUSPEND");
        assert_eq!(changes[0].from, Some(PropValue::Int(600)));
        assert_eq!(changes[0].to, PropValue::Int(60));
        assert_eq!(changes[0].mutability, Mutability::Alter);
    }

    #[test]
    fn test_diff_login_name_case_is_not_a_change() {
        let desired = user(&[("name", json!("someuser")), ("login_name", json!("all_uppercase"))]);
        let observed = Resource::from_sql("CREATE USER someuser LOGIN_NAME = 'ALL_UPPERCASE'")
            .unwrap()
            .describe();
        assert!(diff(&desired, &observed).unwrap().is_empty());
    }

    #[test]
    fn test_diff_create_only_ignored() {
        let desired = Resource::from_attrs(
            ResourceKind::Warehouse,
            [("name", json!("wh")), ("initially_suspended", json!(true))],
        )
        .unwrap();
        let mut observed = desired.describe();
        observed.set("INITIALLY_SUSPENDED", "FALSE");
        assert!(diff(&desired, &observed).unwrap().is_empty());
    }

    #[test]
    fn test_diff_replace_mutability() {
        let desired = Resource::from_attrs(ResourceKind::Sequence, [("name", json!("seq")), ("start", json!(10))]).unwrap();
        let mut observed = desired.describe();
        observed.set("START", "1");
        let changes = diff(&desired, &observed).unwrap();
        assert_eq!(changes[0].mutability, Mutability::Replace);
    }

    #[test]
    fn test_diff_tags_by_declared_keys() {
        let observed = Resource::from_sql("CREATE ROLE analyst TAG (team = 'data', env = 'prod')")
            .unwrap()
            .describe();
        let role = |tags: serde_json::Value| {
            Resource::from_attrs(ResourceKind::Role, [("name", json!("analyst")), ("tag", tags)]).unwrap()
        };

        assert!(diff(&role(json!({})), &observed).unwrap().is_empty());
        assert!(diff(&role(json!({"env": "prod"})), &observed).unwrap().is_empty());

        let desired = role(json!({"env": "dev"}));
        let changes = diff(&desired, &observed).unwrap();
        assert_eq!(changes.len(), 1);
        let action = Action::alter(desired, changes).unwrap();
        assert_eq!(action.sql(), "ALTER ROLE ANALYST SET TAG (ENV = 'dev')");
    }

    #[test]
    fn test_alter_without_assignments_is_not_an_action() {
        let role = Resource::from_attrs(ResourceKind::Role, [("name", json!("analyst")), ("tag", json!({}))]).unwrap();
        let changes = vec![PropChange {
            name: "TAG",
            from: None,
            to: PropValue::Tags(ddl::Tags::new()),
            mutability: Mutability::Alter,
        }];
        assert_eq!(Action::alter(role, changes), None);
    }

    #[test]
    fn test_diff_bad_observed_fragment() {
        let desired = Resource::new(ResourceKind::Warehouse, "wh").unwrap();
        let mut observed = desired.describe();
        observed.set("WAREHOUSE_SIZE", "ENORMOUS");
        assert!(diff(&desired, &observed).is_err());
    }

    #[test]
    fn test_action_sql_and_display() {
        let wh = Resource::new(ResourceKind::Warehouse, "wh").unwrap();
        let alter = Action::Alter {
            resource: wh.clone(),
            changes: vec![PropChange {
                name: "WAREHOUSE_SIZE",
                from: Some(PropValue::Enum("SMALL")),
                to: PropValue::Enum("XSMALL"),
                mutability: Mutability::Alter,
            }],
        };
        assert_eq!(alter.sql(), "ALTER WAREHOUSE WH SET WAREHOUSE_SIZE = XSMALL");
        assert_eq!(alter.to_string(), "alter warehouse:WH");
        assert_eq!(Action::Drop(wh).sql(), "DROP WAREHOUSE WH");
    }

    #[test]
    fn test_fingerprint_tracks_statements() {
        let session = SessionContext::new("acme", Edition::Standard);
        let wh = Resource::new(ResourceKind::Warehouse, "wh").unwrap();

        let mut a = Plan::new(session.clone());
        a.actions.push(Action::Create(wh.clone()));
        let mut b = Plan::new(session);
        b.actions.push(Action::Create(wh.clone()));
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        b.actions.push(Action::Drop(wh));
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(b.summary(), PlanSummary { create: 1, alter: 0, drop: 1 });
    }
}
