//! Blueprints: the desired-state graph and how it is planned.
//!
//! Planning reads the session once, describes every desired resource, and
//! orders the resulting actions in two phases. Phase one creates and alters
//! in dependency order (containers before their contents, and objects a
//! resource names, such as its resource monitor or owner role, before the
//! resource); a resource whose change cannot be altered in place is dropped
//! and recreated there. Phase two holds drops in the reverse order.

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::executor::{self, ApplyReport, ExecuteOptions, NoProgress};
use crate::kind::{Mutability, ResourceKind, is_system_role};
use crate::plan::{Action, Exclusion, Plan, diff};
use crate::resource::{Location, Resource, Urn};
use crate::scope::{Database, PUBLIC, Schema, Scope, misplaced};
use crate::session::ObservationCache;
use ddl::{Identifier, ParsableEnum};
use log::{debug, info};
use std::collections::HashSet;
use std::sync::Arc;

/// Databases and schemas the account provides.
const SYSTEM_DATABASES: &[&str] = &["SNOWFLAKE"];
const SYSTEM_SCHEMAS: &[&str] = &["PUBLIC", "INFORMATION_SCHEMA"];

/// A top-level entry of a blueprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Resource(Resource),
    Database(Database),
    Schema(Schema),
}

impl Node {
    fn resources(&self) -> Vec<&Resource> {
        match self {
            Self::Resource(resource) => vec![resource],
            Self::Database(database) => database.resources().collect(),
            Self::Schema(schema) => schema.resources().collect(),
        }
    }
}

impl From<Resource> for Node {
    fn from(resource: Resource) -> Self {
        Self::Resource(resource)
    }
}

impl From<Database> for Node {
    fn from(database: Database) -> Self {
        Self::Database(database)
    }
}

impl From<Schema> for Node {
    fn from(schema: Schema) -> Self {
        Self::Schema(schema)
    }
}

/// What planning does with remote objects the blueprint does not mention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Leave them alone
    #[default]
    CreateOrUpdate,
    /// Drop them, for the managed kinds, inside the blueprint's containers
    FullyManaged,
}

/// A declared set of resources.
#[derive(Debug)]
pub struct Blueprint {
    name: String,
    run_mode: RunMode,
    managed_kinds: Vec<ResourceKind>,
    nodes: Vec<Node>,
    cache: Arc<ObservationCache>,
}

impl Blueprint {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_cache(name, Arc::new(ObservationCache::new()))
    }

    /// A blueprint sharing cached reads with others.
    pub fn with_cache(name: impl Into<String>, cache: Arc<ObservationCache>) -> Self {
        Self {
            name: name.into(),
            run_mode: RunMode::default(),
            managed_kinds: ResourceKind::VARIANTS.to_vec(),
            nodes: Vec::new(),
            cache,
        }
    }

    /// Set the run mode; in [`RunMode::FullyManaged`] only `kinds` are
    /// pruned.
    pub fn with_run_mode(mut self, run_mode: RunMode, kinds: &[ResourceKind]) -> Self {
        self.run_mode = run_mode;
        self.managed_kinds = kinds.to_vec();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn cache(&self) -> &Arc<ObservationCache> {
        &self.cache
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Every declared resource in insertion and containment order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.nodes.iter().flat_map(Node::resources)
    }

    /// Add a resource or container.
    ///
    /// Database and schema resources are wrapped into containers. A
    /// database- or schema-scoped resource added on its own must name its
    /// container through its `database`/`schema` attributes.
    pub fn add(&mut self, node: impl Into<Node>) -> Result<()> {
        let node = match node.into() {
            Node::Resource(r) if r.kind() == ResourceKind::Database => Node::Database(Database::new(r)?),
            Node::Resource(r) if r.kind() == ResourceKind::Schema => Node::Schema(Schema::new(r)?),
            other => other,
        };

        match &node {
            Node::Resource(resource) => check_placement(resource)?,
            Node::Schema(schema) if schema.database().is_none() => {
                return Err(misplaced(schema.resource(), Scope::Account.to_string()));
            }
            _ => {}
        }

        let mut seen: HashSet<Urn> = self.resources().map(Resource::urn).collect();
        for resource in node.resources() {
            let urn = resource.urn();
            if !seen.insert(urn.clone()) {
                return Err(Error::DuplicateResource(urn));
            }
        }

        debug!("Added {} resource(s) to blueprint {}", node.resources().len(), self.name);
        self.nodes.push(node);
        Ok(())
    }

    /// Resources in phase-one order.
    ///
    /// Starting from containment depth and insertion order, each resource
    /// is placed once every declared resource it depends on is placed. A
    /// dependency cycle is broken at its earliest member.
    fn ordered(&self) -> Vec<&Resource> {
        let mut pending: Vec<&Resource> = self.resources().collect();
        pending.sort_by_key(|resource| resource.kind().scope().depth());
        let declared: HashSet<Urn> = pending.iter().map(|resource| resource.urn()).collect();

        let mut placed: HashSet<Urn> = HashSet::new();
        let mut ordered = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let ready = pending.iter().position(|resource| {
                let urn = resource.urn();
                dependencies(resource)
                    .iter()
                    .all(|dep| *dep == urn || !declared.contains(dep) || placed.contains(dep))
            });
            let index = ready.unwrap_or_else(|| {
                debug!("Dependency cycle at {}", pending[0].urn());
                0
            });
            let resource = pending.remove(index);
            placed.insert(resource.urn());
            ordered.push(resource);
        }
        ordered
    }

    /// Fail when a resource names an account object that is neither
    /// declared nor present remotely.
    fn check_references(&self, conn: &dyn Connection, resource: &Resource, declared: &HashSet<Urn>) -> Result<()> {
        for urn in resource.references() {
            if declared.contains(&urn) || self.cache.catalog.describe(conn, &urn)?.is_some() {
                continue;
            }
            return Err(Error::MissingResource {
                urn,
                referenced_by: resource.urn(),
            });
        }
        Ok(())
    }

    /// Compute the actions that converge the account on this blueprint.
    ///
    /// Planning is read-only and, for an unchanged blueprint and cache,
    /// returns the same plan every time.
    pub fn plan(&self, conn: &dyn Connection) -> Result<Plan> {
        let session = self.cache.session.fetch(conn)?;
        info!(
            "Planning {} against {} ({} edition)",
            self.name, session.account, session.account_edition
        );
        let mut plan = Plan::new(session);
        let declared: HashSet<Urn> = self
            .resources()
            .filter(|resource| resource.kind().supports(plan.session.account_edition))
            .map(Resource::urn)
            .collect();

        for resource in self.ordered() {
            let urn = resource.urn();
            if !resource.kind().supports(plan.session.account_edition) {
                debug!("Excluding {urn}: not available on {}", plan.session.account_edition);
                plan.excluded.push(Exclusion {
                    urn,
                    edition: plan.session.account_edition,
                });
                continue;
            }
            self.check_references(conn, resource, &declared)?;

            let Some(observed) = self.cache.catalog.describe(conn, &urn)? else {
                if !is_public_schema(resource) {
                    plan.actions.push(Action::Create(resource.clone()));
                }
                continue;
            };

            let changes = diff(resource, &observed)?;
            if changes.is_empty() {
                continue;
            }
            if changes.iter().any(|c| c.mutability == Mutability::Replace) {
                debug!("Replacing {urn}: {} change(s) need a new object", changes.len());
                plan.actions.push(Action::Drop(resource.clone()));
                plan.actions.push(Action::Create(resource.clone()));
            } else if let Some(alter) = Action::alter(resource.clone(), changes) {
                plan.actions.push(alter);
            }
        }

        if self.run_mode == RunMode::FullyManaged {
            let drops = self.prune(conn, &plan)?;
            plan.actions.extend(drops);
        }

        info!("Planned {} action(s) for {}", plan.len(), self.name);
        Ok(plan)
    }

    /// Drops for remote objects of managed kinds the blueprint does not
    /// declare, contents before containers.
    fn prune(&self, conn: &dyn Connection, plan: &Plan) -> Result<Vec<Action>> {
        let desired: HashSet<Urn> = self.resources().map(Resource::urn).collect();
        let mut drops = Vec::new();

        for (kind, location) in self.pruning_scopes() {
            if !kind.supports(plan.session.account_edition) {
                continue;
            }
            for name in self.cache.catalog.list(conn, kind, &location)? {
                let urn = Urn {
                    kind,
                    location: location.clone(),
                    name,
                };
                if desired.contains(&urn) || is_system(&urn) {
                    continue;
                }
                let Some(observed) = self.cache.catalog.describe(conn, &urn)? else {
                    continue;
                };
                let resource = Resource::from_descriptor(kind, location.clone(), &observed)?;
                debug!("Pruning undeclared {urn}");
                drops.push(Action::Drop(resource));
            }
        }

        drops.sort_by_key(|action| std::cmp::Reverse(action.resource().kind().scope().depth()));
        Ok(drops)
    }

    /// Every `(kind, container)` pair whose contents this blueprint owns.
    fn pruning_scopes(&self) -> Vec<(ResourceKind, Location)> {
        let mut databases = Vec::new();
        let mut schemas = Vec::new();
        for node in &self.nodes {
            match node {
                Node::Database(database) => {
                    databases.push(Location::database(database.name().clone()));
                    schemas.extend(database.schema_locations());
                }
                Node::Schema(schema) => {
                    if let Some(database) = schema.database() {
                        schemas.push(Location::schema(database.clone(), schema.name().clone()));
                    }
                }
                Node::Resource(_) => {}
            }
        }

        let mut scopes = Vec::new();
        for &kind in &self.managed_kinds {
            match kind.scope() {
                Scope::Account => scopes.push((kind, Location::account())),
                Scope::Database => scopes.extend(databases.iter().map(|l| (kind, l.clone()))),
                Scope::Schema => scopes.extend(schemas.iter().map(|l| (kind, l.clone()))),
            }
        }
        scopes
    }

    /// Plan dropping every declared resource that exists, contents before
    /// containers.
    pub fn plan_destroy(&self, conn: &dyn Connection) -> Result<Plan> {
        let session = self.cache.session.fetch(conn)?;
        let mut plan = Plan::new(session);

        for resource in self.ordered().into_iter().rev() {
            let urn = resource.urn();
            if !resource.kind().supports(plan.session.account_edition) {
                plan.excluded.push(Exclusion {
                    urn,
                    edition: plan.session.account_edition,
                });
                continue;
            }
            if is_public_schema(resource) {
                continue;
            }
            if self.cache.catalog.describe(conn, &urn)?.is_some() {
                plan.actions.push(Action::Drop(resource.clone()));
            }
        }

        plan.excluded.reverse();
        info!("Planned {} drop(s) for {}", plan.len(), self.name);
        Ok(plan)
    }

    /// Execute a plan.
    ///
    /// A fatal failure stops the run but still returns the report, so the
    /// caller sees what was applied and what was not attempted;
    /// [`ApplyReport::into_result`] turns it into an error.
    pub fn apply(&self, conn: &mut dyn Connection, plan: &Plan) -> ApplyReport {
        executor::execute(conn, plan, &ExecuteOptions::default(), &mut NoProgress)
    }
}

fn check_placement(resource: &Resource) -> Result<()> {
    let location = resource.location();
    let placed = match resource.kind().scope() {
        Scope::Account => true,
        Scope::Database => location.database.is_some(),
        Scope::Schema => location.database.is_some() && location.schema.is_some(),
    };
    if placed {
        Ok(())
    } else {
        Err(misplaced(resource, Scope::Account.to_string()))
    }
}

/// Declared resources that must exist before `resource`: its containers
/// and the account objects it names.
fn dependencies(resource: &Resource) -> Vec<Urn> {
    let location = resource.location();
    let mut deps = Vec::new();
    if let Some(database) = &location.database {
        deps.push(Urn {
            kind: ResourceKind::Database,
            location: Location::account(),
            name: database.clone(),
        });
        if let Some(schema) = &location.schema {
            deps.push(Urn {
                kind: ResourceKind::Schema,
                location: Location::database(database.clone()),
                name: schema.clone(),
            });
        }
    }
    deps.extend(resource.references());
    deps
}

fn is_public_schema(resource: &Resource) -> bool {
    resource.kind() == ResourceKind::Schema && *resource.name() == *PUBLIC
}

fn is_system(urn: &Urn) -> bool {
    let named = |names: &[&'static str]| names.iter().any(|n| Identifier::from_static(n) == urn.name);
    match urn.kind {
        ResourceKind::Role => is_system_role(&urn.name),
        ResourceKind::Database => named(SYSTEM_DATABASES),
        ResourceKind::Schema => named(SYSTEM_SCHEMAS),
        _ => false,
    }
}
