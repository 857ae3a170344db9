//! In-memory account.
//!
//! [`MemoryConnection`] keeps a catalog of descriptors and applies the
//! effects of the statements blueprints emit, tracking the current role,
//! database, schema and compute pool the way a live session does. Failures
//! can be injected by statement prefix, and every executed statement and
//! every read is recorded.

use crate::connection::{Connection, Descriptor, SessionContext};
use crate::error::{ProviderError, Result};
use crate::kind::{Edition, ResourceKind};
use crate::resource::{Location, Resource, Urn};
use crate::scope::{PUBLIC, Scope};
use ddl::scanner::Scanner;
use ddl::{Identifier, PropValue};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const SYNTAX_ERROR: u32 = 1003;
pub const ALREADY_EXISTS: u32 = 2002;
pub const DOES_NOT_EXIST: u32 = 2003;
pub const NO_CURRENT_CONTAINER: u32 = 90105;

#[derive(Debug, Default, Clone)]
struct Current {
    role: Option<Identifier>,
    database: Option<Identifier>,
    schema: Option<Identifier>,
    compute_pool: Option<Identifier>,
}

/// A [`Connection`] backed by an in-process catalog.
#[derive(Debug)]
pub struct MemoryConnection {
    identity: String,
    account_edition: Edition,
    objects: BTreeMap<Urn, Descriptor>,
    current: Current,
    statements: Vec<String>,
    failures: Vec<(String, ProviderError)>,
    session_reads: AtomicUsize,
    describe_reads: AtomicUsize,
}

impl MemoryConnection {
    pub fn new(account: impl Into<String>, account_edition: Edition) -> Self {
        Self {
            identity: account.into(),
            account_edition,
            objects: BTreeMap::new(),
            current: Current::default(),
            statements: Vec::new(),
            failures: Vec::new(),
            session_reads: AtomicUsize::new(0),
            describe_reads: AtomicUsize::new(0),
        }
    }

    /// Make every statement starting with `prefix` (ignoring case) fail.
    pub fn fail_on(&mut self, prefix: &str, error: ProviderError) {
        self.failures.push((prefix.to_string(), error));
    }

    /// Add an object without recording a statement.
    pub fn seed(&mut self, location: &Location, create_sql: &str) -> Result<()> {
        let resource = Resource::from_sql(create_sql)?.at(location.clone());
        self.seed_resource(&resource);
        Ok(())
    }

    /// Add an already-built resource, owned by its owner.
    pub fn seed_resource(&mut self, resource: &Resource) {
        self.insert(resource, resource.owner().cloned());
    }

    /// Statements executed so far, including ones that failed.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn objects(&self) -> impl Iterator<Item = (&Urn, &Descriptor)> {
        self.objects.iter()
    }

    pub fn contains(&self, urn: &Urn) -> bool {
        self.objects.contains_key(urn)
    }

    pub fn session_reads(&self) -> usize {
        self.session_reads.load(Ordering::Relaxed)
    }

    pub fn describe_reads(&self) -> usize {
        self.describe_reads.load(Ordering::Relaxed)
    }

    fn insert(&mut self, resource: &Resource, owner: Option<Identifier>) {
        let mut descriptor = resource.describe();
        descriptor.owner = owner;
        if resource.kind() == ResourceKind::Database {
            let public = Location::database(resource.name().clone());
            self.objects.insert(
                Urn {
                    kind: ResourceKind::Schema,
                    location: public,
                    name: PUBLIC.clone(),
                },
                Descriptor {
                    name: PUBLIC.clone(),
                    owner: descriptor.owner.clone(),
                    properties: Vec::new(),
                },
            );
        }
        self.objects.insert(resource.urn(), descriptor);
    }

    fn location_for(&self, kind: ResourceKind) -> std::result::Result<Location, ProviderError> {
        let no_current = |what: &str| {
            ProviderError::new(
                NO_CURRENT_CONTAINER,
                format!("Cannot perform CREATE {kind}. This session does not have a current {what}."),
            )
        };
        match kind.scope() {
            Scope::Account => Ok(Location::account()),
            Scope::Database => {
                let database = self.current.database.clone().ok_or_else(|| no_current("database"))?;
                Ok(Location::database(database))
            }
            Scope::Schema => {
                let database = self.current.database.clone().ok_or_else(|| no_current("database"))?;
                let schema = self.current.schema.clone().ok_or_else(|| no_current("schema"))?;
                Ok(Location::schema(database, schema))
            }
        }
    }

    fn require(&self, urn: &Urn) -> std::result::Result<(), ProviderError> {
        if self.objects.contains_key(urn) {
            Ok(())
        } else {
            Err(does_not_exist(urn))
        }
    }

    fn use_object(&mut self, mut scanner: Scanner<'_>) -> std::result::Result<(), ProviderError> {
        if scanner.eat_keyword("ROLE") {
            self.current.role = Some(scanner.identifier().map_err(syntax)?);
            return Ok(());
        }
        if scanner.eat_keyword("DATABASE") {
            let name = scanner.identifier().map_err(syntax)?;
            self.require(&Urn {
                kind: ResourceKind::Database,
                location: Location::account(),
                name: name.clone(),
            })?;
            self.current.database = Some(name);
            self.current.schema = Some(PUBLIC.clone());
            return Ok(());
        }
        if scanner.eat_keyword("SCHEMA") {
            let name = scanner.identifier().map_err(syntax)?;
            let location = self.location_for(ResourceKind::Schema)?;
            self.require(&Urn {
                kind: ResourceKind::Schema,
                location,
                name: name.clone(),
            })?;
            self.current.schema = Some(name);
            return Ok(());
        }
        if scanner.eat_keyword("COMPUTE POOL") {
            let name = scanner.identifier().map_err(syntax)?;
            self.require(&Urn {
                kind: ResourceKind::ComputePool,
                location: Location::account(),
                name: name.clone(),
            })?;
            self.current.compute_pool = Some(name);
            return Ok(());
        }
        Err(syntax(scanner.rest()))
    }

    fn create(&mut self, sql: &str) -> std::result::Result<(), ProviderError> {
        let mut scanner = Scanner::new(sql);
        scanner.eat_keyword("CREATE");
        let or_replace = scanner.eat_keyword("OR REPLACE");

        let resource = Resource::from_sql(sql).map_err(syntax)?;
        let kind = resource.kind();
        scanner.eat_keyword(kind.keyword());
        let if_not_exists = scanner.eat_keyword("IF NOT EXISTS");

        if kind.spec().uses_compute_pool && self.current.compute_pool.is_none() {
            return Err(ProviderError::new(
                NO_CURRENT_CONTAINER,
                format!("Cannot perform CREATE {kind}. This session does not have a current compute pool."),
            ));
        }
        let resource = resource.at(self.location_for(kind)?);
        let urn = resource.urn();

        if self.objects.contains_key(&urn) {
            if if_not_exists {
                return Ok(());
            }
            if !or_replace {
                return Err(ProviderError::new(
                    ALREADY_EXISTS,
                    format!("Object '{}' already exists.", urn.fqn()),
                ));
            }
            self.remove(&urn);
        }

        let owner = if kind.spec().ownable {
            self.current.role.clone().or_else(|| resource.owner().cloned())
        } else {
            None
        };
        self.insert(&resource, owner);

        match kind {
            ResourceKind::Database => {
                self.current.database = Some(resource.name().clone());
                self.current.schema = Some(PUBLIC.clone());
            }
            ResourceKind::Schema => self.current.schema = Some(resource.name().clone()),
            _ => {}
        }
        Ok(())
    }

    fn remove(&mut self, urn: &Urn) {
        self.objects.remove(urn);
        match urn.kind {
            ResourceKind::Database => {
                self.objects
                    .retain(|key, _| key.location.database.as_ref() != Some(&urn.name));
                if self.current.database.as_ref() == Some(&urn.name) {
                    self.current.database = None;
                    self.current.schema = None;
                }
            }
            ResourceKind::Schema => {
                self.objects.retain(|key, _| {
                    key.location.database != urn.location.database
                        || key.location.schema.as_ref() != Some(&urn.name)
                });
                if self.current.schema.as_ref() == Some(&urn.name) {
                    self.current.schema = None;
                }
            }
            _ => {}
        }
    }

    /// Read `<KIND> [IF EXISTS] <name>` for `DROP` and `ALTER`.
    fn target(&self, scanner: &mut Scanner<'_>, guard: &str) -> std::result::Result<(Urn, bool), ProviderError> {
        let kind = ResourceKind::by_keyword_length()
            .into_iter()
            .find(|kind| scanner.eat_keyword(kind.keyword()))
            .ok_or_else(|| syntax(scanner.rest()))?;
        let guarded = scanner.eat_keyword(guard);
        let name = scanner.identifier().map_err(syntax)?;
        let location = self.location_for(kind)?;
        Ok((Urn { kind, location, name }, guarded))
    }

    fn drop_object(&mut self, mut scanner: Scanner<'_>) -> std::result::Result<(), ProviderError> {
        let (urn, if_exists) = self.target(&mut scanner, "IF EXISTS")?;
        if !self.objects.contains_key(&urn) {
            return if if_exists { Ok(()) } else { Err(does_not_exist(&urn)) };
        }
        self.remove(&urn);
        Ok(())
    }

    fn alter(&mut self, mut scanner: Scanner<'_>) -> std::result::Result<(), ProviderError> {
        let (urn, if_exists) = self.target(&mut scanner, "IF EXISTS")?;
        scanner.expect_keyword("SET").map_err(syntax)?;
        let options = ddl::split_options(scanner.rest()).map_err(syntax)?;

        let mut updates = Vec::with_capacity(options.len());
        for option in options {
            let (_, spec) = urn.kind.prop(&option.key).ok_or_else(|| {
                ProviderError::new(SYNTAX_ERROR, format!("invalid property '{}' for {}", option.key, urn.kind))
            })?;
            let value = spec.prop.parse(&option.value).map_err(syntax)?;
            updates.push((spec, value));
        }

        match self.objects.get_mut(&urn) {
            Some(descriptor) => {
                for (spec, mut value) in updates {
                    // SET TAG adds to the tags already on the object
                    if let (PropValue::Tags(update), Some(fragment)) = (&value, descriptor.get(spec.name()))
                        && let Ok(PropValue::Tags(mut tags)) = spec.prop.parse(fragment)
                    {
                        tags.merge(update);
                        value = PropValue::Tags(tags);
                    }
                    descriptor.set(spec.name(), spec.prop.render_value(&value));
                }
                Ok(())
            }
            None if if_exists => Ok(()),
            None => Err(does_not_exist(&urn)),
        }
    }
}

fn syntax(err: impl std::fmt::Display) -> ProviderError {
    ProviderError::new(SYNTAX_ERROR, format!("SQL compilation error: {err}"))
}

fn does_not_exist(urn: &Urn) -> ProviderError {
    ProviderError::new(
        DOES_NOT_EXIST,
        format!("{} '{}' does not exist or not authorized.", urn.kind, urn.fqn()),
    )
}

impl Connection for MemoryConnection {
    fn identity(&self) -> String {
        self.identity.clone()
    }

    fn session(&self) -> std::result::Result<SessionContext, ProviderError> {
        self.session_reads.fetch_add(1, Ordering::Relaxed);
        Ok(SessionContext {
            account: self.identity.clone(),
            account_edition: self.account_edition,
            role: self.current.role.clone(),
            database: self.current.database.clone(),
            schema: self.current.schema.clone(),
        })
    }

    fn describe(&self, urn: &Urn) -> std::result::Result<Option<Descriptor>, ProviderError> {
        self.describe_reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.objects.get(urn).cloned())
    }

    fn list(&self, kind: ResourceKind, location: &Location) -> std::result::Result<Vec<Identifier>, ProviderError> {
        Ok(self
            .objects
            .keys()
            .filter(|urn| urn.kind == kind && urn.location == *location)
            .map(|urn| urn.name.clone())
            .collect())
    }

    fn execute(&mut self, sql: &str) -> std::result::Result<(), ProviderError> {
        self.statements.push(sql.to_string());

        let trimmed = sql.trim_start();
        if let Some((_, error)) = self.failures.iter().find(|(prefix, _)| {
            trimmed.len() >= prefix.len()
                && trimmed.is_char_boundary(prefix.len())
                && trimmed[..prefix.len()].eq_ignore_ascii_case(prefix)
        }) {
            return Err(error.clone());
        }

        let mut scanner = Scanner::new(sql);
        if scanner.eat_keyword("USE") {
            self.use_object(scanner)
        } else if scanner.eat_keyword("CREATE") {
            self.create(sql)
        } else if scanner.eat_keyword("DROP") {
            self.drop_object(scanner)
        } else if scanner.eat_keyword("ALTER") {
            self.alter(scanner)
        } else {
            Err(syntax(format!("unsupported statement {trimmed:?}")))
        }
    }
}
