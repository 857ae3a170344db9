//! Containment.
//!
//! Account-scoped kinds stand alone. Database-scoped kinds live in a
//! [`Database`], schema-scoped kinds in a [`Schema`]. Every database carries
//! an implicit `PUBLIC` schema that receives schema-scoped resources added
//! straight to the database; it exists remotely as soon as the database does
//! and is never created or dropped on its own.

use crate::error::{Error, Result};
use crate::kind::ResourceKind;
use crate::resource::{Location, Resource};
use ddl::Identifier;
use std::fmt;
use std::sync::LazyLock;

/// Containment level of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Account,
    Database,
    Schema,
}

impl Scope {
    /// Nesting depth: account objects first, schema objects last.
    pub fn depth(&self) -> usize {
        match self {
            Self::Account => 0,
            Self::Database => 1,
            Self::Schema => 2,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Account => "account",
            Self::Database => "database",
            Self::Schema => "schema",
        })
    }
}

pub const PUBLIC_SCHEMA: &str = "PUBLIC";

pub(crate) static PUBLIC: LazyLock<Identifier> = LazyLock::new(|| Identifier::from_static(PUBLIC_SCHEMA));

/// A schema and the schema-scoped resources it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    resource: Resource,
    children: Vec<Resource>,
    implicit: bool,
}

impl Schema {
    pub fn new(resource: Resource) -> Result<Self> {
        expect_kind(ResourceKind::Schema, &resource)?;
        Ok(Self {
            resource,
            children: Vec::new(),
            implicit: false,
        })
    }

    pub fn named(name: &str) -> Result<Self> {
        Self::new(Resource::new(ResourceKind::Schema, name)?)
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn name(&self) -> &Identifier {
        self.resource.name()
    }

    pub fn children(&self) -> &[Resource] {
        &self.children
    }

    /// Whether this is the `PUBLIC` schema a database carries without it
    /// being declared.
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    pub(crate) fn is_public(&self) -> bool {
        *self.resource.name() == *PUBLIC
    }

    pub fn database(&self) -> Option<&Identifier> {
        self.resource.location().database.as_ref()
    }

    /// Add a schema-scoped resource.
    pub fn add(&mut self, mut resource: Resource) -> Result<()> {
        if resource.kind().scope() != Scope::Schema {
            return Err(misplaced(&resource, format!("schema {}", self.name())));
        }
        resource.set_location(self.child_location());
        self.children.push(resource);
        Ok(())
    }

    fn child_location(&self) -> Location {
        Location {
            database: self.database().cloned(),
            schema: Some(self.name().clone()),
        }
    }

    /// Move this schema and everything in it under `database`.
    fn relocate(&mut self, database: &Identifier) {
        self.resource.set_location(Location::database(database.clone()));
        let location = self.child_location();
        for child in &mut self.children {
            child.set_location(location.clone());
        }
    }

    /// Absorb the children of another schema with the same name.
    fn merge(&mut self, other: Schema) {
        if !other.implicit {
            self.resource = other.resource;
            self.implicit = false;
        }
        let location = self.child_location();
        for mut child in other.children {
            child.set_location(location.clone());
            self.children.push(child);
        }
    }

    pub(crate) fn resources(&self) -> impl Iterator<Item = &Resource> {
        let own = (!self.implicit).then_some(&self.resource);
        own.into_iter().chain(&self.children)
    }
}

/// A database, its schemas and its database-scoped resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database {
    resource: Resource,
    public_schema: Schema,
    schemas: Vec<Schema>,
    children: Vec<Resource>,
}

impl Database {
    pub fn new(resource: Resource) -> Result<Self> {
        expect_kind(ResourceKind::Database, &resource)?;
        let mut public_schema = Schema::named(PUBLIC_SCHEMA)?;
        public_schema.relocate(resource.name());
        public_schema.implicit = true;
        Ok(Self {
            resource,
            public_schema,
            schemas: Vec::new(),
            children: Vec::new(),
        })
    }

    pub fn named(name: &str) -> Result<Self> {
        Self::new(Resource::new(ResourceKind::Database, name)?)
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn name(&self) -> &Identifier {
        self.resource.name()
    }

    pub fn public_schema(&self) -> &Schema {
        &self.public_schema
    }

    /// Mutable access to the implicit `PUBLIC` schema.
    pub fn public_schema_mut(&mut self) -> &mut Schema {
        &mut self.public_schema
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    pub fn schema_mut(&mut self, name: &str) -> Option<&mut Schema> {
        if self.public_schema.name().matches(name) {
            return Some(&mut self.public_schema);
        }
        self.schemas.iter_mut().find(|s| s.name().matches(name))
    }

    pub fn children(&self) -> &[Resource] {
        &self.children
    }

    /// Add a resource, routing it by scope.
    ///
    /// Schemas become containers of this database, other database-scoped
    /// kinds are held directly and schema-scoped kinds land in `PUBLIC`.
    pub fn add(&mut self, mut resource: Resource) -> Result<()> {
        match resource.kind().scope() {
            Scope::Account => Err(misplaced(&resource, format!("database {}", self.name()))),
            Scope::Database if resource.kind() == ResourceKind::Schema => {
                self.add_schema(Schema::new(resource)?)
            }
            Scope::Database => {
                resource.set_location(Location::database(self.name().clone()));
                self.children.push(resource);
                Ok(())
            }
            Scope::Schema => self.public_schema.add(resource),
        }
    }

    /// Add a schema container along with anything already in it.
    pub fn add_schema(&mut self, mut schema: Schema) -> Result<()> {
        schema.relocate(self.name());
        if schema.is_public() {
            self.public_schema.merge(schema);
        } else if let Some(existing) = self.schemas.iter_mut().find(|s| s.name() == schema.name()) {
            existing.merge(schema);
        } else {
            self.schemas.push(schema);
        }
        Ok(())
    }

    /// Every managed resource in containment order: the database, its
    /// direct children, then each schema followed by its children.
    pub(crate) fn resources(&self) -> impl Iterator<Item = &Resource> {
        std::iter::once(&self.resource)
            .chain(&self.children)
            .chain(self.public_schema.resources())
            .chain(self.schemas.iter().flat_map(Schema::resources))
    }

    /// Locations of every schema, including `PUBLIC`.
    pub(crate) fn schema_locations(&self) -> Vec<Location> {
        std::iter::once(&self.public_schema)
            .chain(&self.schemas)
            .map(Schema::child_location)
            .collect()
    }
}

fn expect_kind(expected: ResourceKind, resource: &Resource) -> Result<()> {
    if resource.kind() == expected {
        Ok(())
    } else {
        Err(Error::WrongKind {
            expected,
            found: resource.kind(),
        })
    }
}

pub(crate) fn misplaced(resource: &Resource, container: String) -> Error {
    Error::InvalidScope {
        kind: resource.kind(),
        name: resource.name().to_string(),
        container,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(kind: ResourceKind, name: &str) -> Resource {
        Resource::new(kind, name).unwrap()
    }

    #[test]
    fn test_database_routes_by_scope() {
        let mut db = Database::named("sales").unwrap();
        db.add(resource(ResourceKind::Sequence, "order_seq")).unwrap();
        db.add(resource(ResourceKind::DatabaseRole, "reader")).unwrap();
        db.add(resource(ResourceKind::Schema, "raw")).unwrap();

        assert_eq!(db.public_schema().children().len(), 1);
        assert_eq!(
            db.public_schema().children()[0].urn().to_string(),
            "sequence:SALES.PUBLIC.ORDER_SEQ"
        );
        assert_eq!(db.children()[0].urn().to_string(), "database_role:SALES.READER");
        assert_eq!(db.schemas()[0].resource().urn().to_string(), "schema:SALES.RAW");
    }

    #[test]
    fn test_account_kind_rejected_by_containers() {
        let mut db = Database::named("sales").unwrap();
        let err = db.add(resource(ResourceKind::Warehouse, "wh")).unwrap_err();
        assert!(matches!(err, Error::InvalidScope { kind: ResourceKind::Warehouse, .. }));

        let mut schema = Schema::named("raw").unwrap();
        let err = schema.add(resource(ResourceKind::DatabaseRole, "r")).unwrap_err();
        assert!(matches!(err, Error::InvalidScope { .. }));
    }

    #[test]
    fn test_schema_children_follow_relocation() {
        let mut schema = Schema::named("raw").unwrap();
        schema.add(resource(ResourceKind::Sequence, "seq")).unwrap();

        let mut db = Database::named("sales").unwrap();
        db.add_schema(schema).unwrap();

        let seq = &db.schemas()[0].children()[0];
        assert_eq!(seq.urn().to_string(), "sequence:SALES.RAW.SEQ");
    }

    #[test]
    fn test_public_schema_is_implicit() {
        let mut db = Database::named("sales").unwrap();
        db.public_schema_mut()
            .add(resource(ResourceKind::Sequence, "seq"))
            .unwrap();

        let kinds: Vec<_> = db.resources().map(Resource::kind).collect();
        assert_eq!(kinds, vec![ResourceKind::Database, ResourceKind::Sequence]);
        assert!(db.public_schema().is_implicit());
    }

    #[test]
    fn test_explicit_public_schema_merges() {
        let mut db = Database::named("sales").unwrap();
        db.add(resource(ResourceKind::Sequence, "a")).unwrap();

        let mut public = Schema::new(
            Resource::from_attrs(
                ResourceKind::Schema,
                [("name", serde_json::json!("public")), ("comment", serde_json::json!("x"))],
            )
            .unwrap(),
        )
        .unwrap();
        public.add(resource(ResourceKind::Sequence, "b")).unwrap();
        db.add_schema(public).unwrap();

        assert_eq!(db.public_schema().children().len(), 2);
        assert!(!db.public_schema().is_implicit());
        assert!(db.schemas().is_empty());
    }

    #[test]
    fn test_wrong_kind() {
        let err = Database::new(resource(ResourceKind::Role, "r")).unwrap_err();
        assert!(matches!(
            err,
            Error::WrongKind {
                expected: ResourceKind::Database,
                found: ResourceKind::Role
            }
        ));
    }

    #[test]
    fn test_schema_lookup() {
        let mut db = Database::named("sales").unwrap();
        db.add(resource(ResourceKind::Schema, "raw")).unwrap();
        assert!(db.schema_mut("RAW").is_some());
        assert!(db.schema_mut("public").is_some());
        assert!(db.schema_mut("missing").is_none());
    }
}
