//! Desired-state resources.
//!
//! A [`Resource`] is one object of a [`ResourceKind`]: a name, an owner, the
//! container it lives in, and one optional value per property slot the kind
//! declares. Resources render to `CREATE`/`ALTER`/`DROP` statements and can
//! be read back from the `CREATE` statements they render.

use crate::connection::Descriptor;
use crate::error::{Error, Result};
use crate::kind::{Mutability, PropSpec, ResourceKind, is_system_role};
use crate::scope::Scope;
use ddl::{Identifier, PropValue};
use serde_json::Value;
use std::fmt;

/// The container path of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub database: Option<Identifier>,
    pub schema: Option<Identifier>,
}

impl Location {
    pub fn account() -> Self {
        Self::default()
    }

    pub fn database(database: Identifier) -> Self {
        Self {
            database: Some(database),
            schema: None,
        }
    }

    pub fn schema(database: Identifier, schema: Identifier) -> Self {
        Self {
            database: Some(database),
            schema: Some(schema),
        }
    }

    pub fn is_account(&self) -> bool {
        self.database.is_none() && self.schema.is_none()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.database, &self.schema) {
            (Some(db), Some(schema)) => write!(f, "{db}.{schema}"),
            (Some(db), None) => write!(f, "{db}"),
            (None, Some(schema)) => write!(f, "?.{schema}"),
            (None, None) => f.write_str("account"),
        }
    }
}

/// Unique name of a resource: kind, container path and object name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Urn {
    pub kind: ResourceKind,
    pub location: Location,
    pub name: Identifier,
}

impl Urn {
    /// Dotted name, e.g. `ANALYTICS.PUBLIC.ORDER_SEQ`.
    pub fn fqn(&self) -> String {
        match (&self.location.database, &self.location.schema) {
            (Some(db), Some(schema)) => format!("{db}.{schema}.{}", self.name),
            (Some(db), None) => format!("{db}.{}", self.name),
            _ => self.name.to_string(),
        }
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.label(), self.fqn())
    }
}

/// A desired object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    kind: ResourceKind,
    name: Identifier,
    /// Owner for ownable kinds, creating role otherwise
    role: Identifier,
    location: Location,
    compute_pool: Option<Identifier>,
    values: Vec<Option<PropValue>>,
}

impl Resource {
    /// A resource with only a name; kind defaults apply.
    pub fn new(kind: ResourceKind, name: &str) -> Result<Self> {
        Self::from_attrs(kind, [("name", Value::String(name.to_string()))])
    }

    /// Build a resource from named attributes.
    ///
    /// Recognised keys are `name`, `owner`, `database` and `schema` (where
    /// the kind's scope allows them), `compute_pool` for kinds that run on
    /// one, and the kind's property names in any case. Properties left out
    /// take the kind's defaults.
    pub fn from_attrs<I, K>(kind: ResourceKind, attrs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let spec = kind.spec();
        let mut name = None;
        let mut owner = None;
        let mut location = Location::default();
        let mut compute_pool = None;
        let mut misplaced = None;
        let mut values = vec![None; spec.props.len()];

        for (key, value) in attrs {
            let key = key.as_ref();
            match key.to_ascii_lowercase().as_str() {
                "name" => name = Some(name_attr(key, &value)?),
                "owner" if spec.ownable => owner = Some(name_attr(key, &value)?),
                "owner" => return Err(Error::NotOwnable { kind }),
                "database" if spec.scope != Scope::Account => {
                    location.database = Some(name_attr(key, &value)?);
                }
                "schema" if spec.scope == Scope::Schema => {
                    location.schema = Some(name_attr(key, &value)?);
                }
                "compute_pool" if spec.uses_compute_pool => {
                    compute_pool = Some(name_attr(key, &value)?);
                }
                "database" | "schema" => misplaced = Some(key.to_string()),
                _ => {
                    let (index, prop) = kind.prop(key).ok_or_else(|| Error::UnknownProperty {
                        kind,
                        property: key.to_string(),
                    })?;
                    values[index] = Some(prop.prop.coerce(&value)?);
                }
            }
        }

        let name = name.ok_or(Error::MissingName { kind })?;
        if let Some(container) = misplaced {
            return Err(Error::InvalidScope {
                kind,
                name: name.to_string(),
                container,
            });
        }

        let role = match owner {
            Some(owner) => owner,
            None => Identifier::parse(spec.default_owner)?,
        };
        let mut resource = Self {
            kind,
            name,
            role,
            location,
            compute_pool,
            values,
        };
        resource.apply_defaults()?;
        Ok(resource)
    }

    fn apply_defaults(&mut self) -> Result<()> {
        for (slot, spec) in self.values.iter_mut().zip(self.kind.props()) {
            if let Some(default) = spec.default.filter(|_| slot.is_none()) {
                *slot = Some(spec.prop.parse(default)?);
            }
        }
        Ok(())
    }

    /// Read a resource back from a `CREATE` statement.
    ///
    /// The statement carries no container path; the result is placed at
    /// account level and can be relocated with [`Resource::at`].
    pub fn from_sql(text: &str) -> Result<Self> {
        let kind = ResourceKind::detect(text).ok_or_else(|| Error::unrecognized(text))?;
        let (name, options) = kind
            .match_create(text)
            .ok_or_else(|| Error::unrecognized(text))?;

        let mut resource = Self::new(kind, name.as_str())?;
        resource.name = name;
        resource.values.fill(None);
        for option in ddl::split_options(options)? {
            let (index, spec) = kind.prop(&option.key).ok_or_else(|| Error::UnknownProperty {
                kind,
                property: option.key.clone(),
            })?;
            resource.values[index] = Some(spec.prop.parse(&option.value)?);
        }
        resource.apply_defaults()?;
        Ok(resource)
    }

    /// Rebuild a resource from an observed descriptor.
    pub fn from_descriptor(kind: ResourceKind, location: Location, descriptor: &Descriptor) -> Result<Self> {
        let mut resource = Self::new(kind, descriptor.name.as_str())?;
        resource.name = descriptor.name.clone();
        resource.location = location;
        resource.values.fill(None);
        if let (true, Some(owner)) = (kind.spec().ownable, &descriptor.owner) {
            resource.role = owner.clone();
        }
        for (key, fragment) in &descriptor.properties {
            let (index, spec) = kind.prop(key).ok_or_else(|| Error::UnknownProperty {
                kind,
                property: key.clone(),
            })?;
            resource.values[index] = Some(spec.prop.parse(fragment)?);
        }
        Ok(resource)
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Owner, for kinds that have one.
    pub fn owner(&self) -> Option<&Identifier> {
        self.kind.spec().ownable.then_some(&self.role)
    }

    /// Role statements for this resource run under.
    pub fn role(&self) -> &Identifier {
        &self.role
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn compute_pool(&self) -> Option<&Identifier> {
        self.compute_pool.as_ref()
    }

    pub fn urn(&self) -> Urn {
        Urn {
            kind: self.kind,
            location: self.location.clone(),
            name: self.name.clone(),
        }
    }

    /// Same resource placed in another container.
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub(crate) fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    /// Current value of a property.
    pub fn get(&self, prop: &str) -> Option<&PropValue> {
        let (index, _) = self.kind.prop(prop)?;
        self.values[index].as_ref()
    }

    /// Set a property from a record value.
    pub fn set(&mut self, prop: &str, value: &Value) -> Result<()> {
        let (index, spec) = self.kind.prop(prop).ok_or_else(|| Error::UnknownProperty {
            kind: self.kind,
            property: prop.to_string(),
        })?;
        self.values[index] = Some(spec.prop.coerce(value)?);
        Ok(())
    }

    pub fn set_owner(&mut self, owner: &str) -> Result<()> {
        if !self.kind.spec().ownable {
            return Err(Error::NotOwnable { kind: self.kind });
        }
        self.role = Identifier::from_name(owner)?;
        Ok(())
    }

    /// Present property values in declaration order.
    pub fn values(&self) -> impl Iterator<Item = (&'static PropSpec, &PropValue)> {
        self.kind
            .props()
            .iter()
            .zip(&self.values)
            .filter_map(|(spec, value)| value.as_ref().map(|value| (spec, value)))
    }

    /// Account objects this resource names and needs to exist: an owner
    /// other than a system role, the compute pool it runs on, and
    /// identifier properties such as `RESOURCE_MONITOR`.
    pub fn references(&self) -> Vec<Urn> {
        let account = |kind: ResourceKind, name: &Identifier| Urn {
            kind,
            location: Location::account(),
            name: name.clone(),
        };

        let mut refs = Vec::new();
        if let Some(owner) = self.owner().filter(|owner| !is_system_role(owner)) {
            refs.push(account(ResourceKind::Role, owner));
        }
        if let Some(pool) = &self.compute_pool {
            refs.push(account(ResourceKind::ComputePool, pool));
        }
        for (spec, value) in self.values() {
            if let (Some(kind), PropValue::Ident(name)) = (spec.references, value) {
                refs.push(account(kind, name));
            }
        }
        refs
    }

    /// Name of the object an observed `CREATE` statement for this kind
    /// creates.
    pub fn parse_identity(&self, text: &str) -> Option<Identifier> {
        self.kind.parse_identity(text)
    }

    pub fn create_sql(&self, if_not_exists: bool) -> String {
        let mut parts = vec!["CREATE".to_string(), self.kind.keyword().to_string()];
        if if_not_exists {
            parts.push("IF NOT EXISTS".to_string());
        }
        parts.push(self.name.to_string());
        parts.extend(
            self.kind
                .props()
                .iter()
                .zip(&self.values)
                .filter_map(|(spec, value)| spec.prop.render(value.as_ref())),
        );
        parts.join(" ")
    }

    pub fn drop_sql(&self, if_exists: bool) -> String {
        let guard = if if_exists { "IF EXISTS " } else { "" };
        format!("DROP {} {guard}{}", self.kind.keyword(), self.name)
    }

    /// `ALTER ... SET` for the named properties, in declaration order.
    ///
    /// Returns `None` when none of them has a value.
    pub fn alter_sql(&self, props: &[&str]) -> Option<String> {
        let assignments: Vec<String> = self
            .kind
            .props()
            .iter()
            .zip(&self.values)
            .filter(|(spec, _)| props.iter().any(|p| p.eq_ignore_ascii_case(spec.name())))
            .filter_map(|(spec, value)| spec.prop.render(value.as_ref()))
            .collect();

        if assignments.is_empty() {
            return None;
        }
        Some(format!(
            "ALTER {} {} SET {}",
            self.kind.keyword(),
            self.name,
            assignments.join(" ")
        ))
    }

    /// Observed form of this resource, as a connection would report it.
    ///
    /// Create-only properties are not reported.
    pub fn describe(&self) -> Descriptor {
        Descriptor {
            name: self.name.clone(),
            owner: self.owner().cloned(),
            properties: self
                .values()
                .filter(|(spec, _)| spec.mutability != Mutability::CreateOnly)
                .map(|(spec, value)| (spec.name().to_string(), spec.prop.render_value(value)))
                .collect(),
        }
    }
}

fn name_attr(key: &str, value: &Value) -> Result<Identifier> {
    match value {
        Value::String(s) => Ok(Identifier::from_name(s)?),
        other => Err(ddl::Error::invalid_value(key, format!("expected a name, got {other}")).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddl::ParsableEnum;
    use serde_json::json;

    fn warehouse(attrs: Value) -> Result<Resource> {
        let Value::Object(map) = attrs else { panic!("object expected") };
        Resource::from_attrs(ResourceKind::Warehouse, map)
    }

    #[test]
    fn test_warehouse_create_sql_defaults() {
        let wh = Resource::new(ResourceKind::Warehouse, "analytics_wh").unwrap();
        assert_eq!(
            wh.create_sql(false),
            "CREATE WAREHOUSE ANALYTICS_WH WAREHOUSE_TYPE = STANDARD WAREHOUSE_SIZE = XSMALL"
        );
        assert_eq!(wh.owner().unwrap().as_str(), "SYSADMIN");
    }

    #[test]
    fn test_create_sql_declared_order() {
        let wh = warehouse(json!({
            "comment": "Bob's warehouse",
            "auto_suspend": 60,
            "warehouse_size": "small",
            "name": "wh",
        }))
        .unwrap();
        assert_eq!(
            wh.create_sql(true),
            r"CREATE WAREHOUSE IF NOT EXISTS WH WAREHOUSE_TYPE = STANDARD WAREHOUSE_SIZE = SMALL AUTO_SUSPEND = 60 COMMENT = 'Bob\'s warehouse'"
        );
    }

    #[test]
    fn test_snowpark_type_renders_quoted() {
        let wh = warehouse(json!({"name": "wh", "warehouse_type": "SNOWPARK-OPTIMIZED"})).unwrap();
        assert!(wh.create_sql(false).contains("WAREHOUSE_TYPE = 'SNOWPARK-OPTIMIZED'"));
        let back = Resource::from_sql(&wh.create_sql(false)).unwrap();
        assert_eq!(back, wh);
    }

    #[test]
    fn test_invalid_enum_value_fails_construction() {
        let err = warehouse(json!({"name": "wh", "warehouse_size": "XXS"})).unwrap_err();
        assert!(matches!(err, Error::Ddl(ddl::Error::InvalidEnumValue { .. })));
    }

    #[test]
    fn test_unknown_property() {
        let err = warehouse(json!({"name": "wh", "size": "XSMALL"})).unwrap_err();
        assert!(matches!(err, Error::UnknownProperty { property, .. } if property == "size"));
    }

    #[test]
    fn test_missing_name() {
        let err = warehouse(json!({"comment": "x"})).unwrap_err();
        assert!(matches!(err, Error::MissingName { kind: ResourceKind::Warehouse }));
    }

    #[test]
    fn test_not_ownable() {
        let err = Resource::from_attrs(
            ResourceKind::ResourceMonitor,
            [("name", json!("cap")), ("owner", json!("SYSADMIN"))],
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotOwnable { .. }));

        let monitor = Resource::new(ResourceKind::ResourceMonitor, "cap").unwrap();
        assert_eq!(monitor.owner(), None);
        assert_eq!(monitor.role().as_str(), "ACCOUNTADMIN");
    }

    #[test]
    fn test_database_attr_on_account_kind_is_invalid_scope() {
        let err = warehouse(json!({"name": "wh", "database": "db"})).unwrap_err();
        assert!(matches!(err, Error::InvalidScope { container, .. } if container == "database"));
    }

    #[test]
    fn test_scoped_attrs_set_location() {
        let seq = Resource::from_attrs(
            ResourceKind::Sequence,
            [("name", json!("seq")), ("database", json!("db")), ("schema", json!("raw"))],
        )
        .unwrap();
        assert_eq!(seq.urn().to_string(), "sequence:DB.RAW.SEQ");
    }

    #[test]
    fn test_from_sql_round_trip() {
        let db = Resource::from_sql(
            "CREATE DATABASE THIS_DATABASE_DOES_NOT_EXIST DATA_RETENTION_TIME_IN_DAYS = 1 MAX_DATA_EXTENSION_TIME_IN_DAYS = 14",
        )
        .unwrap();
        assert_eq!(db.kind(), ResourceKind::Database);
        assert_eq!(db.name().as_str(), "THIS_DATABASE_DOES_NOT_EXIST");
        assert_eq!(db, Resource::new(ResourceKind::Database, "this_database_does_not_exist").unwrap());
    }

    /// One value from each enum domain the kinds use.
    const ENUM_SAMPLES: &[&str] = &["SNOWPARK-OPTIMIZED", "LARGE", "ECONOMY", "GPU_NV_S", "WEEKLY"];

    fn sample(spec: &PropSpec) -> Value {
        match spec.prop.kind {
            ddl::PropKind::String { .. } => json!("sample value"),
            ddl::PropKind::Int { .. } => json!(7),
            ddl::PropKind::Bool => json!(true),
            ddl::PropKind::Enum { parse, domain } => {
                let variant = ENUM_SAMPLES
                    .iter()
                    .copied()
                    .find(|raw| parse(raw).is_ok())
                    .unwrap_or_else(|| panic!("no sample for {domain}"));
                json!(variant)
            }
            ddl::PropKind::Identifier => json!("sample_ref"),
            ddl::PropKind::Tags => json!({"team": "data", "env": "prod"}),
        }
    }

    #[test]
    fn test_every_kind_round_trips_with_all_props() {
        for kind in ResourceKind::VARIANTS {
            let mut attrs = vec![("name".to_string(), json!("sample_obj"))];
            attrs.extend(kind.props().iter().map(|spec| (spec.name().to_string(), sample(spec))));
            let resource = Resource::from_attrs(*kind, attrs).unwrap();
            assert_eq!(resource.values().count(), kind.props().len(), "{kind}");

            let sql = resource.create_sql(false);
            assert_eq!(resource.parse_identity(&sql).as_ref(), Some(resource.name()), "{sql}");
            let back = Resource::from_sql(&sql).unwrap();
            assert_eq!(back, resource, "{sql}");
            assert_eq!(back.create_sql(false), sql);
        }
    }

    #[test]
    fn test_from_sql_tags_and_with() {
        let role = Resource::from_sql("CREATE ROLE analyst WITH COMMENT = 'reads' TAG (team = 'data');").unwrap();
        assert_eq!(role.get("comment"), Some(&PropValue::Str("reads".to_string())));
        assert_eq!(
            role.create_sql(false),
            "CREATE ROLE ANALYST COMMENT = 'reads' TAG (TEAM = 'data')"
        );
    }

    #[test]
    fn test_from_sql_rejects_unknown_option() {
        let err = Resource::from_sql("CREATE ROLE analyst COLOR = 'blue'").unwrap_err();
        assert!(matches!(err, Error::UnknownProperty { .. }));
        assert!(matches!(Resource::from_sql("SELECT 1"), Err(Error::UnrecognizedStatement(_))));
    }

    #[test]
    fn test_drop_and_alter_sql() {
        let mut wh = Resource::new(ResourceKind::Warehouse, "wh").unwrap();
        assert_eq!(wh.drop_sql(false), "DROP WAREHOUSE WH");
        assert_eq!(wh.drop_sql(true), "DROP WAREHOUSE IF EXISTS WH");

        wh.set("auto_suspend", &json!(120)).unwrap();
        assert_eq!(
            wh.alter_sql(&["WAREHOUSE_SIZE", "auto_suspend"]).unwrap(),
            "ALTER WAREHOUSE WH SET WAREHOUSE_SIZE = XSMALL AUTO_SUSPEND = 120"
        );
        assert_eq!(wh.alter_sql(&["COMMENT"]), None);
    }

    #[test]
    fn test_parse_identity() {
        let user = Resource::new(ResourceKind::User, "someuser").unwrap();
        assert_eq!(
            user.parse_identity("CREATE USER someuser DISPLAY_NAME = 'x'").unwrap(),
            *user.name()
        );
        assert_eq!(user.parse_identity("CREATE ROLE someuser"), None);
    }

    #[test]
    fn test_references() {
        let wh = warehouse(json!({"name": "wh", "owner": "loader", "resource_monitor": "cap"})).unwrap();
        let refs: Vec<String> = wh.references().iter().map(ToString::to_string).collect();
        assert_eq!(refs, vec!["role:LOADER", "resource_monitor:CAP"]);

        let svc = Resource::from_attrs(
            ResourceKind::Service,
            [
                ("name", json!("svc")),
                ("compute_pool", json!("pool")),
                ("query_warehouse", json!("wh")),
            ],
        )
        .unwrap();
        let refs: Vec<String> = svc.references().iter().map(ToString::to_string).collect();
        assert_eq!(refs, vec!["compute_pool:POOL", "warehouse:WH"]);

        assert!(Resource::new(ResourceKind::Warehouse, "wh").unwrap().references().is_empty());
    }

    #[test]
    fn test_describe_skips_create_only() {
        let wh = warehouse(json!({"name": "wh", "initially_suspended": true, "auto_resume": false})).unwrap();
        let descriptor = wh.describe();
        assert_eq!(descriptor.get("INITIALLY_SUSPENDED"), None);
        assert_eq!(descriptor.get("AUTO_RESUME"), Some("FALSE"));
        assert_eq!(descriptor.owner.unwrap().as_str(), "SYSADMIN");
    }

    #[test]
    fn test_from_descriptor() {
        let seq = Resource::from_attrs(ResourceKind::Sequence, [("name", json!("seq")), ("start", json!(5))]).unwrap();
        let location = Location::schema(Identifier::parse("DB").unwrap(), Identifier::parse("PUBLIC").unwrap());
        let back = Resource::from_descriptor(ResourceKind::Sequence, location.clone(), &seq.describe()).unwrap();
        assert_eq!(back, seq.at(location));
    }
}
