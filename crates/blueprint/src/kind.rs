//! Resource kind registry.
//!
//! Each [`ResourceKind`] has a static [`KindSpec`]: the DDL keyword, the
//! containment scope, the editions it exists on, whether it takes an owner,
//! and the ordered list of properties it renders. The order of
//! [`KindSpec::props`] is the order options appear in generated statements.

use crate::scope::Scope;
use ddl::{Identifier, ParsableEnum, Prop, parsable_enum};
use regex::Regex;
use std::sync::LazyLock;

parsable_enum! {
    /// Account edition, which gates the kinds available on an account.
    pub enum Edition("account edition") {
        Standard => "STANDARD",
        Enterprise => "ENTERPRISE",
        BusinessCritical => "BUSINESS_CRITICAL",
    }
}

parsable_enum! {
    pub enum WarehouseType("warehouse type") {
        Standard => "STANDARD",
        SnowparkOptimized => "SNOWPARK-OPTIMIZED",
    }
}

parsable_enum! {
    pub enum WarehouseSize("warehouse size") {
        XSmall => "XSMALL",
        Small => "SMALL",
        Medium => "MEDIUM",
        Large => "LARGE",
        XLarge => "XLARGE",
        XXLarge => "XXLARGE",
        XXXLarge => "XXXLARGE",
        X4Large => "X4LARGE",
        X5Large => "X5LARGE",
        X6Large => "X6LARGE",
    }
}

parsable_enum! {
    pub enum ScalingPolicy("scaling policy") {
        Standard => "STANDARD",
        Economy => "ECONOMY",
    }
}

parsable_enum! {
    /// Node shape of a compute pool.
    pub enum InstanceFamily("instance family") {
        CpuX64Xs => "CPU_X64_XS",
        CpuX64S => "CPU_X64_S",
        CpuX64M => "CPU_X64_M",
        CpuX64L => "CPU_X64_L",
        HighmemX64S => "HIGHMEM_X64_S",
        HighmemX64M => "HIGHMEM_X64_M",
        HighmemX64L => "HIGHMEM_X64_L",
        GpuNvS => "GPU_NV_S",
        GpuNvM => "GPU_NV_M",
        GpuNvL => "GPU_NV_L",
    }
}

parsable_enum! {
    /// Reset interval of a resource monitor's credit quota.
    pub enum MonitorFrequency("monitor frequency") {
        Monthly => "MONTHLY",
        Daily => "DAILY",
        Weekly => "WEEKLY",
        Yearly => "YEARLY",
        Never => "NEVER",
    }
}

parsable_enum! {
    /// The closed set of object kinds a blueprint can manage.
    ///
    /// The canonical spelling is the DDL keyword, so `"compute_pool"` and
    /// `"COMPUTE POOL"` name the same kind.
    pub enum ResourceKind("resource kind") {
        Warehouse => "WAREHOUSE",
        ComputePool => "COMPUTE POOL",
        ResourceMonitor => "RESOURCE MONITOR",
        Role => "ROLE",
        User => "USER",
        Database => "DATABASE",
        DatabaseRole => "DATABASE ROLE",
        Schema => "SCHEMA",
        Sequence => "SEQUENCE",
        Tag => "TAG",
        Service => "SERVICE",
    }
}

/// How a changed property converges on an existing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    /// `ALTER ... SET` in place
    Alter,
    /// Needs the object dropped and recreated
    Replace,
    /// Only meaningful in `CREATE`; never compared against remote state
    CreateOnly,
}

/// A property slot of a kind.
#[derive(Debug, Clone, Copy)]
pub struct PropSpec {
    pub prop: Prop,
    /// DDL fragment applied when a definition omits the property
    pub default: Option<&'static str>,
    pub mutability: Mutability,
    /// Kind of the account object an identifier value names
    pub references: Option<ResourceKind>,
}

impl PropSpec {
    const fn alter(prop: Prop) -> Self {
        Self {
            prop,
            default: None,
            mutability: Mutability::Alter,
            references: None,
        }
    }

    const fn replace(prop: Prop) -> Self {
        Self {
            prop,
            default: None,
            mutability: Mutability::Replace,
            references: None,
        }
    }

    const fn create_only(prop: Prop) -> Self {
        Self {
            prop,
            default: None,
            mutability: Mutability::CreateOnly,
            references: None,
        }
    }

    const fn with_default(self, default: &'static str) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }

    const fn pointing_to(self, kind: ResourceKind) -> Self {
        Self {
            references: Some(kind),
            ..self
        }
    }

    pub fn name(&self) -> &'static str {
        self.prop.name
    }
}

/// Static description of a resource kind.
#[derive(Debug)]
pub struct KindSpec {
    pub scope: Scope,
    pub editions: &'static [Edition],
    pub ownable: bool,
    /// Role that owns new objects of this kind, or for kinds without an
    /// owner, the role that creates them
    pub default_owner: &'static str,
    /// Whether objects of this kind contain other objects
    pub container: bool,
    /// Whether objects of this kind run on a compute pool
    pub uses_compute_pool: bool,
    pub props: &'static [PropSpec],
}

/// Roles every account has.
const SYSTEM_ROLES: &[&str] = &[
    "ACCOUNTADMIN",
    "ORGADMIN",
    "PUBLIC",
    "SECURITYADMIN",
    "SYSADMIN",
    "USERADMIN",
];

/// Whether `name` is one of the roles the account provides.
pub fn is_system_role(name: &Identifier) -> bool {
    SYSTEM_ROLES.iter().any(|role| Identifier::from_static(role) == *name)
}

const ALL_EDITIONS: &[Edition] = Edition::VARIANTS;
const ENTERPRISE_EDITIONS: &[Edition] = &[Edition::Enterprise, Edition::BusinessCritical];

const COMMENT: PropSpec = PropSpec::alter(Prop::string("COMMENT"));
const TAGS: PropSpec = PropSpec::alter(Prop::tags());

static WAREHOUSE: KindSpec = KindSpec {
    scope: Scope::Account,
    editions: ALL_EDITIONS,
    ownable: true,
    default_owner: "SYSADMIN",
    container: false,
    uses_compute_pool: false,
    props: &[
        PropSpec::alter(Prop::enumeration::<WarehouseType>("WAREHOUSE_TYPE")).with_default("STANDARD"),
        PropSpec::alter(Prop::enumeration::<WarehouseSize>("WAREHOUSE_SIZE")).with_default("XSMALL"),
        PropSpec::alter(Prop::int("MAX_CLUSTER_COUNT")),
        PropSpec::alter(Prop::int("MIN_CLUSTER_COUNT")),
        PropSpec::alter(Prop::enumeration::<ScalingPolicy>("SCALING_POLICY")),
        PropSpec::alter(Prop::nullable_int("AUTO_SUSPEND")),
        PropSpec::alter(Prop::boolean("AUTO_RESUME")),
        PropSpec::create_only(Prop::boolean("INITIALLY_SUSPENDED")),
        PropSpec::alter(Prop::identifier("RESOURCE_MONITOR")).pointing_to(ResourceKind::ResourceMonitor),
        COMMENT,
        PropSpec::alter(Prop::boolean("ENABLE_QUERY_ACCELERATION")),
        PropSpec::alter(Prop::int("QUERY_ACCELERATION_MAX_SCALE_FACTOR")),
        PropSpec::alter(Prop::int("MAX_CONCURRENCY_LEVEL")),
        PropSpec::alter(Prop::int("STATEMENT_QUEUED_TIMEOUT_IN_SECONDS")),
        PropSpec::alter(Prop::int("STATEMENT_TIMEOUT_IN_SECONDS")),
        TAGS,
    ],
};

static COMPUTE_POOL: KindSpec = KindSpec {
    scope: Scope::Account,
    editions: ALL_EDITIONS,
    ownable: true,
    default_owner: "SYSADMIN",
    container: false,
    uses_compute_pool: false,
    props: &[
        PropSpec::alter(Prop::int("MIN_NODES")).with_default("1"),
        PropSpec::alter(Prop::int("MAX_NODES")).with_default("1"),
        PropSpec::replace(Prop::enumeration::<InstanceFamily>("INSTANCE_FAMILY")).with_default("CPU_X64_XS"),
        PropSpec::alter(Prop::boolean("AUTO_RESUME")),
        PropSpec::create_only(Prop::boolean("INITIALLY_SUSPENDED")),
        PropSpec::alter(Prop::int("AUTO_SUSPEND_SECS")),
        COMMENT,
    ],
};

static RESOURCE_MONITOR: KindSpec = KindSpec {
    scope: Scope::Account,
    editions: ALL_EDITIONS,
    ownable: false,
    default_owner: "ACCOUNTADMIN",
    container: false,
    uses_compute_pool: false,
    props: &[
        PropSpec::alter(Prop::int("CREDIT_QUOTA")),
        PropSpec::alter(Prop::enumeration::<MonitorFrequency>("FREQUENCY")),
        PropSpec::alter(Prop::string("START_TIMESTAMP")),
        PropSpec::alter(Prop::string("END_TIMESTAMP")),
    ],
};

static ROLE: KindSpec = KindSpec {
    scope: Scope::Account,
    editions: ALL_EDITIONS,
    ownable: true,
    default_owner: "USERADMIN",
    container: false,
    uses_compute_pool: false,
    props: &[COMMENT, TAGS],
};

static USER: KindSpec = KindSpec {
    scope: Scope::Account,
    editions: ALL_EDITIONS,
    ownable: true,
    default_owner: "USERADMIN",
    container: false,
    uses_compute_pool: false,
    props: &[
        PropSpec::alter(Prop::upper_string("LOGIN_NAME")),
        PropSpec::alter(Prop::string("DISPLAY_NAME")),
        PropSpec::alter(Prop::string("FIRST_NAME")),
        PropSpec::alter(Prop::string("LAST_NAME")),
        PropSpec::alter(Prop::string("EMAIL")),
        PropSpec::alter(Prop::boolean("DISABLED")),
        PropSpec::alter(Prop::boolean("MUST_CHANGE_PASSWORD")),
        PropSpec::alter(Prop::identifier("DEFAULT_WAREHOUSE")).pointing_to(ResourceKind::Warehouse),
        PropSpec::alter(Prop::string("DEFAULT_NAMESPACE")),
        PropSpec::alter(Prop::identifier("DEFAULT_ROLE")).pointing_to(ResourceKind::Role),
        COMMENT,
        TAGS,
    ],
};

static DATABASE: KindSpec = KindSpec {
    scope: Scope::Account,
    editions: ALL_EDITIONS,
    ownable: true,
    default_owner: "SYSADMIN",
    container: true,
    uses_compute_pool: false,
    props: &[
        PropSpec::alter(Prop::int("DATA_RETENTION_TIME_IN_DAYS")).with_default("1"),
        PropSpec::alter(Prop::int("MAX_DATA_EXTENSION_TIME_IN_DAYS")).with_default("14"),
        PropSpec::alter(Prop::string("DEFAULT_DDL_COLLATION")),
        COMMENT,
        TAGS,
    ],
};

static DATABASE_ROLE: KindSpec = KindSpec {
    scope: Scope::Database,
    editions: ALL_EDITIONS,
    ownable: true,
    default_owner: "SYSADMIN",
    container: false,
    uses_compute_pool: false,
    props: &[COMMENT],
};

static SCHEMA: KindSpec = KindSpec {
    scope: Scope::Database,
    editions: ALL_EDITIONS,
    ownable: true,
    default_owner: "SYSADMIN",
    container: true,
    uses_compute_pool: false,
    props: &[
        PropSpec::alter(Prop::int("DATA_RETENTION_TIME_IN_DAYS")),
        PropSpec::alter(Prop::int("MAX_DATA_EXTENSION_TIME_IN_DAYS")),
        PropSpec::alter(Prop::string("DEFAULT_DDL_COLLATION")),
        COMMENT,
        TAGS,
    ],
};

static SEQUENCE: KindSpec = KindSpec {
    scope: Scope::Schema,
    editions: ALL_EDITIONS,
    ownable: true,
    default_owner: "SYSADMIN",
    container: false,
    uses_compute_pool: false,
    props: &[
        PropSpec::replace(Prop::int("START")).with_default("1"),
        PropSpec::alter(Prop::int("INCREMENT")).with_default("1"),
        COMMENT,
    ],
};

static TAG: KindSpec = KindSpec {
    scope: Scope::Schema,
    editions: ENTERPRISE_EDITIONS,
    ownable: true,
    default_owner: "SYSADMIN",
    container: false,
    uses_compute_pool: false,
    props: &[COMMENT],
};

static SERVICE: KindSpec = KindSpec {
    scope: Scope::Schema,
    editions: ENTERPRISE_EDITIONS,
    ownable: true,
    default_owner: "SYSADMIN",
    container: false,
    uses_compute_pool: true,
    props: &[
        PropSpec::replace(Prop::string("SPECIFICATION")),
        PropSpec::alter(Prop::int("MIN_INSTANCES")),
        PropSpec::alter(Prop::int("MAX_INSTANCES")),
        PropSpec::alter(Prop::identifier("QUERY_WAREHOUSE")).pointing_to(ResourceKind::Warehouse),
        PropSpec::alter(Prop::boolean("AUTO_RESUME")),
        COMMENT,
    ],
};

/// `CREATE` patterns, one per kind in declaration order.
///
/// The identifier must be followed by the end of the statement or by
/// something that opens an option list, so `CREATE DATABASE ROLE R` never
/// reads as a database named `ROLE`.
static CREATE_PATTERNS: LazyLock<Vec<Result<Regex, regex::Error>>> = LazyLock::new(|| {
    ResourceKind::VARIANTS
        .iter()
        .map(|kind| {
            let keyword = kind.as_str().split(' ').collect::<Vec<_>>().join(r"\s+");
            let pattern = format!(
                r"(?is)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?{keyword}\s+(?:IF\s+NOT\s+EXISTS\s+)?({ident})(?:\s*;?\s*$|\s+WITH\b|\s+TAG\s*\(|\s+[A-Za-z_][A-Za-z0-9_]*\s*=)",
                ident = ddl::identifier::PATTERN,
            );
            Regex::new(&pattern)
        })
        .collect()
});

impl ResourceKind {
    pub fn spec(&self) -> &'static KindSpec {
        match self {
            Self::Warehouse => &WAREHOUSE,
            Self::ComputePool => &COMPUTE_POOL,
            Self::ResourceMonitor => &RESOURCE_MONITOR,
            Self::Role => &ROLE,
            Self::User => &USER,
            Self::Database => &DATABASE,
            Self::DatabaseRole => &DATABASE_ROLE,
            Self::Schema => &SCHEMA,
            Self::Sequence => &SEQUENCE,
            Self::Tag => &TAG,
            Self::Service => &SERVICE,
        }
    }

    /// DDL keyword, e.g. `COMPUTE POOL`.
    pub fn keyword(&self) -> &'static str {
        self.as_str()
    }

    /// Lower-case label used in URNs, e.g. `compute_pool`.
    pub fn label(&self) -> String {
        self.as_str().to_ascii_lowercase().replace(' ', "_")
    }

    pub fn scope(&self) -> Scope {
        self.spec().scope
    }

    pub fn props(&self) -> &'static [PropSpec] {
        self.spec().props
    }

    /// Property slot by case-insensitive name.
    pub fn prop(&self, name: &str) -> Option<(usize, &'static PropSpec)> {
        self.props()
            .iter()
            .enumerate()
            .find(|(_, spec)| spec.name().eq_ignore_ascii_case(name))
    }

    pub fn supports(&self, edition: Edition) -> bool {
        self.spec().editions.contains(&edition)
    }

    fn create_pattern(&self) -> Option<&'static Regex> {
        let index = Self::VARIANTS.iter().position(|kind| kind == self)?;
        CREATE_PATTERNS.get(index)?.as_ref().ok()
    }

    /// Extract the object name from an observed `CREATE` statement of this
    /// kind.
    ///
    /// Returns the name and the text following it, or `None` when the text
    /// is not a `CREATE` statement for this kind.
    pub fn match_create<'a>(&self, text: &'a str) -> Option<(Identifier, &'a str)> {
        let captures = self.create_pattern()?.captures(text)?;
        let name = captures.get(1)?;
        let ident = Identifier::parse(name.as_str()).ok()?;
        Some((ident, &text[name.end()..]))
    }

    /// Name of the object an observed `CREATE` statement of this kind
    /// creates.
    pub fn parse_identity(&self, text: &str) -> Option<Identifier> {
        self.match_create(text).map(|(name, _)| name)
    }

    /// Detect which kind an observed `CREATE` statement creates.
    pub fn detect(text: &str) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .copied()
            .find(|kind| kind.create_pattern().is_some_and(|pattern| pattern.is_match(text)))
    }

    /// Kinds in keyword length order, longest first, so multi-word keywords
    /// are tried before their prefixes.
    pub(crate) fn by_keyword_length() -> Vec<Self> {
        let mut kinds = Self::VARIANTS.to_vec();
        kinds.sort_by_key(|kind| std::cmp::Reverse(kind.keyword().len()));
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_accepts_labels_and_keywords() {
        assert_eq!(ResourceKind::parse("compute_pool").unwrap(), ResourceKind::ComputePool);
        assert_eq!(ResourceKind::parse("Database Role").unwrap(), ResourceKind::DatabaseRole);
        assert_eq!(ResourceKind::ComputePool.label(), "compute_pool");
        assert!(ResourceKind::parse("pipe").is_err());
    }

    #[test]
    fn test_every_kind_has_valid_defaults() {
        for kind in ResourceKind::VARIANTS {
            for spec in kind.props() {
                if let Some(default) = spec.default {
                    assert!(spec.prop.parse(default).is_ok(), "{kind} {}", spec.name());
                }
            }
        }
    }

    #[test]
    fn test_prop_names_unique_per_kind() {
        for kind in ResourceKind::VARIANTS {
            let mut names: Vec<_> = kind.props().iter().map(PropSpec::name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), kind.props().len(), "{kind}");
        }
    }

    #[test]
    fn test_create_patterns_compile() {
        for kind in ResourceKind::VARIANTS {
            assert!(kind.create_pattern().is_some(), "{kind}");
        }
    }

    #[test]
    fn test_parse_identity_warehouse() {
        let kind = ResourceKind::Warehouse;
        for text in [
            "CREATE WAREHOUSE analytics_wh",
            "create or replace warehouse ANALYTICS_WH WAREHOUSE_SIZE = XSMALL",
            "CREATE WAREHOUSE IF NOT EXISTS analytics_wh WITH COMMENT = 'x'",
            "CREATE\n  WAREHOUSE\tanalytics_wh;",
        ] {
            assert_eq!(kind.parse_identity(text).unwrap().as_str(), "ANALYTICS_WH", "{text}");
        }
        assert_eq!(kind.parse_identity("CREATE DATABASE analytics_wh"), None);
        assert_eq!(kind.parse_identity("DROP WAREHOUSE analytics_wh"), None);
    }

    #[test]
    fn test_parse_identity_quoted() {
        let name = ResourceKind::User
            .parse_identity(r#"CREATE USER "info@example.com" LOGIN_NAME = 'x'"#)
            .unwrap();
        assert!(name.is_quoted());
        assert_eq!(name.as_str(), "info@example.com");
    }

    #[test]
    fn test_multiword_keywords_do_not_shadow() {
        let text = "CREATE DATABASE ROLE analyst COMMENT = 'x'";
        assert_eq!(ResourceKind::Database.parse_identity(text), None);
        assert_eq!(ResourceKind::DatabaseRole.parse_identity(text).unwrap().as_str(), "ANALYST");
        assert_eq!(ResourceKind::detect(text), Some(ResourceKind::DatabaseRole));
        assert_eq!(ResourceKind::detect("CREATE DATABASE ROLE"), Some(ResourceKind::Database));
    }

    #[test]
    fn test_identifier_props_point_at_account_kinds() {
        for kind in ResourceKind::VARIANTS {
            for spec in kind.props() {
                if let Some(target) = spec.references {
                    assert!(matches!(spec.prop.kind, ddl::PropKind::Identifier), "{kind} {}", spec.name());
                    assert_eq!(target.scope(), Scope::Account, "{kind} {}", spec.name());
                }
            }
        }
        let (_, spec) = ResourceKind::Warehouse.prop("resource_monitor").unwrap();
        assert_eq!(spec.references, Some(ResourceKind::ResourceMonitor));
    }

    #[test]
    fn test_system_roles() {
        assert!(is_system_role(&Identifier::parse("sysadmin").unwrap()));
        assert!(!is_system_role(&Identifier::parse("analyst").unwrap()));
    }

    #[test]
    fn test_edition_support() {
        assert!(ResourceKind::Warehouse.supports(Edition::Standard));
        assert!(!ResourceKind::Tag.supports(Edition::Standard));
        assert!(ResourceKind::Tag.supports(Edition::BusinessCritical));
        assert!(!ResourceKind::Service.supports(Edition::Standard));
    }

    #[test]
    fn test_prop_lookup_is_case_insensitive() {
        let (index, spec) = ResourceKind::Warehouse.prop("warehouse_size").unwrap();
        assert_eq!(index, 1);
        assert_eq!(spec.default, Some("XSMALL"));
        assert!(ResourceKind::Warehouse.prop("size").is_none());
    }
}
