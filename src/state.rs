//! Account snapshots.
//!
//! `floe` has no network transport of its own; it plans and applies
//! against a snapshot of an account kept as TOML. Loading a snapshot seeds
//! an in-memory connection, and applying writes the resulting catalog back.

use anyhow::{Context, Result};
use blueprint::{Connection, Edition, Location, MemoryConnection, Resource};
use chrono::{DateTime, Utc};
use ddl::Identifier;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One observed object: the statement that creates it and where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub sql: String,
}

impl ObjectState {
    fn location(&self) -> Result<Location> {
        let name = |raw: &Option<String>| raw.as_deref().map(Identifier::from_name).transpose();
        Ok(Location {
            database: name(&self.database)?,
            schema: name(&self.schema)?,
        })
    }
}

/// A point-in-time view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub account: String,
    pub account_edition: Edition,
    /// Role the session starts in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "object")]
    pub objects: Vec<ObjectState>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            account: "local".to_string(),
            account_edition: Edition::Standard,
            role: None,
            updated_at: None,
            objects: Vec::new(),
        }
    }
}

impl Snapshot {
    /// Load a snapshot, or an empty account if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Snapshot {} does not exist, starting empty", path.display());
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        let snapshot: Self =
            toml::from_str(&content).with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;
        log::debug!("Loaded {} object(s) from {}", snapshot.objects.len(), path.display());
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create snapshot directory: {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize snapshot to TOML")?;
        fs::write(path, content).with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
        log::debug!("Saved snapshot to {}", path.display());
        Ok(())
    }

    /// A connection holding this snapshot's objects.
    pub fn connect(&self) -> Result<MemoryConnection> {
        let mut conn = MemoryConnection::new(self.account.clone(), self.account_edition);
        for object in &self.objects {
            let mut resource = Resource::from_sql(&object.sql)
                .with_context(|| format!("Invalid object in snapshot: {}", object.sql))?
                .at(object.location()?);
            if let Some(owner) = &object.owner {
                resource.set_owner(owner)?;
            }
            conn.seed_resource(&resource);
        }
        if let Some(role) = &self.role {
            conn.execute(&format!("USE ROLE {}", Identifier::from_name(role)?))
                .with_context(|| format!("Could not start session as {role}"))?;
        }
        Ok(conn)
    }

    /// Record what a connection holds now.
    pub fn capture(conn: &MemoryConnection) -> Result<Self> {
        let session = conn.session()?;
        let mut objects = Vec::new();
        for (urn, descriptor) in conn.objects() {
            let resource = Resource::from_descriptor(urn.kind, urn.location.clone(), descriptor)?;
            objects.push(ObjectState {
                database: urn.location.database.as_ref().map(ToString::to_string),
                schema: urn.location.schema.as_ref().map(ToString::to_string),
                owner: resource.owner().map(ToString::to_string),
                sql: resource.create_sql(false),
            });
        }

        Ok(Self {
            account: session.account,
            account_edition: session.account_edition,
            role: session.role.map(|role| role.to_string()),
            updated_at: Some(Utc::now()),
            objects,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint::{ResourceKind, Urn};

    const SNAPSHOT: &str = r#"
account = "acme"
account_edition = "enterprise"
role = "sysadmin"

[[object]]
sql = "CREATE DATABASE sales"

[[object]]
database = "sales"
schema = "public"
owner = "loader"
sql = "CREATE SEQUENCE order_seq START = 10"
"#;

    #[test]
    fn test_missing_snapshot_is_empty_account() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::load(&dir.path().join("state.toml")).unwrap();
        assert_eq!(snapshot, Snapshot::default());
        assert_eq!(snapshot.connect().unwrap().objects().count(), 0);
    }

    #[test]
    fn test_connect_seeds_objects() {
        let snapshot: Snapshot = toml::from_str(SNAPSHOT).unwrap();
        let conn = snapshot.connect().unwrap();

        let seq = Urn {
            kind: ResourceKind::Sequence,
            location: Location::schema(Identifier::parse("SALES").unwrap(), Identifier::parse("PUBLIC").unwrap()),
            name: Identifier::parse("ORDER_SEQ").unwrap(),
        };
        let descriptor = conn.describe(&seq).unwrap().unwrap();
        assert_eq!(descriptor.get("START"), Some("10"));
        assert_eq!(descriptor.owner.unwrap().as_str(), "LOADER");
        assert_eq!(conn.session().unwrap().role.unwrap().as_str(), "SYSADMIN");
    }

    #[test]
    fn test_capture_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.toml");

        let snapshot: Snapshot = toml::from_str(SNAPSHOT).unwrap();
        let conn = snapshot.connect().unwrap();
        let captured = Snapshot::capture(&conn).unwrap();
        assert!(captured.updated_at.is_some());
        // database, its PUBLIC schema and the sequence
        assert_eq!(captured.objects.len(), 3);

        captured.save(&path).unwrap();
        let reloaded = Snapshot::load(&path).unwrap();
        assert_eq!(reloaded.account_edition, Edition::Enterprise);
        assert_eq!(
            reloaded.connect().unwrap().objects().collect::<Vec<_>>(),
            conn.objects().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_invalid_object_is_error() {
        let snapshot = Snapshot {
            objects: vec![ObjectState {
                database: None,
                schema: None,
                owner: None,
                sql: "SELECT 1".to_string(),
            }],
            ..Snapshot::default()
        };
        assert!(snapshot.connect().is_err());
    }
}
