//! Manifest files: desired state as a list of resource definitions.
//!
//! ```toml
//! name = "analytics"
//! run_mode = "fully-managed"
//! managed = ["role", "schema"]
//!
//! [[resource]]
//! kind = "database"
//! name = "analytics"
//!
//! [[resource]]
//! kind = "schema"
//! name = "raw"
//! database = "analytics"
//! ```
//!
//! Every key other than `kind` is passed to the resource as a construction
//! attribute. `.json` files use the same shape with a `resources` array.

use anyhow::{Context, Result, bail};
use blueprint::{Blueprint, ObservationCache, Resource, ResourceKind, RunMode};
use ddl::ParsableEnum;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    #[serde(alias = "create_or_update")]
    CreateOrUpdate,
    #[serde(alias = "fully_managed")]
    FullyManaged,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::CreateOrUpdate => Self::CreateOrUpdate,
            Mode::FullyManaged => Self::FullyManaged,
        }
    }
}

/// One resource definition.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceSpec {
    pub kind: ResourceKind,
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

impl ResourceSpec {
    pub fn build(&self) -> Result<Resource> {
        Resource::from_attrs(self.kind, self.attrs.clone()).with_context(|| format!("Invalid {} {}", self.kind.label(), self.label()))
    }

    fn label(&self) -> String {
        match self.attrs.get("name") {
            Some(Value::String(name)) => format!("'{name}'"),
            _ => "(unnamed)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub name: Option<String>,
    #[serde(default)]
    pub run_mode: Mode,
    /// Kinds pruned in fully-managed mode; every kind when empty
    #[serde(default)]
    pub managed: Vec<ResourceKind>,
    #[serde(default, rename = "resource", alias = "resources")]
    pub resources: Vec<ResourceSpec>,
    #[serde(skip)]
    pub path: PathBuf,
}

impl Manifest {
    /// Load a TOML or JSON manifest
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
        let mut manifest: Self = if is_json(path) {
            serde_json::from_str(&content).with_context(|| format!("Invalid manifest {}", path.display()))?
        } else {
            toml::from_str(&content).with_context(|| format!("Invalid manifest {}", path.display()))?
        };
        manifest.path = path.to_path_buf();
        log::debug!("Loaded {} resource(s) from {}", manifest.resources.len(), path.display());
        Ok(manifest)
    }

    /// Declared name, else the file stem
    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.path
                .file_stem()
                .map_or_else(|| "blueprint".to_string(), |stem| stem.to_string_lossy().into_owned())
        })
    }

    /// Build the blueprint this manifest declares.
    pub fn blueprint(&self, cache: Arc<ObservationCache>) -> Result<Blueprint> {
        let kinds = if self.managed.is_empty() {
            ResourceKind::VARIANTS.to_vec()
        } else {
            self.managed.clone()
        };
        let mut blueprint = Blueprint::with_cache(self.name(), cache).with_run_mode(self.run_mode.into(), &kinds);

        for spec in &self.resources {
            let resource = spec.build()?;
            let urn = resource.urn();
            blueprint
                .add(resource)
                .with_context(|| format!("Could not add {urn} to {}", self.name()))?;
        }
        Ok(blueprint)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn is_manifest(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml") || ext.eq_ignore_ascii_case("json"))
}

/// Expand directories into the manifests beneath them, sorted.
pub fn discover(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut nested: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_manifest(e.path()))
                .map(walkdir::DirEntry::into_path)
                .collect();
            nested.sort();
            found.extend(nested);
        } else if path.is_file() {
            found.push(path.clone());
        } else {
            bail!("No such manifest: {}", path.display());
        }
    }
    found.dedup();

    if found.is_empty() {
        bail!("No manifests found");
    }
    Ok(found)
}
