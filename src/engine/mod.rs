//! Execution engine for floe
//!
//! The engine orchestrates:
//! 1. Loading - Manifest to blueprint, snapshot to connection
//! 2. Planning - One plan per manifest, in parallel
//! 3. Executing - Apply one plan with progress and a summary

pub mod display;
pub mod progress;

use anyhow::{Context, Result};
use blueprint::{Blueprint, MemoryConnection, ObservationCache, Plan};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::manifest::Manifest;
use crate::state::Snapshot;

/// A manifest planned against its own connection.
#[derive(Debug)]
pub struct Planned {
    pub name: String,
    pub path: PathBuf,
    pub blueprint: Blueprint,
    pub conn: MemoryConnection,
    pub plan: Plan,
}

/// Load, connect and plan one manifest.
pub fn plan_manifest(path: &Path, snapshot: &Snapshot, cache: Arc<ObservationCache>, destroy: bool) -> Result<Planned> {
    let manifest = Manifest::load(path)?;
    let blueprint = manifest.blueprint(cache)?;
    let conn = snapshot.connect()?;

    let plan = if destroy {
        blueprint.plan_destroy(&conn)
    } else {
        blueprint.plan(&conn)
    }
    .with_context(|| format!("Failed to plan {}", path.display()))?;

    Ok(Planned {
        name: manifest.name(),
        path: path.to_path_buf(),
        blueprint,
        conn,
        plan,
    })
}

/// Plan many manifests in parallel, preserving their order.
///
/// Every manifest gets its own connection to the snapshot; session and
/// catalog reads are shared.
pub fn plan_all(paths: &[PathBuf], snapshot: &Snapshot, jobs: usize, destroy: bool) -> Result<Vec<Planned>> {
    let cache = Arc::new(ObservationCache::new());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("Failed to create plan thread pool")?;

    pool.install(|| {
        paths
            .par_iter()
            .map(|path| plan_manifest(path, snapshot, Arc::clone(&cache), destroy))
            .collect()
    })
}
