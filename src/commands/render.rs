use anyhow::Result;
use blueprint::ObservationCache;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

use crate::manifest::Manifest;

/// Print every declared resource's CREATE statement in declaration order.
pub fn run(path: &Path) -> Result<()> {
    let manifest = Manifest::load(path)?;
    let blueprint = manifest.blueprint(Arc::new(ObservationCache::new()))?;

    for resource in blueprint.resources() {
        println!("{}", format!("-- {}", resource.urn()).dimmed());
        println!("{};", resource.create_sql(false));
    }
    Ok(())
}
