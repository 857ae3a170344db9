pub mod apply;
pub mod plan;
pub mod render;
pub mod validate;

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::state::Snapshot;

/// Snapshot to work against: the given or configured one, else an empty
/// account.
fn load_snapshot(config: &Config, explicit: Option<&Path>) -> Result<Snapshot> {
    match config.state_path(explicit) {
        Some(path) => Snapshot::load(&path),
        None => {
            log::info!("No snapshot configured, planning against an empty account");
            Ok(Snapshot::default())
        }
    }
}
