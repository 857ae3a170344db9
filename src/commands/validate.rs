use anyhow::{Result, bail};
use blueprint::ObservationCache;
use std::path::PathBuf;
use std::sync::Arc;

use crate::Context;
use crate::manifest::{self, Manifest};
use crate::ui;

pub fn run(ctx: &Context, paths: &[PathBuf]) -> Result<()> {
    let paths = manifest::discover(paths)?;
    let mut failed = 0;

    for path in &paths {
        let checked = Manifest::load(path).and_then(|m| {
            let count = m.resources.len();
            m.blueprint(Arc::new(ObservationCache::new())).map(|_| count)
        });
        match checked {
            Ok(count) => {
                if !ctx.quiet {
                    ui::success(&format!("{} ({count} resources)", path.display()));
                }
            }
            Err(e) => {
                failed += 1;
                ui::error(&format!("{}: {e:#}", path.display()));
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} manifest(s) invalid", paths.len());
    }
    Ok(())
}
