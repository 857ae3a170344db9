use anyhow::{Result, bail};
use blueprint::{ExecuteOptions, ObservationCache, execute};
use std::sync::Arc;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::Config;
use crate::engine::progress::BarProgress;
use crate::engine::{self, display};
use crate::state::Snapshot;
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let config = Config::load()?;
    let state_path = config.state_path(args.state.as_deref());
    let snapshot = super::load_snapshot(&config, args.state.as_deref())?;

    let mut planned = engine::plan_manifest(&args.path, &snapshot, Arc::new(ObservationCache::new()), args.destroy)?;
    display::display_plan(&planned);

    if planned.plan.is_empty() {
        return Ok(());
    }

    if let Some(expected) = &args.fingerprint {
        let actual = planned.plan.fingerprint();
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            bail!("Plan changed since it was reviewed (fingerprint {actual})");
        }
    }

    if !args.dry_run && !(args.yes || config.assume_yes) && !ui::confirm("Apply these changes?")? {
        println!();
        ui::error("Aborted");
        return Ok(());
    }

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        ..Default::default()
    };
    let mut progress = BarProgress::new(ctx.quiet);
    let report = execute(&mut planned.conn, &planned.plan, &opts, &mut progress);
    display::print_summary(&report);

    if args.dry_run {
        println!();
        ui::info("Dry run - no changes made");
    } else {
        match &state_path {
            Some(path) => {
                Snapshot::capture(&planned.conn)?.save(path)?;
                ui::dim(&format!("Snapshot written to {}", path.display()));
            }
            None => ui::warn("No snapshot configured; changes were applied to an in-memory account only"),
        }
    }

    if ctx.verbose > 0 {
        ui::header("Statements");
        for (index, sql) in planned.conn.statements().iter().enumerate() {
            ui::kv(&format!("{:>3}", index + 1), sql);
        }
    }

    report.into_result()?;
    Ok(())
}
