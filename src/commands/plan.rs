use anyhow::Result;

use crate::Context;
use crate::cli::PlanArgs;
use crate::config::Config;
use crate::engine::{self, display};
use crate::manifest;

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let config = Config::load()?;
    let paths = manifest::discover(&args.paths)?;
    let snapshot = super::load_snapshot(&config, args.state.as_deref())?;

    let planned = engine::plan_all(&paths, &snapshot, config.jobs(args.jobs), args.destroy)?;

    for item in &planned {
        if args.sql {
            if planned.len() > 1 {
                println!("-- {}", item.path.display());
            }
            display::print_sql(&item.plan);
        } else if !(ctx.quiet && item.plan.is_empty()) {
            display::display_plan(item);
        }
    }
    Ok(())
}
