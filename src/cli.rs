use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "floe")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative warehouse object management", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the statements that would converge the account on manifests
    Plan(PlanArgs),

    /// Plan and execute one manifest
    Apply(ApplyArgs),

    /// Print the CREATE statements a manifest declares
    Render {
        /// Manifest file (TOML or JSON)
        path: PathBuf,
    },

    /// Check manifests without planning
    Validate {
        /// Manifest files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Manifest files or directories
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Account snapshot to plan against
    #[arg(short, long, env = "FLOE_STATE")]
    pub state: Option<PathBuf>,

    /// Number of manifests to plan in parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Plan dropping everything the manifests declare
    #[arg(long)]
    pub destroy: bool,

    /// Print only the statements
    #[arg(long)]
    pub sql: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Manifest file (TOML or JSON)
    pub path: PathBuf,

    /// Account snapshot to apply against; rewritten afterwards
    #[arg(short, long, env = "FLOE_STATE")]
    pub state: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Report what would run without executing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Drop everything the manifest declares
    #[arg(long)]
    pub destroy: bool,

    /// Refuse to apply unless the plan matches this fingerprint
    #[arg(long, value_name = "HEX")]
    pub fingerprint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from(["floe", "-vv", "apply", "prod.toml", "--yes", "--dry-run"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.path, PathBuf::from("prod.toml"));
                assert!(args.yes && args.dry_run && !args.destroy);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_plan_requires_paths() {
        assert!(Cli::try_parse_from(["floe", "plan"]).is_err());
    }
}
