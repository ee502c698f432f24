//! Reconcile: keep GitLab sharing in line with the configuration catalog.
//!
//! # Usage
//!
//! ```text
//! reconcile [--config <path>] [-v] gitlab-permissions [--dry-run] [--thread-pool-size <n>]
//! reconcile [--config <path>] [-v] ocm-env-telemeter [--name <env>] [--json]
//! reconcile [--config <path>] [-v] telemeter-query --env <env> --query <promql>
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use commands::{
    gitlab_permissions::GitlabPermissionsArgs, ocm_env_telemeter::OcmEnvTelemeterArgs,
    telemeter_query::TelemeterQueryArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "reconcile",
    version,
    about = "Reconcile GitLab project sharing against the configuration catalog",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Settings file (default: ~/.reconcile/config.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Share every declared repository with the configured GitLab group.
    GitlabPermissions(GitlabPermissionsArgs),

    /// List OCM environments and their telemeter instance.
    OcmEnvTelemeter(OcmEnvTelemeterArgs),

    /// Run an instant query against an environment's telemeter.
    TelemeterQuery(TelemeterQueryArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);
    match cli.command {
        Commands::GitlabPermissions(args) => args.run(&cli.global),
        Commands::OcmEnvTelemeter(args) => args.run(&cli.global),
        Commands::TelemeterQuery(args) => args.run(&cli.global),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
