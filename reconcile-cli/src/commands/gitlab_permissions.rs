//! `reconcile gitlab-permissions`: share declared repositories with a group.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use reconcile_core::Settings;
use reconcile_gitlab::GitLabClient;
use reconcile_gql::definitions::app_interface_settings::AppInterfaceSettingsV1;
use reconcile_gql::definitions::gitlab_instance::GitlabInstanceV1;
use reconcile_gql::{ConfigSource, GqlConfigSource};
use reconcile_permissions::{pipeline, ReconcileError, RunOptions, TargetResult};

use super::{gql_client, load_settings, timeout};
use crate::GlobalArgs;

/// Arguments for `reconcile gitlab-permissions`.
#[derive(Args, Debug)]
pub struct GitlabPermissionsArgs {
    /// Report what would change without touching GitLab.
    #[arg(long)]
    pub dry_run: bool,

    /// Number of repositories reconciled concurrently.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub thread_pool_size: u64,
}

impl GitlabPermissionsArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let settings = load_settings(global)?;
        let gql = gql_client(&settings);
        let config = GqlConfigSource::new(gql.query_func());

        let instance = config
            .gitlab_instance()
            .context("failed to read GitLab instance from the catalog")?;
        let app_settings = config
            .app_interface_settings()
            .context("failed to read app-interface settings")?;
        if instance.ssl_verify == Some(false) {
            tracing::warn!(instance = %instance.name, "sslVerify is disabled in the catalog; certificates are verified anyway");
        }
        let token = gitlab_token(&settings, &instance, &app_settings)?;
        let gl = GitLabClient::connect(&instance.url, token, timeout(&settings))
            .with_context(|| format!("failed to connect to {}", instance.url))?;

        let options = RunOptions {
            dry_run: self.dry_run,
            thread_pool_size: usize::try_from(self.thread_pool_size).unwrap_or(usize::MAX),
        };
        match pipeline::run(&config, &gl, &settings, options) {
            Ok(report) => {
                print_results(&report.results, self.dry_run);
                Ok(())
            }
            Err(ReconcileError::TargetsFailed(failures)) => {
                for failure in &failures {
                    eprintln!("  {}  {}: {}", "✗".red().bold(), failure.repo, failure.error);
                }
                bail!("{} repositories failed to reconcile", failures.len())
            }
            Err(e) => Err(e).context("gitlab-permissions failed"),
        }
    }
}

/// The token from settings or `GITLAB_TOKEN` wins; otherwise the instance's
/// secret reference is resolved, which requires the catalog to use Vault.
fn gitlab_token(
    settings: &Settings,
    instance: &GitlabInstanceV1,
    app_settings: &AppInterfaceSettingsV1,
) -> Result<String> {
    if let Some(token) = settings.gitlab.token.clone() {
        return Ok(token);
    }
    if !app_settings.vault {
        bail!(
            "no GitLab token configured: set GITLAB_TOKEN or gitlab.token (catalog secrets are not in Vault)"
        );
    }
    settings
        .read_secret(&instance.token)
        .with_context(|| format!("failed to resolve token for GitLab instance '{}'", instance.name))
}

fn print_results(results: &[TargetResult], dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let changed = results.iter().filter(|r| r.is_change()).count();

    if changed == 0 {
        println!("{prefix}✓ {} repositories: nothing to do", results.len());
        return;
    }
    println!(
        "{prefix}✓ {} repositories reconciled ({changed} changed, {} unchanged)",
        results.len(),
        results.len() - changed
    );

    for r in results {
        match r {
            TargetResult::Shared { repo, level } => println!("  ✎  {repo}  shared as {level}"),
            TargetResult::Reshared { repo, from, to } => {
                println!("  ✎  {repo}  raised {from} → {to}")
            }
            TargetResult::WouldShare {
                repo,
                level,
                reshare,
            } => {
                let verb = if *reshare { "raise to" } else { "share as" };
                println!("  ~  {repo}  would {verb} {level}")
            }
            TargetResult::MembersAdded { repo, usernames } => {
                println!("  ✎  {repo}  added {}", usernames.join(", "))
            }
            TargetResult::WouldAddMembers { repo, usernames } => {
                println!("  ~  {repo}  would add {}", usernames.join(", "))
            }
            TargetResult::Skipped { repo, reason } => println!("  -  {repo}  skipped: {reason}"),
            TargetResult::Unchanged { repo } => println!("  ·  {repo}"),
        }
    }
}
