//! setup-crowdin: installs the Crowdin CLI on a CI runner.
//!
//! Reads its inputs from flags or the runner environment, installs the
//! requested version into the tool cache and publishes its directory to
//! `$GITHUB_PATH`. Any failure is reported as a single `::error::` command.

mod actions;
mod cli;
mod tracing;

use crate::actions::GitHubActions;
use crate::cli::{BackendKind, Cli};
use clap::Parser;
use setup_crowdin_core::{
    ArtifactBackend, DirToolCache, Setup, SetupOptions, SetupRequest, VersionRequest,
};
use setup_crowdin_tools_github::{GitHubReleaseBackend, ReleaseLayout};
use setup_crowdin_tools_oci::RegistryBackend;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(error) = crate::tracing::init_tracing(cli.tracing_config()) {
        actions::set_failed(&error.to_string());
        std::process::exit(1);
    }

    if let Err(error) = run(cli).await {
        ::tracing::debug!(?error, "Setup failed");
        actions::set_failed(&error.to_string());
        std::process::exit(1);
    }
}

fn backend(cli: &Cli) -> setup_crowdin_core::Result<Arc<dyn ArtifactBackend>> {
    let backend: Arc<dyn ArtifactBackend> = match cli.backend {
        BackendKind::Github => Arc::new(GitHubReleaseBackend::new(ReleaseLayout::project())?),
        BackendKind::Standalone => {
            Arc::new(GitHubReleaseBackend::new(ReleaseLayout::standalone())?)
        }
        BackendKind::Registry => Arc::new(RegistryBackend::new(
            cli.registry.as_str(),
            cli.owner.as_deref(),
        )?),
    };
    Ok(backend)
}

async fn run(cli: Cli) -> setup_crowdin_core::Result<()> {
    let runner = Arc::new(GitHubActions::from_env());

    let cache = match &cli.tool_cache {
        Some(root) => DirToolCache::new(root.clone()),
        None => DirToolCache::default(),
    };
    let mut options = SetupOptions {
        verify: !cli.skip_verify,
        ..SetupOptions::default()
    };
    if let Some(temp_dir) = &cli.temp_dir {
        options.temp_dir = temp_dir.clone();
    }

    let request = SetupRequest::new(VersionRequest::parse(&cli.crowdin_version)?)
        .with_credentials(cli.credentials());

    let setup = Setup::new(backend(&cli)?, Arc::new(cache), runner.clone(), options);
    let installed = setup.run(&request).await?;

    runner.set_output("version", installed.version.as_str())?;
    runner.set_output("path", &installed.dir.display().to_string())?;
    runner.set_output("cache-hit", if installed.cache_hit { "true" } else { "false" })?;

    ::tracing::info!(
        version = %installed.version,
        path = ?installed.binary,
        cache_hit = installed.cache_hit,
        "Crowdin CLI is ready"
    );
    Ok(())
}
