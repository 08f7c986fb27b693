use crate::tracing::{LogLevel, TracingConfig, TracingFormat};
use clap::{Parser, ValueEnum};
use setup_crowdin_core::Credentials;
use setup_crowdin_tools_oci::DEFAULT_REGISTRY;
use std::path::PathBuf;

/// Distribution channel to install from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Native executables attached to this project's releases
    Github,
    /// Standalone builds from the standalone release repository
    Standalone,
    /// Single-layer images in a container registry
    Registry,
}

#[derive(Parser, Debug)]
#[command(name = "setup-crowdin")]
#[command(about = "Install the Crowdin CLI and add it to the PATH of later workflow steps")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(
        long = "crowdin-version",
        env = "INPUT_VERSION",
        default_value = "latest",
        help = "Crowdin CLI version to install (\"latest\" or e.g. 4.5.0)"
    )]
    pub crowdin_version: String,

    #[arg(
        long,
        env = "INPUT_BACKEND",
        default_value = "github",
        value_enum,
        help = "Where to download the binary from"
    )]
    pub backend: BackendKind,

    #[arg(
        long,
        env = "INPUT_TOKEN",
        hide_env_values = true,
        help = "Token for the GitHub API and the container registry"
    )]
    pub token: Option<String>,

    #[arg(long, env = "GITHUB_TOKEN", hide = true, hide_env_values = true)]
    pub github_token: Option<String>,

    #[arg(
        long,
        env = "INPUT_REGISTRY_TOKEN",
        hide_env_values = true,
        help = "Separate token for the container registry"
    )]
    pub registry_token: Option<String>,

    #[arg(
        long,
        env = "GITHUB_REPOSITORY_OWNER",
        help = "Owner of the registry images"
    )]
    pub owner: Option<String>,

    #[arg(
        long,
        env = "INPUT_REGISTRY",
        default_value = DEFAULT_REGISTRY,
        help = "Container registry base URL"
    )]
    pub registry: String,

    #[arg(long, env = "RUNNER_TOOL_CACHE", help = "Tool cache directory")]
    pub tool_cache: Option<PathBuf>,

    #[arg(long, env = "RUNNER_TEMP", help = "Directory for temporary downloads")]
    pub temp_dir: Option<PathBuf>,

    #[arg(long, help = "Do not run the installed binary with --version")]
    pub skip_verify: bool,

    #[arg(
        short = 'l',
        long,
        help = "Set logging level",
        default_value = "info",
        value_enum
    )]
    pub log_level: LogLevel,

    #[arg(long, help = "Log output format", default_value = "compact", value_enum)]
    pub log_format: TracingFormat,
}

impl Cli {
    /// Tokens from `--token`, falling back to `GITHUB_TOKEN`.
    ///
    /// The registry uses `--registry-token` when given, otherwise the same
    /// token as the GitHub API.
    pub fn credentials(&self) -> Credentials {
        let token = self
            .token
            .iter()
            .chain(self.github_token.iter())
            .find(|token| !token.trim().is_empty());

        let mut credentials = Credentials::anonymous();
        if let Some(token) = token {
            credentials = credentials.with_github_token(token.clone());
        }
        if let Some(token) = &self.registry_token {
            credentials = credentials.with_registry_token(token.clone());
        }
        credentials
    }

    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig {
            format: self.log_format,
            level: self.log_level.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};

    /// Parse `args` ignoring the runner environment.
    fn try_parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let mut argv = vec!["setup-crowdin"];
        argv.extend_from_slice(args);
        let matches = Cli::command()
            .mut_args(|arg| arg.env(None::<&'static str>))
            .try_get_matches_from(argv)?;
        Cli::from_arg_matches(&matches)
    }

    fn parse(args: &[&str]) -> Cli {
        try_parse(args).unwrap()
    }

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();

        let err = try_parse(&["--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.crowdin_version, "latest");
        assert_eq!(cli.backend, BackendKind::Github);
        assert_eq!(cli.registry, DEFAULT_REGISTRY);
        assert_eq!(cli.tool_cache, None);
        assert!(!cli.skip_verify);
    }

    #[test]
    fn test_backend_parsing() {
        let cli = parse(&["--backend", "registry", "--crowdin-version", "4.5.0"]);
        assert_eq!(cli.backend, BackendKind::Registry);
        assert_eq!(cli.crowdin_version, "4.5.0");

        assert!(try_parse(&["--backend", "npm"]).is_err());
    }

    #[test]
    fn test_explicit_token_wins() {
        let cli = parse(&["--token", "input", "--github-token", "env"]);
        assert_eq!(cli.credentials().github_token(), Some("input"));
    }

    #[test]
    fn test_empty_token_falls_back() {
        let cli = parse(&["--token", "", "--github-token", "env"]);
        assert_eq!(cli.credentials().github_token(), Some("env"));
        assert_eq!(cli.credentials().registry_token(), Some("env"));
    }

    #[test]
    fn test_no_token() {
        let cli = parse(&[]);
        assert_eq!(cli.credentials().github_token(), None);
        assert_eq!(cli.credentials().registry_token(), None);
    }

    #[test]
    fn test_separate_registry_token() {
        let cli = parse(&["--token", "gh", "--registry-token", "reg"]);
        let credentials = cli.credentials();
        assert_eq!(credentials.github_token(), Some("gh"));
        assert_eq!(credentials.registry_token(), Some("reg"));

        let cli = parse(&["--registry-token", "reg"]);
        assert_eq!(cli.credentials().github_token(), None);
        assert_eq!(cli.credentials().registry_token(), Some("reg"));
    }

    #[test]
    fn test_log_options() {
        let cli = parse(&["--log-level", "debug", "--log-format", "json"]);
        let config = cli.tracing_config();
        assert_eq!(config.level, crate::tracing::Level::DEBUG);
        assert_eq!(config.format, TracingFormat::Json);
    }

    #[test]
    fn test_default_log_options_match_tracing_defaults() {
        let config = parse(&[]).tracing_config();
        let default = TracingConfig::default();
        assert_eq!(config.level, default.level);
        assert_eq!(config.format, default.format);
    }
}
