//! GitHub Actions runner integration.
//!
//! The runner exposes two append-only files: `$GITHUB_PATH` (one directory
//! per line, prepended to `PATH` for later steps) and `$GITHUB_OUTPUT`
//! (`name=value` step outputs). Outside a runner both are absent and the
//! values are only logged.

use setup_crowdin_core::{PathSink, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Files the runner reads after the step finishes.
#[derive(Debug, Clone, Default)]
pub struct GitHubActions {
    path_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

impl GitHubActions {
    /// Read the runner file locations from the environment.
    pub fn from_env() -> Self {
        Self {
            path_file: non_empty_env("GITHUB_PATH"),
            output_file: non_empty_env("GITHUB_OUTPUT"),
        }
    }

    #[cfg(test)]
    fn with_files(path_file: PathBuf, output_file: PathBuf) -> Self {
        Self {
            path_file: Some(path_file),
            output_file: Some(output_file),
        }
    }

    /// Set a step output.
    pub fn set_output(&self, name: &str, value: &str) -> Result<()> {
        match &self.output_file {
            Some(file) => append_line(file, &format!("{name}={value}")),
            None => {
                info!(name, value, "Step output");
                Ok(())
            }
        }
    }
}

impl PathSink for GitHubActions {
    fn add_path(&self, dir: &Path) -> Result<()> {
        match &self.path_file {
            Some(file) => {
                append_line(file, &dir.display().to_string())?;
                debug!(path = ?dir, "Added to GITHUB_PATH");
            }
            None => info!(path = ?dir, "GITHUB_PATH is not set, add the directory to PATH manually"),
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn append_line(file: &Path, line: &str) -> Result<()> {
    let mut handle = OpenOptions::new().create(true).append(true).open(file)?;
    writeln!(handle, "{line}")?;
    Ok(())
}

/// Escape data for a workflow command.
fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Mark the step as failed with `message`.
#[allow(clippy::print_stdout)]
pub fn set_failed(message: &str) {
    println!("::error::{}", escape_data(message));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_escape_data() {
        assert_eq!(escape_data("100% done\nnext\r"), "100%25 done%0Anext%0D");
    }

    #[test]
    fn test_add_path_appends_lines() {
        let temp = TempDir::new().unwrap();
        let path_file = temp.path().join("path");
        let actions = GitHubActions::with_files(path_file.clone(), temp.path().join("output"));

        actions.add_path(Path::new("/cache/crowdin-cli/4.5.0/linux-amd64")).unwrap();
        actions.add_path(Path::new("/other")).unwrap();

        let content = std::fs::read_to_string(path_file).unwrap();
        assert_eq!(content, "/cache/crowdin-cli/4.5.0/linux-amd64\n/other\n");
    }

    #[test]
    fn test_set_output() {
        let temp = TempDir::new().unwrap();
        let output_file = temp.path().join("output");
        std::fs::write(&output_file, "existing=1\n").unwrap();
        let actions = GitHubActions::with_files(temp.path().join("path"), output_file.clone());

        actions.set_output("version", "4.5.0").unwrap();
        actions.set_output("cache-hit", "false").unwrap();

        let content = std::fs::read_to_string(output_file).unwrap();
        assert_eq!(content, "existing=1\nversion=4.5.0\ncache-hit=false\n");
    }

    #[test]
    fn test_missing_files_are_not_errors() {
        let actions = GitHubActions::default();
        assert!(actions.add_path(Path::new("/tmp")).is_ok());
        assert!(actions.set_output("version", "4.5.0").is_ok());
    }
}
