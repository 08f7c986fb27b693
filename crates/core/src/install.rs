//! Staging fetched binaries into the tool cache and verifying them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{CacheKey, ToolCache};
use crate::platform::PlatformKey;
use crate::{Error, Result};

/// Copies a fetched binary into the tool cache under its canonical name.
#[derive(Clone)]
pub struct Installer {
    cache: Arc<dyn ToolCache>,
    binary_name: String,
}

impl Installer {
    /// Create an installer storing into `cache`, naming executables after `binary_name`.
    #[must_use]
    pub fn new(cache: Arc<dyn ToolCache>, binary_name: impl Into<String>) -> Self {
        Self {
            cache,
            binary_name: binary_name.into(),
        }
    }

    /// Install `fetched` under `key`, staging it in `scratch` first.
    ///
    /// Returns the cached directory containing the executable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InstallFailed`] if staging or storing fails.
    pub fn install(
        &self,
        fetched: &Path,
        key: &CacheKey,
        platform: &PlatformKey,
        scratch: &Path,
    ) -> Result<PathBuf> {
        let staged = self.stage(fetched, key, platform, scratch)?;
        self.store(&staged, key)
    }

    /// Copy `fetched` into `scratch/stage` under the canonical executable
    /// name and mark it executable.
    ///
    /// Returns the path of the staged executable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InstallFailed`] if the file cannot be staged.
    pub fn stage(
        &self,
        fetched: &Path,
        key: &CacheKey,
        platform: &PlatformKey,
        scratch: &Path,
    ) -> Result<PathBuf> {
        let stage_dir = scratch.join("stage");
        let executable = platform.executable_name(&self.binary_name);

        stage_file(fetched, &stage_dir, &executable)
            .map_err(|e| Error::install_failed(&key.tool, e))
    }

    /// Store the directory holding `staged` in the tool cache under `key`.
    ///
    /// Returns the cached directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InstallFailed`] if the cache cannot be written.
    pub fn store(&self, staged: &Path, key: &CacheKey) -> Result<PathBuf> {
        let stage_dir = staged
            .parent()
            .ok_or_else(|| Error::install_failed(&key.tool, "staged file has no parent directory"))?;

        let cached = self
            .cache
            .store(stage_dir, key)
            .map_err(|e| Error::install_failed(&key.tool, e))?;

        info!(%key, path = ?cached, "Installed");
        Ok(cached)
    }
}

fn stage_file(fetched: &Path, stage_dir: &Path, executable: &str) -> Result<PathBuf> {
    if stage_dir.exists() {
        std::fs::remove_dir_all(stage_dir)?;
    }
    std::fs::create_dir_all(stage_dir)?;

    let staged = stage_dir.join(executable);
    std::fs::copy(fetched, &staged)?;
    make_executable(&staged)?;

    debug!(?staged, "Staged binary");
    Ok(staged)
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("binary_name", &self.binary_name)
            .finish_non_exhaustive()
    }
}

/// Set `rwxr-xr-x` on unix; no-op elsewhere.
///
/// # Errors
///
/// Returns an error if the permissions cannot be changed.
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Run `binary --version` and return its trimmed stdout.
///
/// # Errors
///
/// Returns [`Error::VerificationFailed`] if the binary cannot be started or
/// exits with a non-zero status.
pub async fn verify_binary(binary: &Path) -> Result<String> {
    let shown = binary.display().to_string();
    debug!(binary = %shown, "Verifying installation");

    let output = tokio::process::Command::new(binary)
        .arg("--version")
        .output()
        .await
        .map_err(|e| Error::verification_failed(&shown, e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::verification_failed(
            &shown,
            format!("exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    info!(binary = %shown, version = %stdout, "Verified installation");
    Ok(stdout)
}
