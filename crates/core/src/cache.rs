//! Tool cache keyed by tool name, version and platform.
//!
//! A completed install is never mutated; a newer version lands under a
//! different key. Reuse of an identical key needs no network access.

use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::Result;
use crate::platform::PlatformKey;

/// Identity of an installed tool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Tool name (e.g., "crowdin-cli").
    pub tool: String,
    /// Bare version (e.g., "4.5.0").
    pub version: String,
    /// Platform the binary was built for.
    pub platform: Option<String>,
}

impl CacheKey {
    /// Create a key without a platform component.
    #[must_use]
    pub fn new(tool: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            version: version.into(),
            platform: None,
        }
    }

    /// Scope the key to a platform.
    #[must_use]
    pub fn with_platform(mut self, platform: &PlatformKey) -> Self {
        self.platform = Some(platform.to_string());
        self
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.tool, self.version)?;
        if let Some(platform) = &self.platform {
            write!(f, " ({platform})")?;
        }
        Ok(())
    }
}

/// Key-value store of installed tool directories.
pub trait ToolCache: Send + Sync {
    /// Directory of a completed install for `key`, if present.
    fn find(&self, key: &CacheKey) -> Option<PathBuf>;

    /// Copy the contents of `source_dir` into the cache under `key`.
    ///
    /// Returns the cached directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be copied.
    fn store(&self, source_dir: &Path, key: &CacheKey) -> Result<PathBuf>;

    /// Drop the install for `key` so the next lookup misses.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry exists but cannot be deleted.
    fn remove(&self, key: &CacheKey) -> Result<()>;
}

/// On-disk tool cache.
///
/// Default location: `$RUNNER_TOOL_CACHE` on Actions runners, otherwise
/// `~/.cache/setup-crowdin/tools/`.
///
/// Structure:
/// ```text
/// <root>/
/// └── crowdin-cli/
///     └── 4.5.0/
///         ├── linux-amd64/
///         │   └── crowdin
///         └── linux-amd64.complete
/// ```
#[derive(Debug, Clone)]
pub struct DirToolCache {
    root: PathBuf,
}

impl Default for DirToolCache {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("setup-crowdin")
            .join("tools");
        Self::new(cache_dir)
    }
}

/// Platform directory name used for keys without a platform.
const ANY_PLATFORM: &str = "any";

impl DirToolCache {
    /// Create a cache at the specified root directory.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the install for `key`.
    #[must_use]
    pub fn tool_dir(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(&key.tool)
            .join(&key.version)
            .join(key.platform.as_deref().unwrap_or(ANY_PLATFORM))
    }

    /// Marker written once an install is complete.
    fn marker_path(&self, key: &CacheKey) -> PathBuf {
        let dir = self.tool_dir(key);
        let name = format!(
            "{}.complete",
            key.platform.as_deref().unwrap_or(ANY_PLATFORM)
        );
        dir.with_file_name(name)
    }
}

impl ToolCache for DirToolCache {
    fn find(&self, key: &CacheKey) -> Option<PathBuf> {
        let dir = self.tool_dir(key);
        if dir.is_dir() && self.marker_path(key).exists() {
            trace!(%key, ?dir, "Cache hit");
            Some(dir)
        } else {
            trace!(%key, "Cache miss");
            None
        }
    }

    fn store(&self, source_dir: &Path, key: &CacheKey) -> Result<PathBuf> {
        let dest = self.tool_dir(key);
        let marker = self.marker_path(key);

        if marker.exists() {
            std::fs::remove_file(&marker)?;
        }
        if dest.exists() {
            std::fs::remove_dir_all(&dest)?;
        }
        copy_dir(source_dir, &dest)?;
        std::fs::write(&marker, b"")?;

        debug!(%key, ?dest, "Stored tool in cache");
        Ok(dest)
    }

    fn remove(&self, key: &CacheKey) -> Result<()> {
        let marker = self.marker_path(key);
        if marker.exists() {
            std::fs::remove_file(&marker)?;
        }
        let dir = self.tool_dir(key);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        debug!(%key, "Removed tool from cache");
        Ok(())
    }
}

/// Recursively copy a directory, preserving file permissions.
fn copy_dir(source: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
