//! End-to-end setup: resolve, fetch, verify, install, publish.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::Result;
use crate::artifact::ArtifactRef;
use crate::backend::{ArtifactBackend, Credentials};
use crate::cache::{CacheKey, ToolCache};
use crate::install::{Installer, verify_binary};
use crate::platform::PlatformKey;
use crate::version::{ResolvedVersion, VersionRequest};

/// Tool-cache name of the Crowdin CLI.
pub const TOOL_NAME: &str = "crowdin-cli";

/// Canonical executable name of the Crowdin CLI.
pub const BINARY_NAME: &str = "crowdin";

/// Progress of a setup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupState {
    /// Nothing done yet.
    Start,
    /// Host platform detected and supported by the backend.
    PlatformResolved,
    /// Version request resolved.
    VersionResolved,
    /// Tool cache consulted.
    CacheChecked,
    /// Install reused from the tool cache.
    CacheHit,
    /// Artifact reference derived.
    Located,
    /// Binary downloaded into scratch.
    Fetched,
    /// Smoke test passed on the staged or cached binary.
    VerifyInvoked,
    /// Binary stored in the tool cache.
    Installed,
    /// Directory published to the path sink.
    PathPublished,
    /// Run finished successfully.
    Done,
}

impl fmt::Display for SetupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::PlatformResolved => "platform-resolved",
            Self::VersionResolved => "version-resolved",
            Self::CacheChecked => "cache-checked",
            Self::CacheHit => "cache-hit",
            Self::Located => "located",
            Self::Fetched => "fetched",
            Self::VerifyInvoked => "verify-invoked",
            Self::Installed => "installed",
            Self::PathPublished => "path-published",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Receives the installed directory so later steps can find the executable.
pub trait PathSink: Send + Sync {
    /// Prepend `dir` to the executable search path of subsequent steps.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be published.
    fn add_path(&self, dir: &Path) -> Result<()>;
}

/// Inputs of one setup run.
#[derive(Debug, Clone)]
pub struct SetupRequest {
    /// Requested version.
    pub version: VersionRequest,
    /// Tokens for the GitHub API and registries.
    pub credentials: Credentials,
}

impl SetupRequest {
    /// Request `version` without credentials.
    #[must_use]
    pub fn new(version: VersionRequest) -> Self {
        Self {
            version,
            credentials: Credentials::anonymous(),
        }
    }

    /// Attach credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

/// Options shared by all runs of a [`Setup`].
#[derive(Debug, Clone)]
pub struct SetupOptions {
    /// Tool-cache name.
    pub tool_name: String,
    /// Executable name without extension.
    pub binary_name: String,
    /// Parent of the per-run scratch directory.
    pub temp_dir: PathBuf,
    /// Platform override; detected from the host when unset.
    pub platform: Option<PlatformKey>,
    /// Run `--version` on the installed binary.
    pub verify: bool,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            tool_name: TOOL_NAME.to_string(),
            binary_name: BINARY_NAME.to_string(),
            temp_dir: std::env::temp_dir(),
            platform: None,
            verify: true,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct Installed {
    /// Cached directory containing the executable.
    pub dir: PathBuf,
    /// Path of the executable.
    pub binary: PathBuf,
    /// Installed version.
    pub version: ResolvedVersion,
    /// Platform of the binary.
    pub platform: PlatformKey,
    /// Whether the install was reused from the tool cache.
    pub cache_hit: bool,
}

/// Sequences platform resolution, version resolution, cache lookup, fetch,
/// verification, install and path publication.
pub struct Setup {
    backend: Arc<dyn ArtifactBackend>,
    cache: Arc<dyn ToolCache>,
    paths: Arc<dyn PathSink>,
    options: SetupOptions,
}

impl Setup {
    /// Create a setup driving `backend`.
    #[must_use]
    pub fn new(
        backend: Arc<dyn ArtifactBackend>,
        cache: Arc<dyn ToolCache>,
        paths: Arc<dyn PathSink>,
        options: SetupOptions,
    ) -> Self {
        Self {
            backend,
            cache,
            paths,
            options,
        }
    }

    /// Run setup to completion.
    ///
    /// # Errors
    ///
    /// Returns the first unrecoverable error. Nothing is stored in the tool
    /// cache or published to the path sink unless the binary passed
    /// verification.
    pub async fn run(&self, request: &SetupRequest) -> Result<Installed> {
        let mut state = StateLog::new(self.backend.name());

        let platform = match self.options.platform {
            Some(platform) => platform,
            None => PlatformKey::detect()?,
        };
        self.backend.naming().artifact_platform(&platform)?;
        state.enter(SetupState::PlatformResolved);

        let version = self
            .backend
            .resolve_version(&request.version, &request.credentials)
            .await?;
        state.enter(SetupState::VersionResolved);

        info!(
            backend = self.backend.name(),
            %version,
            %platform,
            "Setting up Crowdin CLI"
        );

        let key = CacheKey::new(&self.options.tool_name, version.as_str()).with_platform(&platform);
        let cached = if version.is_floating() {
            debug!(%key, "Floating version, skipping cache lookup");
            None
        } else {
            self.cache.find(&key)
        };
        state.enter(SetupState::CacheChecked);

        let (dir, cache_hit) = if let Some(dir) = cached {
            info!(path = ?dir, "Found in cache");
            state.enter(SetupState::CacheHit);
            self.verify_cached(&dir, &platform, &key, &mut state).await?;
            (dir, true)
        } else {
            (self.install(request, &version, &platform, &key, &mut state).await?, false)
        };

        self.paths.add_path(&dir)?;
        state.enter(SetupState::PathPublished);

        let binary = dir.join(platform.executable_name(&self.options.binary_name));
        state.enter(SetupState::Done);
        info!(%version, path = ?dir, "Successfully installed Crowdin CLI");

        Ok(Installed {
            dir,
            binary,
            version,
            platform,
            cache_hit,
        })
    }

    async fn install(
        &self,
        request: &SetupRequest,
        version: &ResolvedVersion,
        platform: &PlatformKey,
        key: &CacheKey,
        state: &mut StateLog,
    ) -> Result<PathBuf> {
        let artifact = self.backend.locate(version, platform)?;
        state.enter(SetupState::Located);

        std::fs::create_dir_all(&self.options.temp_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix("setup-crowdin-")
            .tempdir_in(&self.options.temp_dir)?;

        let fetched = self
            .fetch_with_fallback(&artifact, &request.credentials, scratch.path())
            .await?;
        state.enter(SetupState::Fetched);

        let installer = Installer::new(Arc::clone(&self.cache), &self.options.binary_name);
        let staged = installer.stage(&fetched, key, platform, scratch.path())?;
        if self.options.verify {
            verify_binary(&staged).await?;
            state.enter(SetupState::VerifyInvoked);
        }

        let dir = installer.store(&staged, key)?;
        state.enter(SetupState::Installed);
        Ok(dir)
    }

    /// Smoke-test a cached install, evicting it when it no longer runs.
    async fn verify_cached(
        &self,
        dir: &Path,
        platform: &PlatformKey,
        key: &CacheKey,
        state: &mut StateLog,
    ) -> Result<()> {
        if !self.options.verify {
            return Ok(());
        }

        let binary = dir.join(platform.executable_name(&self.options.binary_name));
        if let Err(err) = verify_binary(&binary).await {
            warn!(%key, error = %err, "Cached install failed verification, evicting");
            self.cache.remove(key)?;
            return Err(err);
        }
        state.enter(SetupState::VerifyInvoked);
        Ok(())
    }

    /// Fetch `artifact`, retrying once with the backend's fallback reference.
    async fn fetch_with_fallback(
        &self,
        artifact: &ArtifactRef,
        credentials: &Credentials,
        scratch: &Path,
    ) -> Result<PathBuf> {
        info!(%artifact, "Downloading");
        let err = match self.backend.fetch(artifact, credentials, scratch).await {
            Ok(path) => return Ok(path),
            Err(err) => err,
        };

        let fallback = match self.backend.fallback(artifact) {
            Some(fallback) if err.allows_artifact_fallback() => fallback,
            _ => return Err(err),
        };

        warn!(
            %artifact,
            %fallback,
            error = %err,
            "Failed to fetch artifact, trying fallback"
        );
        self.backend.fetch(&fallback, credentials, scratch).await
    }
}

impl fmt::Debug for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setup")
            .field("backend", &self.backend.name())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Tracks and logs state transitions of one run.
struct StateLog {
    backend: &'static str,
    current: SetupState,
}

impl StateLog {
    fn new(backend: &'static str) -> Self {
        Self {
            backend,
            current: SetupState::Start,
        }
    }

    fn enter(&mut self, next: SetupState) {
        debug!(backend = self.backend, from = %self.current, to = %next, "Setup state");
        self.current = next;
    }
}
