//! GitHub Releases backends for setup-crowdin.
//!
//! Downloads prebuilt Crowdin CLI executables attached to GitHub releases:
//! - `github`: this project's releases (`crowdin-cli-{platform}{ext}`)
//! - `standalone`: the standalone release repository (`crowdin-{platform}{ext}`)
//!
//! Download URLs have the form
//! `{download_url}/{repo}/releases/download/v{version}/{asset}`.

mod client;

use async_trait::async_trait;
use setup_crowdin_core::{
    ArtifactBackend, ArtifactRef, Credentials, Error, PlatformKey, PlatformNaming,
    ResolvedVersion, Result, VersionRequest, VersionResolver,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub use client::{GITHUB_API_URL, GitHubClient, GitHubReleaseSource};

/// Default base URL for release downloads.
pub const GITHUB_DOWNLOAD_URL: &str = "https://github.com";

/// Repository publishing this project's native executables.
pub const PROJECT_REPO: &str = "IlyaGulya/setup-crowdin-cli";

/// Repository publishing standalone Crowdin CLI builds.
pub const STANDALONE_REPO: &str = "IlyaGulya/crowdin-cli-standalone";

/// Upstream Crowdin CLI repository, used as the fallback version source.
pub const UPSTREAM_REPO: &str = "crowdin/crowdin-cli";

/// First version published by the standalone repository.
pub const STANDALONE_MINIMUM_VERSION: &str = "4.4.0";

/// How a release repository names and publishes its assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseLayout {
    /// Backend name reported in diagnostics.
    pub name: &'static str,
    /// Repository holding the assets ("owner/name").
    pub repo: String,
    /// Asset file name prefix, followed by `-{platform}{ext}`.
    pub asset_prefix: String,
    /// Platform naming scheme of the assets.
    pub naming: PlatformNaming,
    /// Oldest version with published assets.
    pub minimum_version: Option<String>,
    /// Repository queried for `latest` when `repo` fails.
    pub fallback_repo: Option<String>,
}

impl ReleaseLayout {
    /// This project's releases.
    #[must_use]
    pub fn project() -> Self {
        Self {
            name: "github",
            repo: PROJECT_REPO.to_string(),
            asset_prefix: "crowdin-cli".to_string(),
            naming: PlatformNaming::Legacy,
            minimum_version: None,
            fallback_repo: Some(UPSTREAM_REPO.to_string()),
        }
    }

    /// The standalone release repository.
    #[must_use]
    pub fn standalone() -> Self {
        Self {
            name: "standalone",
            repo: STANDALONE_REPO.to_string(),
            asset_prefix: "crowdin".to_string(),
            naming: PlatformNaming::Standard,
            minimum_version: Some(STANDALONE_MINIMUM_VERSION.to_string()),
            fallback_repo: Some(UPSTREAM_REPO.to_string()),
        }
    }

    /// Use a different asset repository.
    #[must_use]
    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = repo.into();
        self
    }

    /// Asset file name for a platform.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] when no asset is published for `platform`.
    pub fn asset_name(&self, platform: &PlatformKey) -> Result<String> {
        let suffix = self.naming.artifact_platform(platform)?;
        Ok(format!(
            "{}-{suffix}{}",
            self.asset_prefix,
            platform.executable_extension()
        ))
    }
}

/// Fetches executables attached to GitHub releases.
#[derive(Debug)]
pub struct GitHubReleaseBackend {
    layout: ReleaseLayout,
    client: GitHubClient,
    download_url: String,
    versions: VersionResolver,
}

impl GitHubReleaseBackend {
    /// Create a backend against github.com.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(layout: ReleaseLayout) -> Result<Self> {
        Ok(Self::with_client(
            layout,
            GitHubClient::new()?,
            GITHUB_DOWNLOAD_URL,
        ))
    }

    /// Create a backend with an explicit client and download base URL.
    #[must_use]
    pub fn with_client(
        layout: ReleaseLayout,
        client: GitHubClient,
        download_url: impl Into<String>,
    ) -> Self {
        let primary = Arc::new(GitHubReleaseSource::new(client.clone(), &layout.repo));
        let mut versions = VersionResolver::query(primary);
        if let Some(repo) = &layout.fallback_repo {
            versions = versions.with_fallback(Arc::new(GitHubReleaseSource::new(
                client.clone(),
                repo,
            )));
        }
        if let Some(minimum) = &layout.minimum_version {
            versions = versions.with_minimum(minimum);
        }

        Self {
            layout,
            client,
            download_url: download_url.into().trim_end_matches('/').to_string(),
            versions,
        }
    }

    /// The release layout this backend downloads from.
    #[must_use]
    pub fn layout(&self) -> &ReleaseLayout {
        &self.layout
    }

    /// Download URL of the asset for a version and platform.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] when no asset is published for `platform`.
    pub fn asset_url(&self, version: &ResolvedVersion, platform: &PlatformKey) -> Result<String> {
        Ok(format!(
            "{}/{}/releases/download/{}/{}",
            self.download_url,
            self.layout.repo,
            version.release_tag(),
            self.layout.asset_name(platform)?
        ))
    }
}

#[async_trait]
impl ArtifactBackend for GitHubReleaseBackend {
    fn name(&self) -> &'static str {
        self.layout.name
    }

    fn naming(&self) -> PlatformNaming {
        self.layout.naming
    }

    async fn resolve_version(
        &self,
        request: &VersionRequest,
        credentials: &Credentials,
    ) -> Result<ResolvedVersion> {
        self.versions.resolve(request, credentials).await
    }

    fn locate(&self, version: &ResolvedVersion, platform: &PlatformKey) -> Result<ArtifactRef> {
        Ok(ArtifactRef::http(self.asset_url(version, platform)?))
    }

    async fn fetch(
        &self,
        artifact: &ArtifactRef,
        _credentials: &Credentials,
        scratch: &Path,
    ) -> Result<PathBuf> {
        let ArtifactRef::Http { url } = artifact else {
            return Err(Error::request(
                artifact.to_string(),
                format!("{} backend cannot fetch registry artifacts", self.layout.name),
            ));
        };

        let dest = scratch.join("download");
        self.client.download(url, &dest).await?;
        info!(%url, path = ?dest, "Downloaded release asset");
        Ok(dest)
    }
}
