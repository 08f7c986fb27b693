//! Artifact backend trait for pluggable distribution channels.
//!
//! This module defines the `ArtifactBackend` trait that allows different
//! channels (GitHub releases, standalone release repositories, container
//! registries) to be driven uniformly by [`Setup`](crate::Setup).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};

use crate::Result;
use crate::artifact::ArtifactRef;
use crate::platform::{PlatformKey, PlatformNaming};
use crate::version::{ResolvedVersion, VersionRequest};

/// Authentication material for the GitHub API and container registries.
///
/// Both tokens are optional; backends fall back to anonymous access.
#[derive(Clone, Default)]
pub struct Credentials {
    github_token: Option<SecretString>,
    registry_token: Option<SecretString>,
}

impl Credentials {
    /// Credentials with no tokens.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Use `token` for the GitHub API. Empty tokens are ignored.
    #[must_use]
    pub fn with_github_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = non_empty(token.into());
        self
    }

    /// Use `token` for registry token exchange. Empty tokens are ignored.
    #[must_use]
    pub fn with_registry_token(mut self, token: impl Into<String>) -> Self {
        self.registry_token = non_empty(token.into());
        self
    }

    /// GitHub API token, if any.
    #[must_use]
    pub fn github_token(&self) -> Option<&str> {
        self.github_token.as_ref().map(|token| token.expose_secret())
    }

    /// Registry token, falling back to the GitHub token (GHCR accepts it).
    #[must_use]
    pub fn registry_token(&self) -> Option<&str> {
        self.registry_token
            .as_ref()
            .or(self.github_token.as_ref())
            .map(|token| token.expose_secret())
    }
}

fn non_empty(token: String) -> Option<SecretString> {
    if token.trim().is_empty() {
        None
    } else {
        Some(SecretString::from(token))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("github_token", &self.github_token.as_ref().map(|_| "[REDACTED]"))
            .field("registry_token", &self.registry_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// A distribution channel the binary can be obtained from.
///
/// Each backend resolves versions, derives artifact references for a
/// platform, and downloads the binary into a scratch directory. `Setup`
/// sequences these calls and owns caching and installation.
///
/// # Example
///
/// ```ignore
/// pub struct GitHubReleaseBackend { /* ... */ }
///
/// #[async_trait]
/// impl ArtifactBackend for GitHubReleaseBackend {
///     fn name(&self) -> &'static str { "github" }
///     fn naming(&self) -> PlatformNaming { PlatformNaming::Legacy }
///     // ...
/// }
/// ```
#[async_trait]
pub trait ArtifactBackend: Send + Sync {
    /// Backend name (e.g., "github", "standalone", "registry").
    fn name(&self) -> &'static str;

    /// Naming scheme, which also defines the set of supported platforms.
    fn naming(&self) -> PlatformNaming;

    /// Resolve a version request to a concrete version.
    ///
    /// Concrete requests must resolve without network access.
    ///
    /// # Errors
    ///
    /// Returns an error if the version is below the backend minimum or the
    /// latest release cannot be determined.
    async fn resolve_version(
        &self,
        request: &VersionRequest,
        credentials: &Credentials,
    ) -> Result<ResolvedVersion>;

    /// Derive the artifact reference for a version and platform.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform is not published by this backend.
    fn locate(&self, version: &ResolvedVersion, platform: &PlatformKey) -> Result<ArtifactRef>;

    /// Alternative reference to try once after fetching `artifact` failed.
    ///
    /// Must return `None` for a reference that is itself a fallback.
    fn fallback(&self, _artifact: &ArtifactRef) -> Option<ArtifactRef> {
        None
    }

    /// Download the binary for `artifact` into `scratch`.
    ///
    /// Returns the path of the downloaded binary file.
    ///
    /// # Errors
    ///
    /// Returns an error if the download or extraction fails.
    async fn fetch(
        &self,
        artifact: &ArtifactRef,
        credentials: &Credentials,
        scratch: &Path,
    ) -> Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_ignore_empty_tokens() {
        let c = Credentials::anonymous()
            .with_github_token("")
            .with_registry_token("   ");
        assert_eq!(c.github_token(), None);
        assert_eq!(c.registry_token(), None);
    }

    #[test]
    fn test_registry_token_falls_back_to_github_token() {
        let c = Credentials::anonymous().with_github_token("gh-token");
        assert_eq!(c.github_token(), Some("gh-token"));
        assert_eq!(c.registry_token(), Some("gh-token"));

        let c = c.with_registry_token("ghcr-token");
        assert_eq!(c.registry_token(), Some("ghcr-token"));
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let c = Credentials::anonymous().with_github_token("super-secret");
        let debug = format!("{c:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
