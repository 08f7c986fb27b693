//! Container registry backend.

use async_trait::async_trait;
use setup_crowdin_core::{
    ArtifactBackend, ArtifactRef, BINARY_NAME, Credentials, Error, PlatformKey, PlatformNaming,
    RegistryCoordinates, ResolvedVersion, Result, VersionRequest, VersionResolver,
};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::extract::{locate_binary, unpack_archive_async};
use crate::registry::RegistryClient;

/// Default registry base URL.
pub const DEFAULT_REGISTRY: &str = "https://ghcr.io";

/// Image owner used when none is configured.
pub const DEFAULT_OWNER: &str = "ilyagulya";

/// Image name shared by the per-platform images and the generic image.
pub const IMAGE_BASE_NAME: &str = "crowdin-cli";

/// First version published to the registry.
pub const REGISTRY_MINIMUM_VERSION: &str = "4.4.0";

/// Registry repository owners must be lower case.
#[must_use]
pub fn normalize_owner(owner: Option<&str>) -> String {
    owner
        .map(str::trim)
        .filter(|owner| !owner.is_empty())
        .unwrap_or(DEFAULT_OWNER)
        .to_lowercase()
}

/// Pulls the binary from single-layer images in a Docker v2 registry.
///
/// Images are named `{owner}/crowdin-cli-{platform}`. When the per-platform
/// image cannot be pulled, the generic `{owner}/crowdin-cli` image is tried
/// once. Registry images only exist for unix platforms, so the binary carries
/// no extension.
#[derive(Debug)]
pub struct RegistryBackend {
    client: RegistryClient,
    registry: String,
    owner: String,
    binary_name: String,
    versions: VersionResolver,
}

impl RegistryBackend {
    /// Create a backend for `owner`'s images on `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(registry: impl Into<String>, owner: Option<&str>) -> Result<Self> {
        Ok(Self::with_client(RegistryClient::new()?, registry, owner))
    }

    /// Create a backend with an explicit client.
    #[must_use]
    pub fn with_client(
        client: RegistryClient,
        registry: impl Into<String>,
        owner: Option<&str>,
    ) -> Self {
        Self {
            client,
            registry: registry.into().trim_end_matches('/').to_string(),
            owner: normalize_owner(owner),
            binary_name: BINARY_NAME.to_string(),
            versions: VersionResolver::floating().with_minimum(REGISTRY_MINIMUM_VERSION),
        }
    }

    /// Normalised image owner.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    fn generic_image(&self) -> String {
        format!("{}/{IMAGE_BASE_NAME}", self.owner)
    }
}

#[async_trait]
impl ArtifactBackend for RegistryBackend {
    fn name(&self) -> &'static str {
        "registry"
    }

    fn naming(&self) -> PlatformNaming {
        PlatformNaming::Registry
    }

    async fn resolve_version(
        &self,
        request: &VersionRequest,
        credentials: &Credentials,
    ) -> Result<ResolvedVersion> {
        self.versions.resolve(request, credentials).await
    }

    fn locate(&self, version: &ResolvedVersion, platform: &PlatformKey) -> Result<ArtifactRef> {
        let suffix = PlatformNaming::Registry.artifact_platform(platform)?;
        Ok(ArtifactRef::Registry(RegistryCoordinates::new(
            &self.registry,
            format!("{}/{IMAGE_BASE_NAME}-{suffix}", self.owner),
            version.as_str(),
        )))
    }

    fn fallback(&self, artifact: &ArtifactRef) -> Option<ArtifactRef> {
        match artifact {
            ArtifactRef::Registry(coords) if coords.image != self.generic_image() => {
                Some(ArtifactRef::Registry(coords.with_image(self.generic_image())))
            }
            _ => None,
        }
    }

    async fn fetch(
        &self,
        artifact: &ArtifactRef,
        credentials: &Credentials,
        scratch: &Path,
    ) -> Result<PathBuf> {
        let ArtifactRef::Registry(coords) = artifact else {
            return Err(Error::request(
                artifact.to_string(),
                "registry backend cannot fetch direct downloads",
            ));
        };

        let token = self
            .client
            .pull_token(coords, credentials.registry_token())
            .await;
        let manifest = self.client.manifest(coords, &token).await?;

        // Only the first layer is read; multi-layer images are not merged.
        let layer = manifest
            .layers
            .first()
            .ok_or_else(|| Error::manifest_fetch_failed(coords.to_string(), "manifest has no layers"))?;
        let archive = scratch.join("layer.tar.gz");
        self.client.pull_blob(coords, layer, &token, &archive).await?;

        let rootfs = scratch.join("rootfs");
        unpack_archive_async(archive, rootfs.clone()).await?;
        let binary = locate_binary(&rootfs, &self.binary_name)?;

        info!(image = %coords, digest = %layer.digest, path = ?binary, "Pulled binary from registry");
        Ok(binary)
    }
}
