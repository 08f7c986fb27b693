//! Artifact references produced by backends.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the binary for a resolved version and platform can be downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ArtifactRef {
    /// A direct download URL.
    Http {
        /// Fully qualified download URL.
        url: String,
    },
    /// A single-layer image in an OCI/Docker v2 registry.
    Registry(RegistryCoordinates),
}

impl ArtifactRef {
    /// Create a direct download reference.
    #[must_use]
    pub fn http(url: impl Into<String>) -> Self {
        Self::Http { url: url.into() }
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { url } => f.write_str(url),
            Self::Registry(coords) => write!(f, "{coords}"),
        }
    }
}

/// Registry coordinates of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCoordinates {
    /// Registry base URL (e.g., "https://ghcr.io").
    pub registry: String,
    /// Repository name (e.g., "ilyagulya/crowdin-cli-linux-amd64").
    pub image: String,
    /// Tag to pull (bare version or "latest").
    pub tag: String,
    /// Manifest digest, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl RegistryCoordinates {
    /// Create coordinates without a pinned digest.
    #[must_use]
    pub fn new(registry: impl Into<String>, image: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            registry: registry.into().trim_end_matches('/').to_string(),
            image: image.into(),
            tag: tag.into(),
            digest: None,
        }
    }

    /// Registry host without scheme (e.g., "ghcr.io").
    #[must_use]
    pub fn host(&self) -> &str {
        self.registry
            .split_once("://")
            .map_or(self.registry.as_str(), |(_, host)| host)
    }

    /// Same registry and tag, different image name.
    #[must_use]
    pub fn with_image(&self, image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            digest: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for RegistryCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.host(), self.image, self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_host() {
        let c = RegistryCoordinates::new("https://ghcr.io/", "owner/crowdin-cli", "4.5.0");
        assert_eq!(c.registry, "https://ghcr.io");
        assert_eq!(c.host(), "ghcr.io");
        assert_eq!(c.to_string(), "ghcr.io/owner/crowdin-cli:4.5.0");
    }

    #[test]
    fn test_host_without_scheme() {
        let c = RegistryCoordinates::new("localhost:5000", "img", "latest");
        assert_eq!(c.host(), "localhost:5000");
    }

    #[test]
    fn test_with_image_keeps_tag() {
        let c = RegistryCoordinates::new("https://ghcr.io", "owner/crowdin-cli-linux-amd64", "4.5.0");
        let generic = c.with_image("owner/crowdin-cli");
        assert_eq!(generic.tag, "4.5.0");
        assert_eq!(generic.registry, "https://ghcr.io");
        assert_eq!(generic.image, "owner/crowdin-cli");
    }

    #[test]
    fn test_artifact_serialization() {
        let a = ArtifactRef::http("https://example.com/crowdin");
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["kind"], "http");
        assert_eq!(json["url"], "https://example.com/crowdin");
    }
}
