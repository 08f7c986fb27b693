//! Registry v2 client for pulling single-layer images.
//!
//! Protocol:
//! 1. `GET {registry}/token?scope=repository:{image}:pull` with the caller's
//!    token, then anonymously with `service={host}`; an empty token is used
//!    if both fail so that later steps fail with a meaningful status.
//! 2. `GET {registry}/v2/{image}/manifests/{tag}`
//! 3. `GET {registry}/v2/{image}/blobs/{digest}` of the first layer

use reqwest::Client;
use serde::Deserialize;
use setup_crowdin_core::{Error, RegistryCoordinates, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

/// Media type requested for image manifests.
pub const MANIFEST_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Token endpoint response. Registries use either field name, some both.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

impl TokenResponse {
    fn into_token(self) -> Option<String> {
        self.token
            .or(self.access_token)
            .filter(|token| !token.is_empty())
    }
}

/// Image manifest. Only the layer list is used.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Layer descriptors in application order.
    #[serde(default)]
    pub layers: Vec<LayerDescriptor>,
}

/// A layer reference in a manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    /// Content digest (e.g., "sha256:abc...").
    pub digest: String,
    /// Layer media type.
    #[serde(default)]
    pub media_type: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
}

/// HTTP client for registry token exchange, manifests and blobs.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
}

impl RegistryClient {
    /// Create a registry client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpClient`] if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("setup-crowdin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }

    /// Obtain a pull token for `coords.image`.
    ///
    /// Never fails: returns an empty token when no endpoint issued one.
    pub async fn pull_token(&self, coords: &RegistryCoordinates, credentials: Option<&str>) -> String {
        let scope = format!("repository:{}:pull", coords.image);

        let url = format!("{}/token", coords.registry);
        let mut request = self.client.get(&url).query(&[("scope", scope.as_str())]);
        if let Some(token) = credentials {
            request = request.bearer_auth(token);
        }
        match self.request_token(request, &url).await {
            Ok(token) => return token,
            Err(e) => debug!(error = %e, "Authenticated token exchange failed"),
        }

        let request = self
            .client
            .get(&url)
            .query(&[("service", coords.host()), ("scope", scope.as_str())]);
        match self.request_token(request, &url).await {
            Ok(token) => token,
            Err(e) => {
                warn!(image = %coords.image, error = %e, "Failed to obtain registry token, continuing without one");
                String::new()
            }
        }
    }

    async fn request_token(&self, request: reqwest::RequestBuilder, url: &str) -> Result<String> {
        let response = request.send().await.map_err(|e| Error::request(url, e))?;
        if !response.status().is_success() {
            return Err(Error::DownloadFailed {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        let body: TokenResponse = response.json().await.map_err(|e| Error::request(url, e))?;
        let token = body
            .into_token()
            .ok_or_else(|| Error::request(url, "token response carried no token"))?;
        trace!(%url, "Obtained registry token");
        Ok(token)
    }

    /// Fetch the manifest for `coords`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManifestFetchFailed`] on a failed request, a
    /// non-success status, a malformed body or an empty layer list.
    pub async fn manifest(&self, coords: &RegistryCoordinates, token: &str) -> Result<Manifest> {
        let reference = coords.to_string();
        let url = format!(
            "{}/v2/{}/manifests/{}",
            coords.registry, coords.image, coords.tag
        );
        debug!(%url, "Fetching manifest");

        let mut request = self.client.get(&url).header("Accept", MANIFEST_MEDIA_TYPE);
        if !token.is_empty() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::manifest_fetch_failed(&reference, e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::manifest_fetch_failed(
                &reference,
                format!("HTTP {}", response.status().as_u16()),
            ));
        }

        let manifest: Manifest = response
            .json()
            .await
            .map_err(|e| Error::manifest_fetch_failed(&reference, e.to_string()))?;
        if manifest.layers.is_empty() {
            return Err(Error::manifest_fetch_failed(&reference, "manifest has no layers"));
        }

        debug!(%reference, layer_count = manifest.layers.len(), "Fetched manifest");
        Ok(manifest)
    }

    /// Download a blob to `dest`, verifying its `sha256` digest.
    ///
    /// On a digest mismatch the file is removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlobFetchFailed`] or [`Error::DigestMismatch`].
    pub async fn pull_blob(
        &self,
        coords: &RegistryCoordinates,
        layer: &LayerDescriptor,
        token: &str,
        dest: &Path,
    ) -> Result<()> {
        let url = format!(
            "{}/v2/{}/blobs/{}",
            coords.registry, coords.image, layer.digest
        );
        debug!(%url, ?dest, "Pulling blob");

        let mut request = self.client.get(&url);
        if !token.is_empty() {
            request = request.bearer_auth(token);
        }

        let failed = |message: String| Error::blob_fetch_failed(&layer.digest, message);
        let mut response = request.send().await.map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status().as_u16())));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;
        let mut hasher = Sha256::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        if let Some(expected) = layer.digest.strip_prefix("sha256:") {
            let actual = format!("{:x}", hasher.finalize());
            if actual != expected {
                tokio::fs::remove_file(dest).await.ok();
                return Err(Error::digest_mismatch(&layer.digest, format!("sha256:{actual}")));
            }
        }

        debug!(digest = %layer.digest, ?dest, "Pulled and verified blob");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_parse() {
        let json = r#"{
            "schemaVersion": 2,
            "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
            "config": {"mediaType": "application/vnd.docker.container.image.v1+json", "size": 10, "digest": "sha256:cfg"},
            "layers": [
                {"mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip", "size": 42, "digest": "sha256:first"},
                {"mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip", "size": 7, "digest": "sha256:second"}
            ]
        }"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.layers.len(), 2);
        assert_eq!(manifest.layers[0].digest, "sha256:first");
        assert_eq!(manifest.layers[0].size, Some(42));
    }

    #[test]
    fn test_manifest_without_layers() {
        let manifest: Manifest = serde_json::from_str(r#"{"schemaVersion": 2}"#).unwrap();
        assert!(manifest.layers.is_empty());
    }

    #[test]
    fn test_token_response_field_names() {
        let t: TokenResponse = serde_json::from_str(r#"{"token": "abc"}"#).unwrap();
        assert_eq!(t.into_token().as_deref(), Some("abc"));

        let t: TokenResponse = serde_json::from_str(r#"{"access_token": "xyz"}"#).unwrap();
        assert_eq!(t.into_token().as_deref(), Some("xyz"));

        let t: TokenResponse =
            serde_json::from_str(r#"{"token": "abc", "access_token": "abc", "expires_in": 300}"#)
                .unwrap();
        assert_eq!(t.into_token().as_deref(), Some("abc"));

        let t: TokenResponse = serde_json::from_str(r#"{"token": ""}"#).unwrap();
        assert_eq!(t.into_token(), None);
    }
}
