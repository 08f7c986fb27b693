//! Minimal GitHub REST and release-download client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use setup_crowdin_core::{Credentials, Error, ReleaseSource, Result};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Default GitHub REST API base URL.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Release metadata from the API. Only the tag is needed.
#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

/// HTTP client for the GitHub API and release asset downloads.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
}

impl GitHubClient {
    /// Create a client against the public GitHub API.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpClient`] if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self> {
        Self::with_api_url(GITHUB_API_URL)
    }

    /// Create a client against a custom API base URL (GitHub Enterprise, tests).
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpClient`] if the TLS backend cannot be initialised.
    pub fn with_api_url(api_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("setup-crowdin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the tag of the most recent release of `repo` ("owner/name").
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, non-success statuses or
    /// malformed responses.
    pub async fn latest_release_tag(&self, repo: &str, token: Option<&str>) -> Result<String> {
        let url = format!("{}/repos/{}/releases/latest", self.api_url, repo);
        debug!(%url, authenticated = token.is_some(), "Fetching latest release");

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| Error::request(&url, e))?;
        if !response.status().is_success() {
            return Err(Error::DownloadFailed {
                status: response.status().as_u16(),
                url,
            });
        }

        let release: Release = response.json().await.map_err(|e| Error::request(&url, e))?;
        Ok(release.tag_name)
    }

    /// Download `url` to `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DownloadFailed`] with the status and URL on any
    /// non-success response.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        debug!(%url, ?dest, "Downloading asset");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::request(url, e))?;

        if !response.status().is_success() {
            return Err(Error::DownloadFailed {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;
        while let Some(chunk) = response.chunk().await.map_err(|e| Error::request(url, e))? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(())
    }
}

/// The latest release of a GitHub repository, as a version source.
#[derive(Debug, Clone)]
pub struct GitHubReleaseSource {
    client: GitHubClient,
    repo: String,
}

impl GitHubReleaseSource {
    /// Query releases of `repo` ("owner/name").
    #[must_use]
    pub fn new(client: GitHubClient, repo: impl Into<String>) -> Self {
        Self {
            client,
            repo: repo.into(),
        }
    }
}

#[async_trait]
impl ReleaseSource for GitHubReleaseSource {
    fn describe(&self) -> String {
        self.repo.clone()
    }

    async fn latest_tag(&self, credentials: &Credentials) -> Result<String> {
        self.client
            .latest_release_tag(&self.repo, credentials.github_token())
            .await
    }
}
