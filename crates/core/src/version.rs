//! Version requests, comparison and resolution.
//!
//! A request is either `latest` or a concrete dotted numeric version. Concrete
//! requests resolve without touching the network; `latest` is answered by the
//! backend's release sources, primary first and then at most one fallback.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::Credentials;
use crate::{Error, Result};

/// Sentinel accepted in place of a concrete version.
pub const LATEST: &str = "latest";

/// A user-supplied version selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRequest {
    /// The most recent published release.
    Latest,
    /// A concrete version without leading `v` (e.g., "4.4.0").
    Exact(String),
}

impl VersionRequest {
    /// Parse a version input. Empty input means `latest`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] when the input is not dotted numeric.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(LATEST) {
            return Ok(Self::Latest);
        }

        let version = strip_v_prefix(trimmed);
        let valid = !version.is_empty()
            && version
                .split('.')
                .all(|segment| !segment.is_empty() && segment.parse::<u64>().is_ok());
        if !valid {
            return Err(Error::InvalidVersion(input.to_string()));
        }

        Ok(Self::Exact(version.to_string()))
    }
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str(LATEST),
            Self::Exact(v) => f.write_str(v),
        }
    }
}

/// A concrete version chosen for download, without leading `v`.
///
/// The floating version `latest` is only produced by backends that can
/// download a moving tag directly (container images).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedVersion(String);

impl ResolvedVersion {
    /// Create from a published tag or version, stripping a single leading `v`.
    #[must_use]
    pub fn new(version: impl AsRef<str>) -> Self {
        Self(strip_v_prefix(version.as_ref().trim()).to_string())
    }

    /// The floating `latest` tag.
    #[must_use]
    pub fn floating() -> Self {
        Self(LATEST.to_string())
    }

    /// Whether this names a moving tag rather than a fixed release.
    #[must_use]
    pub fn is_floating(&self) -> bool {
        self.0 == LATEST
    }

    /// The bare version (e.g., "4.5.0").
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Git tag of the release (e.g., "v4.5.0").
    #[must_use]
    pub fn release_tag(&self) -> String {
        format!("v{}", self.0)
    }
}

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn strip_v_prefix(s: &str) -> &str {
    s.strip_prefix('v')
        .or_else(|| s.strip_prefix('V'))
        .unwrap_or(s)
}

/// Compare two dotted versions segment by segment.
///
/// Segments are compared as unsigned integers; missing trailing segments
/// count as 0, and segments that do not parse count as 0.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |s: &str| -> Vec<u64> {
        strip_v_prefix(s)
            .split('.')
            .map(|segment| segment.parse().unwrap_or(0))
            .collect()
    };
    let left = parse(a);
    let right = parse(b);
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

/// Whether `version` is equal to or newer than `minimum`.
#[must_use]
pub fn is_at_least(version: &str, minimum: &str) -> bool {
    compare_versions(version, minimum) != Ordering::Less
}

/// A place that can report the most recent published release tag.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Human-readable name used in diagnostics (e.g., "crowdin/crowdin-cli").
    fn describe(&self) -> String;

    /// Fetch the raw tag of the most recent release (e.g., "v4.5.0").
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be queried.
    async fn latest_tag(&self, credentials: &Credentials) -> Result<String>;
}

/// How a `latest` request is answered.
#[derive(Clone)]
enum LatestStrategy {
    /// Use the floating tag directly.
    Floating,
    /// Query the primary source, then the fallback once.
    Query {
        primary: Arc<dyn ReleaseSource>,
        fallback: Option<Arc<dyn ReleaseSource>>,
    },
}

/// Resolves a [`VersionRequest`] to a [`ResolvedVersion`].
#[derive(Clone)]
pub struct VersionResolver {
    latest: LatestStrategy,
    minimum: Option<String>,
}

impl VersionResolver {
    /// Resolve `latest` by querying `primary`.
    #[must_use]
    pub fn query(primary: Arc<dyn ReleaseSource>) -> Self {
        Self {
            latest: LatestStrategy::Query {
                primary,
                fallback: None,
            },
            minimum: None,
        }
    }

    /// Resolve `latest` to the floating tag without network access.
    #[must_use]
    pub fn floating() -> Self {
        Self {
            latest: LatestStrategy::Floating,
            minimum: None,
        }
    }

    /// Query `fallback` once when the primary source fails.
    #[must_use]
    pub fn with_fallback(mut self, source: Arc<dyn ReleaseSource>) -> Self {
        if let LatestStrategy::Query { fallback, .. } = &mut self.latest {
            *fallback = Some(source);
        }
        self
    }

    /// Reject concrete requests older than `minimum`.
    #[must_use]
    pub fn with_minimum(mut self, minimum: impl Into<String>) -> Self {
        self.minimum = Some(minimum.into());
        self
    }

    /// The minimum supported version, if any.
    #[must_use]
    pub fn minimum(&self) -> Option<&str> {
        self.minimum.as_deref()
    }

    /// Resolve a request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VersionTooLow`] for concrete versions below the
    /// minimum, or [`Error::VersionResolutionFailed`] when every source failed.
    pub async fn resolve(
        &self,
        request: &VersionRequest,
        credentials: &Credentials,
    ) -> Result<ResolvedVersion> {
        match request {
            VersionRequest::Exact(version) => {
                if let Some(minimum) = &self.minimum {
                    if !is_at_least(version, minimum) {
                        return Err(Error::VersionTooLow {
                            requested: version.clone(),
                            minimum: minimum.clone(),
                        });
                    }
                }
                Ok(ResolvedVersion::new(version))
            }
            VersionRequest::Latest => match &self.latest {
                LatestStrategy::Floating => {
                    debug!("Using floating latest tag");
                    Ok(ResolvedVersion::floating())
                }
                LatestStrategy::Query { primary, fallback } => {
                    self.query_latest(primary.as_ref(), fallback.as_deref(), credentials)
                        .await
                }
            },
        }
    }

    async fn query_latest(
        &self,
        primary: &dyn ReleaseSource,
        fallback: Option<&dyn ReleaseSource>,
        credentials: &Credentials,
    ) -> Result<ResolvedVersion> {
        let mut attempts = Vec::new();

        match primary.latest_tag(credentials).await {
            Ok(tag) => return Ok(resolved_from(&tag, primary)),
            Err(e) => attempts.push(format!("{}: {e}", primary.describe())),
        }

        let Some(fallback) = fallback else {
            return Err(Error::VersionResolutionFailed { attempts });
        };

        warn!(
            source = %primary.describe(),
            error = %attempts[0],
            "Failed to get latest version, falling back to {}",
            fallback.describe()
        );

        match fallback.latest_tag(credentials).await {
            Ok(tag) => Ok(resolved_from(&tag, fallback)),
            Err(e) => {
                attempts.push(format!("{}: {e}", fallback.describe()));
                Err(Error::VersionResolutionFailed { attempts })
            }
        }
    }
}

fn resolved_from(tag: &str, source: &dyn ReleaseSource) -> ResolvedVersion {
    let resolved = ResolvedVersion::new(tag);
    info!(%tag, version = %resolved, source = %source.describe(), "Resolved latest version");
    resolved
}

impl fmt::Debug for VersionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let latest = match &self.latest {
            LatestStrategy::Floating => "floating".to_string(),
            LatestStrategy::Query { primary, fallback } => match fallback {
                Some(fb) => format!("{} -> {}", primary.describe(), fb.describe()),
                None => primary.describe(),
            },
        };
        f.debug_struct("VersionResolver")
            .field("latest", &latest)
            .field("minimum", &self.minimum)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    struct StaticSource {
        name: &'static str,
        tag: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn new(name: &'static str, tag: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                name,
                tag,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(AtomicOrdering::SeqCst)
        }
    }

    #[async_trait]
    impl ReleaseSource for StaticSource {
        fn describe(&self) -> String {
            self.name.to_string()
        }

        async fn latest_tag(&self, _credentials: &Credentials) -> Result<String> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            self.tag.map(str::to_string).ok_or_else(|| Error::DownloadFailed {
                status: 404,
                url: format!("https://api.github.com/repos/{}/releases/latest", self.name),
            })
        }
    }

    #[test]
    fn test_compare_versions() {
        assert!(is_at_least("4.4.0", "4.4.0"));
        assert!(!is_at_least("4.3.9", "4.4.0"));
        assert!(is_at_least("4.4", "4.4.0"));
        assert!(is_at_least("4.10.0", "4.9.0"));
        assert_eq!(compare_versions("4.4.0.1", "4.4"), Ordering::Greater);
        assert_eq!(compare_versions("v5.0.0", "5"), Ordering::Equal);
    }

    #[test]
    fn test_parse_request() {
        assert_eq!(VersionRequest::parse("latest").unwrap(), VersionRequest::Latest);
        assert_eq!(VersionRequest::parse("LATEST").unwrap(), VersionRequest::Latest);
        assert_eq!(VersionRequest::parse("").unwrap(), VersionRequest::Latest);
        assert_eq!(
            VersionRequest::parse("4.4.0").unwrap(),
            VersionRequest::Exact("4.4.0".into())
        );
        assert_eq!(
            VersionRequest::parse(" v4.5.1 ").unwrap(),
            VersionRequest::Exact("4.5.1".into())
        );
    }

    #[test]
    fn test_parse_request_invalid() {
        for input in ["4.x", "four", "4..0", "v", "4.4.0-rc1"] {
            assert!(
                matches!(VersionRequest::parse(input), Err(Error::InvalidVersion(_))),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_resolved_version_tags() {
        let v = ResolvedVersion::new("v4.5.0");
        assert_eq!(v.as_str(), "4.5.0");
        assert_eq!(v.release_tag(), "v4.5.0");
        assert!(!v.is_floating());
        assert!(ResolvedVersion::floating().is_floating());
    }

    #[tokio::test]
    async fn test_exact_request_skips_sources() {
        let primary = StaticSource::new("primary", Some("v9.9.9"));
        let resolver = VersionResolver::query(primary.clone());

        let resolved = resolver
            .resolve(&VersionRequest::Exact("4.4.0".into()), &Credentials::default())
            .await
            .unwrap();

        assert_eq!(resolved.as_str(), "4.4.0");
        assert_eq!(primary.calls(), 0);
    }

    #[tokio::test]
    async fn test_minimum_version_rejected_before_network() {
        let primary = StaticSource::new("primary", Some("v9.9.9"));
        let resolver = VersionResolver::query(primary.clone()).with_minimum("4.4.0");

        let err = resolver
            .resolve(&VersionRequest::Exact("4.3.9".into()), &Credentials::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::VersionTooLow { .. }));
        assert_eq!(primary.calls(), 0);
    }

    #[tokio::test]
    async fn test_latest_strips_v_prefix() {
        let resolver = VersionResolver::query(StaticSource::new("primary", Some("v4.5.0")));
        let resolved = resolver
            .resolve(&VersionRequest::Latest, &Credentials::default())
            .await
            .unwrap();
        assert_eq!(resolved.as_str(), "4.5.0");
    }

    #[tokio::test]
    async fn test_latest_falls_back_exactly_once() {
        let primary = StaticSource::new("primary", None);
        let fallback = StaticSource::new("fallback", Some("4.6.0"));
        let resolver = VersionResolver::query(primary.clone()).with_fallback(fallback.clone());

        let resolved = resolver
            .resolve(&VersionRequest::Latest, &Credentials::default())
            .await
            .unwrap();

        assert_eq!(resolved.as_str(), "4.6.0");
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_latest_fails_when_all_sources_fail() {
        let primary = StaticSource::new("primary", None);
        let fallback = StaticSource::new("fallback", None);
        let resolver = VersionResolver::query(primary.clone()).with_fallback(fallback.clone());

        let err = resolver
            .resolve(&VersionRequest::Latest, &Credentials::default())
            .await
            .unwrap_err();

        match err {
            Error::VersionResolutionFailed { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].starts_with("primary:"));
                assert!(attempts[1].starts_with("fallback:"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_latest_without_fallback_fails_after_primary() {
        let primary = StaticSource::new("primary", None);
        let resolver = VersionResolver::query(primary.clone());

        let err = resolver
            .resolve(&VersionRequest::Latest, &Credentials::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::VersionResolutionFailed { ref attempts } if attempts.len() == 1));
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_floating_latest() {
        let resolver = VersionResolver::floating().with_minimum("4.4.0");
        let resolved = resolver
            .resolve(&VersionRequest::Latest, &Credentials::default())
            .await
            .unwrap();
        assert!(resolved.is_floating());
        assert_eq!(resolver.minimum(), Some("4.4.0"));
    }
}
