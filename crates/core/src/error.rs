//! Error types for Crowdin CLI setup.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for setup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, fetching and installing the CLI.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The host OS/architecture pair has no published artifact.
    #[error("Unsupported platform: {os}/{arch}")]
    #[diagnostic(code(setup_crowdin::platform::unsupported))]
    UnsupportedPlatform {
        /// Host operating system as reported.
        os: String,
        /// Host architecture as reported.
        arch: String,
    },

    /// The requested version is not a dotted numeric version or `latest`.
    #[error("Invalid version '{0}': expected 'latest' or a dotted numeric version such as 4.4.0")]
    #[diagnostic(code(setup_crowdin::version::invalid))]
    InvalidVersion(String),

    /// The requested version is older than the backend supports.
    #[error("Version {requested} is not supported, minimum supported version is {minimum}")]
    #[diagnostic(code(setup_crowdin::version::too_low))]
    VersionTooLow {
        /// The requested version.
        requested: String,
        /// The minimum version the backend publishes.
        minimum: String,
    },

    /// Every configured release source failed to report a latest version.
    #[error("Failed to resolve latest version: {}", attempts.join("; "))]
    #[diagnostic(code(setup_crowdin::version::resolution_failed))]
    VersionResolutionFailed {
        /// One `source: reason` entry per attempted source, in order.
        attempts: Vec<String>,
    },

    /// Registry manifest could not be fetched or was unusable.
    #[error("Failed to fetch manifest for {image}: {message}")]
    #[diagnostic(code(setup_crowdin::registry::manifest))]
    ManifestFetchFailed {
        /// Image reference (`name:tag`).
        image: String,
        /// Error message.
        message: String,
    },

    /// Registry blob could not be downloaded.
    #[error("Failed to fetch blob {digest}: {message}")]
    #[diagnostic(code(setup_crowdin::registry::blob))]
    BlobFetchFailed {
        /// The blob digest.
        digest: String,
        /// Error message.
        message: String,
    },

    /// Downloaded blob does not match its advertised digest.
    #[error("Digest mismatch for blob: expected {expected}, got {actual}")]
    #[diagnostic(code(setup_crowdin::registry::digest_mismatch))]
    DigestMismatch {
        /// The expected digest.
        expected: String,
        /// The computed digest.
        actual: String,
    },

    /// The extracted archive holds no file with the binary name.
    #[error("Binary '{0}' not found in archive")]
    #[diagnostic(code(setup_crowdin::archive::binary_not_found))]
    BinaryNotFoundInArchive(String),

    /// A direct download answered with a non-success status.
    #[error("Failed to download {url}: HTTP {status}")]
    #[diagnostic(code(setup_crowdin::download::status))]
    DownloadFailed {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The request could not be sent or its body could not be read.
    #[error("Request to {url} failed: {message}")]
    #[diagnostic(code(setup_crowdin::http::request))]
    Request {
        /// Requested URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// The HTTP client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    #[diagnostic(code(setup_crowdin::http::client))]
    HttpClient(String),

    /// Unpacking a layer archive failed.
    #[error("Failed to extract archive: {0}")]
    #[diagnostic(code(setup_crowdin::archive::extraction))]
    ExtractionFailed(String),

    /// Staging or storing the binary in the tool cache failed.
    #[error("Failed to install {tool}: {message}")]
    #[diagnostic(code(setup_crowdin::install::failed))]
    InstallFailed {
        /// Tool name.
        tool: String,
        /// Error message.
        message: String,
    },

    /// The installed binary did not run successfully.
    #[error("Installed binary {binary} failed verification: {message}")]
    #[diagnostic(
        code(setup_crowdin::install::verification),
        help("The downloaded binary may not match this runner's platform")
    )]
    VerificationFailed {
        /// Path of the binary that was invoked.
        binary: String,
        /// Error message.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    #[diagnostic(code(setup_crowdin::io))]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    #[diagnostic(code(setup_crowdin::json))]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an unsupported platform error.
    #[must_use]
    pub fn unsupported_platform(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Create a manifest fetch error.
    #[must_use]
    pub fn manifest_fetch_failed(image: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ManifestFetchFailed {
            image: image.into(),
            message: message.into(),
        }
    }

    /// Create a blob fetch error.
    #[must_use]
    pub fn blob_fetch_failed(digest: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BlobFetchFailed {
            digest: digest.into(),
            message: message.into(),
        }
    }

    /// Create a digest mismatch error.
    #[must_use]
    pub fn digest_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::DigestMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a request error.
    #[must_use]
    pub fn request(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Request {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an install error.
    #[must_use]
    pub fn install_failed(tool: impl Into<String>, message: impl ToString) -> Self {
        Self::InstallFailed {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    /// Create a verification error.
    #[must_use]
    pub fn verification_failed(binary: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VerificationFailed {
            binary: binary.into(),
            message: message.into(),
        }
    }

    /// Whether a backend may retry the fetch against its fallback artifact.
    #[must_use]
    pub fn allows_artifact_fallback(&self) -> bool {
        matches!(
            self,
            Self::ManifestFetchFailed { .. } | Self::BlobFetchFailed { .. } | Self::DigestMismatch { .. }
        )
    }
}
