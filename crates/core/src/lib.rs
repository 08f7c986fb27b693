//! Core of the Crowdin CLI setup action.
//!
//! This crate provides:
//! - Platform detection and per-backend artifact naming
//! - Version requests, numeric comparison and `latest` resolution with fallback
//! - The [`ArtifactBackend`] trait implemented by distribution channels
//! - A tool cache keyed by name, version and platform
//! - [`Setup`], which sequences everything into a single fallible run
//!
//! # Example
//!
//! ```ignore
//! use setup_crowdin_core::{DirToolCache, Setup, SetupOptions, SetupRequest, VersionRequest};
//!
//! let setup = Setup::new(backend, Arc::new(DirToolCache::default()), paths, SetupOptions::default());
//! let installed = setup.run(&SetupRequest::new(VersionRequest::parse("latest")?)).await?;
//! println!("{}", installed.dir.display());
//! ```

#![warn(missing_docs)]

mod artifact;
mod backend;
mod cache;
mod error;
mod install;
mod platform;
mod setup;
mod version;

pub use artifact::{ArtifactRef, RegistryCoordinates};
pub use backend::{ArtifactBackend, Credentials};
pub use cache::{CacheKey, DirToolCache, ToolCache};
pub use error::{Error, Result};
pub use install::{Installer, make_executable, verify_binary};
pub use platform::{Arch, Os, PlatformKey, PlatformNaming};
pub use setup::{
    BINARY_NAME, Installed, PathSink, Setup, SetupOptions, SetupRequest, SetupState, TOOL_NAME,
};
pub use version::{
    LATEST, ReleaseSource, ResolvedVersion, VersionRequest, VersionResolver, compare_versions,
    is_at_least,
};
