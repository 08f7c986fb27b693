//! Container registry backend for setup-crowdin.
//!
//! This crate provides functionality to:
//! - Exchange credentials for a registry pull token
//! - Fetch image manifests and download layer blobs with digest verification
//! - Unpack a layer and find the Crowdin CLI binary inside it
//!
//! # Example
//!
//! ```ignore
//! use setup_crowdin_tools_oci::{DEFAULT_REGISTRY, RegistryBackend};
//!
//! let backend = RegistryBackend::new(DEFAULT_REGISTRY, Some("IlyaGulya"))?;
//! let setup = Setup::new(Arc::new(backend), cache, paths, SetupOptions::default());
//! ```

#![warn(missing_docs)]

mod backend;
mod extract;
mod registry;

pub use backend::{
    DEFAULT_OWNER, DEFAULT_REGISTRY, IMAGE_BASE_NAME, REGISTRY_MINIMUM_VERSION, RegistryBackend,
    normalize_owner,
};
pub use extract::{locate_binary, unpack_archive};
pub use registry::{LayerDescriptor, MANIFEST_MEDIA_TYPE, Manifest, RegistryClient};
