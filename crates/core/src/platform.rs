//! Platform detection and artifact naming.
//!
//! Handles mapping between:
//! - host identifiers (`std::env::consts`, or Node-style `darwin`/`win32`/`x64`)
//! - the canonical [`PlatformKey`] (e.g., "linux-amd64")
//! - the platform suffix a backend uses in its published artifact names

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Linux
    Linux,
    /// macOS
    Macos,
    /// Windows
    Windows,
}

impl Os {
    /// Parse from a host identifier.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "macos" | "darwin" | "osx" => Some(Self::Macos),
            "windows" | "win32" => Some(Self::Windows),
            _ => None,
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Macos => write!(f, "macos"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// x86_64
    Amd64,
    /// aarch64
    Arm64,
}

impl Arch {
    /// Parse from a host identifier.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "amd64" | "x86_64" | "x64" => Some(Self::Amd64),
            "arm64" | "aarch64" => Some(Self::Arm64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amd64 => write!(f, "amd64"),
            Self::Arm64 => write!(f, "arm64"),
        }
    }
}

/// Canonical platform identifier combining OS and architecture.
///
/// `windows-arm64` is never constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformKey {
    /// Operating system.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
}

impl PlatformKey {
    /// Resolve a host OS/architecture pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] naming the offending pair when
    /// either value is unknown or the pair is `windows/arm64`.
    pub fn resolve(host_os: &str, host_arch: &str) -> Result<Self> {
        let unsupported = || Error::unsupported_platform(host_os, host_arch);
        let os = Os::parse(host_os).ok_or_else(unsupported)?;
        let arch = Arch::parse(host_arch).ok_or_else(unsupported)?;
        if os == Os::Windows && arch == Arch::Arm64 {
            return Err(unsupported());
        }
        Ok(Self { os, arch })
    }

    /// Detect the platform this process runs on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] on hosts without a published build.
    pub fn detect() -> Result<Self> {
        Self::resolve(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// File extension of executables on this platform.
    #[must_use]
    pub fn executable_extension(&self) -> &'static str {
        match self.os {
            Os::Windows => ".exe",
            Os::Linux | Os::Macos => "",
        }
    }

    /// Executable file name for `base` on this platform (`crowdin.exe` on windows).
    #[must_use]
    pub fn executable_name(&self, base: &str) -> String {
        format!("{base}{}", self.executable_extension())
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Platform naming convention of a backend's published artifacts.
///
/// Each scheme also defines the set of platforms the backend publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformNaming {
    /// Earliest release layout: `linux`, `macos`, `macos-arm64`, `windows`.
    Legacy,
    /// `linux-x86_64`, `linux-arm64`, `macos-x86_64`, `macos-arm64`, `windows-x86_64`.
    Standard,
    /// Container image suffixes: `linux-amd64`, `linux-arm64`, `macos-amd64`, `macos-arm64`.
    Registry,
}

impl PlatformNaming {
    /// Platform suffix used in artifact names, if this scheme publishes `key`.
    #[must_use]
    pub fn suffix(&self, key: &PlatformKey) -> Option<&'static str> {
        use Arch::{Amd64, Arm64};
        use Os::{Linux, Macos, Windows};

        match (self, key.os, key.arch) {
            (Self::Legacy, Linux, Amd64) => Some("linux"),
            (Self::Legacy, Macos, Amd64) => Some("macos"),
            (Self::Legacy, Macos, Arm64) => Some("macos-arm64"),
            (Self::Legacy, Windows, Amd64) => Some("windows"),

            (Self::Standard, Linux, Amd64) => Some("linux-x86_64"),
            (Self::Standard, Linux, Arm64) => Some("linux-arm64"),
            (Self::Standard, Macos, Amd64) => Some("macos-x86_64"),
            (Self::Standard, Macos, Arm64) => Some("macos-arm64"),
            (Self::Standard, Windows, Amd64) => Some("windows-x86_64"),

            (Self::Registry, Linux, Amd64) => Some("linux-amd64"),
            (Self::Registry, Linux, Arm64) => Some("linux-arm64"),
            (Self::Registry, Macos, Amd64) => Some("macos-amd64"),
            (Self::Registry, Macos, Arm64) => Some("macos-arm64"),

            _ => None,
        }
    }

    /// Platform suffix used in artifact names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] when the scheme has no artifact for `key`.
    pub fn artifact_platform(&self, key: &PlatformKey) -> Result<&'static str> {
        self.suffix(key)
            .ok_or_else(|| Error::unsupported_platform(key.os.to_string(), key.arch.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(os: Os, arch: Arch) -> PlatformKey {
        PlatformKey { os, arch }
    }

    #[test]
    fn test_resolve_rust_identifiers() {
        let p = PlatformKey::resolve("linux", "x86_64").unwrap();
        assert_eq!(p, key(Os::Linux, Arch::Amd64));

        let p = PlatformKey::resolve("macos", "aarch64").unwrap();
        assert_eq!(p, key(Os::Macos, Arch::Arm64));

        let p = PlatformKey::resolve("windows", "x86_64").unwrap();
        assert_eq!(p, key(Os::Windows, Arch::Amd64));
    }

    #[test]
    fn test_resolve_node_identifiers() {
        let p = PlatformKey::resolve("darwin", "x64").unwrap();
        assert_eq!(p, key(Os::Macos, Arch::Amd64));

        let p = PlatformKey::resolve("win32", "x64").unwrap();
        assert_eq!(p, key(Os::Windows, Arch::Amd64));
    }

    #[test]
    fn test_resolve_rejects_windows_arm64() {
        let err = PlatformKey::resolve("windows", "aarch64").unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedPlatform { ref os, ref arch } if os == "windows" && arch == "aarch64"
        ));
    }

    #[test]
    fn test_resolve_rejects_unknown() {
        assert!(PlatformKey::resolve("freebsd", "x86_64").is_err());
        assert!(PlatformKey::resolve("linux", "riscv64").is_err());
        assert!(PlatformKey::resolve("", "").is_err());
    }

    #[test]
    fn test_detect_matches_resolve() {
        // Only meaningful on supported CI hosts; skip elsewhere.
        if let Ok(p) = PlatformKey::detect() {
            let again = PlatformKey::resolve(std::env::consts::OS, std::env::consts::ARCH).unwrap();
            assert_eq!(p, again);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(key(Os::Linux, Arch::Amd64).to_string(), "linux-amd64");
        assert_eq!(key(Os::Macos, Arch::Arm64).to_string(), "macos-arm64");
    }

    #[test]
    fn test_executable_name() {
        assert_eq!(key(Os::Windows, Arch::Amd64).executable_name("crowdin"), "crowdin.exe");
        assert_eq!(key(Os::Linux, Arch::Arm64).executable_name("crowdin"), "crowdin");
    }

    #[test]
    fn test_standard_naming() {
        let n = PlatformNaming::Standard;
        assert_eq!(n.suffix(&key(Os::Linux, Arch::Amd64)), Some("linux-x86_64"));
        assert_eq!(n.suffix(&key(Os::Linux, Arch::Arm64)), Some("linux-arm64"));
        assert_eq!(n.suffix(&key(Os::Macos, Arch::Amd64)), Some("macos-x86_64"));
        assert_eq!(n.suffix(&key(Os::Macos, Arch::Arm64)), Some("macos-arm64"));
        assert_eq!(n.suffix(&key(Os::Windows, Arch::Amd64)), Some("windows-x86_64"));
    }

    #[test]
    fn test_legacy_naming() {
        let n = PlatformNaming::Legacy;
        assert_eq!(n.suffix(&key(Os::Linux, Arch::Amd64)), Some("linux"));
        assert_eq!(n.suffix(&key(Os::Macos, Arch::Amd64)), Some("macos"));
        assert_eq!(n.suffix(&key(Os::Macos, Arch::Arm64)), Some("macos-arm64"));
        assert_eq!(n.suffix(&key(Os::Windows, Arch::Amd64)), Some("windows"));
        assert_eq!(n.suffix(&key(Os::Linux, Arch::Arm64)), None);
    }

    #[test]
    fn test_registry_naming_has_no_windows() {
        let n = PlatformNaming::Registry;
        assert_eq!(n.suffix(&key(Os::Linux, Arch::Amd64)), Some("linux-amd64"));
        let err = n.artifact_platform(&key(Os::Windows, Arch::Amd64)).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported platform: windows/amd64");
    }

    #[test]
    fn test_os_arch_parse_case_insensitive() {
        assert_eq!(Os::parse("Darwin"), Some(Os::Macos));
        assert_eq!(Os::parse("LINUX"), Some(Os::Linux));
        assert_eq!(Arch::parse("AARCH64"), Some(Arch::Arm64));
        assert_eq!(Arch::parse("X64"), Some(Arch::Amd64));
        assert_eq!(Arch::parse("mips"), None);
    }
}
