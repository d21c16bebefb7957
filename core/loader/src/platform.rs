//! Host platform classification.
//!
//! Maps raw OS name and architecture strings onto the bundled resource
//! layout. Classification is recomputed on every load attempt.

use serde::{Deserialize, Serialize};
use std::fmt;

use virgilcrypto_common::{LibraryName, ResourcePath};

/// OS name prefix and resource directory for Linux.
pub const LINUX_OS_NAME: &str = "linux";

/// OS name prefix and resource directory for Windows.
pub const WINDOWS_OS_NAME: &str = "windows";

/// OS name prefix and resource directory for macOS.
pub const MACOS_OS_NAME: &str = "mac os";

/// Name reported for unrecognised systems.
pub const UNKNOWN_OS_NAME: &str = "unknown";

/// Operating system family of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    MacOs,
    Windows,
    Unknown,
}

impl OsFamily {
    /// Prefix match order. The first family whose prefix matches wins.
    pub const PRIORITY: [OsFamily; 3] = [OsFamily::Linux, OsFamily::Windows, OsFamily::MacOs];

    /// Classify a raw OS name by case-insensitive prefix.
    pub fn classify(os_name: &str) -> Self {
        let lowered = os_name.to_lowercase();
        Self::PRIORITY
            .into_iter()
            .find(|family| lowered.starts_with(family.as_str()))
            .unwrap_or(OsFamily::Unknown)
    }

    /// Canonical lowercase name, also the classification prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Linux => LINUX_OS_NAME,
            OsFamily::MacOs => MACOS_OS_NAME,
            OsFamily::Windows => WINDOWS_OS_NAME,
            OsFamily::Unknown => UNKNOWN_OS_NAME,
        }
    }

    /// Suffix given to an extracted library file.
    pub fn library_suffix(&self) -> &'static str {
        match self {
            OsFamily::Linux | OsFamily::MacOs => ".so",
            OsFamily::Windows => ".dll",
            OsFamily::Unknown => "",
        }
    }

    /// Resource directory holding this family's binary.
    ///
    /// The architecture is only part of the layout on Windows. Unknown
    /// systems get an empty directory.
    pub fn resource_directory(&self, arch: &str) -> String {
        match self {
            OsFamily::Linux => LINUX_OS_NAME.to_string(),
            OsFamily::MacOs => MACOS_OS_NAME.to_string(),
            OsFamily::Windows => format!("{}/{}", WINDOWS_OS_NAME, arch.to_lowercase()),
            OsFamily::Unknown => String::new(),
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw platform strings as reported by the host, normalised to lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    os_name: String,
    arch: String,
}

impl HostInfo {
    /// Build from raw OS name and architecture strings.
    pub fn new(os_name: impl AsRef<str>, arch: impl AsRef<str>) -> Self {
        Self {
            os_name: os_name.as_ref().to_lowercase(),
            arch: arch.as_ref().to_lowercase(),
        }
    }

    /// Describe the running process.
    pub fn current() -> Self {
        Self::new(host_os_name(), host_arch())
    }

    /// Lowercased OS name.
    pub fn os_name(&self) -> &str {
        &self.os_name
    }

    /// Lowercased architecture.
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Classified OS family.
    pub fn family(&self) -> OsFamily {
        OsFamily::classify(&self.os_name)
    }

    /// Resource directory for this host.
    pub fn resource_directory(&self) -> String {
        self.family().resource_directory(&self.arch)
    }

    /// Full resource path of `library` for this host.
    pub fn resource_path(&self, library: &LibraryName) -> ResourcePath {
        ResourcePath::new(self.resource_directory(), library)
    }
}

/// OS name in the form used by the bundled resource layout.
pub fn host_os_name() -> &'static str {
    match std::env::consts::OS {
        "linux" | "android" => "Linux",
        "macos" => "Mac OS X",
        "windows" => "Windows",
        other => other,
    }
}

/// Architecture in the form used by the bundled resource layout.
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        other => other,
    }
}
