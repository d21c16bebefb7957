//! Loader configuration.

use serde::{Deserialize, Serialize};
use std::env::{self, VarError};
use std::path::PathBuf;
use std::str::FromStr;

use virgilcrypto_common::{Error, LibraryName, Result};

use crate::extract::DEFAULT_COPY_CHUNK_SIZE;
use crate::platform::HostInfo;

/// Overrides the logical library name.
pub const ENV_LIBRARY: &str = "VIRGIL_CRYPTO_LIBRARY";

/// Filesystem root of the bundled resource layout.
pub const ENV_RESOURCE_DIR: &str = "VIRGIL_CRYPTO_RESOURCE_DIR";

/// Copy chunk size used during extraction.
pub const ENV_COPY_CHUNK: &str = "VIRGIL_CRYPTO_COPY_CHUNK";

/// Temporary file policy: `delete_after_load` or `keep`.
pub const ENV_TEMP_CLEANUP: &str = "VIRGIL_CRYPTO_TEMP_CLEANUP";

/// Overrides the host OS name.
pub const ENV_OS_NAME: &str = "VIRGIL_CRYPTO_OS_NAME";

/// Overrides the host architecture.
pub const ENV_ARCH: &str = "VIRGIL_CRYPTO_ARCH";

/// Text-valued variables read by [`LoaderConfig::from_env`].
const ENV_TEXT_KEYS: [&str; 5] = [ENV_LIBRARY, ENV_COPY_CHUNK, ENV_TEMP_CLEANUP, ENV_OS_NAME, ENV_ARCH];

/// What happens to an extracted library file after loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempCleanup {
    /// Remove the file once the library is mapped. Where the OS refuses,
    /// removal is retried when the loaded library is dropped.
    #[default]
    DeleteAfterLoad,
    /// Leave the file in place.
    Keep,
}

impl FromStr for TempCleanup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "delete_after_load" | "delete" => Ok(TempCleanup::DeleteAfterLoad),
            "keep" => Ok(TempCleanup::Keep),
            other => Err(Error::Config(format!(
                "Unknown temp cleanup policy '{}'. Use: delete_after_load or keep",
                other
            ))),
        }
    }
}

/// Configuration for [`NativeLoader`](crate::NativeLoader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Logical library name.
    pub library_name: LibraryName,
    /// Root of the bundled resource layout on disk.
    pub resource_dir: Option<PathBuf>,
    /// Copy buffer size used during extraction.
    pub copy_chunk_size: usize,
    /// Temporary file policy.
    pub temp_cleanup: TempCleanup,
    /// Directory for extracted files; the system temp dir if unset.
    pub extract_dir: Option<PathBuf>,
    /// Reported OS name override.
    pub os_name: Option<String>,
    /// Reported architecture override.
    pub arch: Option<String>,
    /// Go straight to bundled resources.
    pub skip_search_path: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            library_name: LibraryName::default(),
            resource_dir: None,
            copy_chunk_size: DEFAULT_COPY_CHUNK_SIZE,
            temp_cleanup: TempCleanup::default(),
            extract_dir: None,
            os_name: None,
            arch: None,
            skip_search_path: false,
        }
    }
}

impl LoaderConfig {
    /// Check invariants not enforced by the types.
    ///
    /// # Errors
    /// - Zero copy chunk size
    pub fn validate(&self) -> Result<()> {
        if self.copy_chunk_size == 0 {
            return Err(Error::Config(
                "copy_chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Host description with overrides applied.
    ///
    /// Read afresh on every call.
    pub fn host(&self) -> HostInfo {
        let current = HostInfo::current();
        HostInfo::new(
            self.os_name.as_deref().unwrap_or(current.os_name()),
            self.arch.as_deref().unwrap_or(current.arch()),
        )
    }

    /// Build from the process environment.
    ///
    /// Only the `VIRGIL_CRYPTO_*` variables are read; the rest of the
    /// environment may hold anything. The resource directory may be any
    /// OS path.
    ///
    /// # Errors
    /// - A text-valued variable that is not valid Unicode
    /// - Any error from [`from_vars`](Self::from_vars)
    pub fn from_env() -> Result<Self> {
        let mut vars = Vec::with_capacity(ENV_TEXT_KEYS.len());
        for key in ENV_TEXT_KEYS {
            match env::var(key) {
                Ok(value) => vars.push((key, value)),
                Err(VarError::NotPresent) => {}
                Err(VarError::NotUnicode(_)) => {
                    return Err(Error::Config(format!("{} is not valid Unicode", key)));
                }
            }
        }
        let mut config = Self::from_vars(vars)?;
        config.resource_dir = env::var_os(ENV_RESOURCE_DIR).map(PathBuf::from);
        Ok(config)
    }

    /// Build from `(name, value)` pairs. Unrelated names are ignored.
    ///
    /// # Errors
    /// - Invalid library name, chunk size or cleanup policy
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let value: String = value.into();
            match key.as_ref() {
                ENV_LIBRARY => {
                    config.library_name = LibraryName::new(value)
                        .map_err(|e| Error::Config(format!("{}: {}", ENV_LIBRARY, e)))?;
                }
                ENV_RESOURCE_DIR => config.resource_dir = Some(PathBuf::from(value)),
                ENV_COPY_CHUNK => {
                    config.copy_chunk_size = value.trim().parse().map_err(|_| {
                        Error::Config(format!("{}: '{}' is not a size", ENV_COPY_CHUNK, value))
                    })?;
                }
                ENV_TEMP_CLEANUP => config.temp_cleanup = value.parse()?,
                ENV_OS_NAME => config.os_name = Some(value),
                ENV_ARCH => config.arch = Some(value),
                _ => {}
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Deserialize configuration from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.library_name.as_str(), "virgil_crypto_java");
        assert_eq!(config.copy_chunk_size, 1024);
        assert_eq!(config.temp_cleanup, TempCleanup::DeleteAfterLoad);
        assert!(!config.skip_search_path);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_vars() {
        let config = LoaderConfig::from_vars(vec![
            (ENV_LIBRARY, "custom_lib"),
            (ENV_RESOURCE_DIR, "/opt/native"),
            (ENV_COPY_CHUNK, "4096"),
            (ENV_TEMP_CLEANUP, "keep"),
            (ENV_OS_NAME, "Windows 10"),
            (ENV_ARCH, "AMD64"),
            ("PATH", "/usr/bin"),
        ])
        .unwrap();

        assert_eq!(config.library_name.as_str(), "custom_lib");
        assert_eq!(config.resource_dir, Some(PathBuf::from("/opt/native")));
        assert_eq!(config.copy_chunk_size, 4096);
        assert_eq!(config.temp_cleanup, TempCleanup::Keep);

        let host = config.host();
        assert_eq!(host.os_name(), "windows 10");
        assert_eq!(host.arch(), "amd64");
    }

    #[test]
    fn test_from_vars_rejects_bad_values() {
        assert!(matches!(
            LoaderConfig::from_vars(vec![(ENV_COPY_CHUNK, "lots")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            LoaderConfig::from_vars(vec![(ENV_COPY_CHUNK, "0")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            LoaderConfig::from_vars(vec![(ENV_TEMP_CLEANUP, "shred")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            LoaderConfig::from_vars(vec![(ENV_LIBRARY, "a/b")]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_json_partial() {
        let config =
            LoaderConfig::from_json(r#"{"library_name": "other", "temp_cleanup": "keep"}"#).unwrap();
        assert_eq!(config.library_name.as_str(), "other");
        assert_eq!(config.temp_cleanup, TempCleanup::Keep);
        assert_eq!(config.copy_chunk_size, DEFAULT_COPY_CHUNK_SIZE);
    }

    #[test]
    fn test_json_serialization() {
        let config = LoaderConfig {
            resource_dir: Some(PathBuf::from("/opt/native")),
            arch: Some("x86".to_string()),
            ..LoaderConfig::default()
        };
        let json = config.to_json().unwrap();
        assert!(json.contains("\"delete_after_load\""));
        assert_eq!(LoaderConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_json_invalid() {
        assert!(LoaderConfig::from_json("{\"copy_chunk_size\": 0}").is_err());
        assert!(LoaderConfig::from_json("{\"library_name\": \"\"}").is_err());
        assert!(LoaderConfig::from_json("not json").is_err());
    }
}
