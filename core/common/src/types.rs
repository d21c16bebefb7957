//! Common types used throughout the native integration layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical name of the bundled native library.
pub const DEFAULT_LIBRARY_NAME: &str = "virgil_crypto_java";

/// Separator used in bundled resource paths on every platform.
pub const RESOURCE_SEPARATOR: char = '/';

/// Logical name of a native library, without platform prefix or suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LibraryName(String);

impl LibraryName {
    /// Create a new LibraryName from a string.
    ///
    /// # Preconditions
    /// - `name` must be non-empty
    /// - `name` must not contain path separators or NUL bytes
    ///
    /// # Errors
    /// - Returns error if the name is empty or contains forbidden characters
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Library name cannot be empty".to_string(),
            ));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(crate::Error::InvalidInput(
                "Library name cannot contain separators".to_string(),
            ));
        }
        if name.contains('\0') {
            return Err(crate::Error::InvalidInput(
                "Library name cannot contain NUL bytes".to_string(),
            ));
        }
        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LibraryName {
    fn default() -> Self {
        Self(DEFAULT_LIBRARY_NAME.to_string())
    }
}

impl TryFrom<String> for LibraryName {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::new(value)
    }
}

impl From<LibraryName> for String {
    fn from(name: LibraryName) -> Self {
        name.0
    }
}

impl fmt::Display for LibraryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Relative path of a bundled resource: `<directory>/<file>`.
///
/// The directory may itself hold several components (`windows/amd64`) or be
/// empty when the platform is not recognised. An empty directory still
/// composes to `/<file>` so that lookups fail loudly with the exact path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    directory: String,
    file: String,
}

impl ResourcePath {
    /// Compose a resource path from a directory and a library name.
    pub fn new(directory: impl Into<String>, library: &LibraryName) -> Self {
        Self {
            directory: directory.into(),
            file: library.as_str().to_string(),
        }
    }

    /// Parse a full `<directory>/<file>` string.
    ///
    /// A string without a separator is treated as a bare file name.
    pub fn parse(path: &str) -> crate::Result<Self> {
        let (directory, file) = match path.rfind(RESOURCE_SEPARATOR) {
            Some(idx) => (&path[..idx], &path[idx + 1..]),
            None => ("", path),
        };
        if file.is_empty() {
            return Err(crate::Error::InvalidInput(format!(
                "Resource path '{}' has no file component",
                path
            )));
        }
        Ok(Self {
            directory: directory.to_string(),
            file: file.to_string(),
        })
    }

    /// Directory part, possibly empty.
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// File name part.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Path components in order, including empty ones.
    pub fn components(&self) -> Vec<&str> {
        let mut components: Vec<&str> = self.directory.split(RESOURCE_SEPARATOR).collect();
        components.push(&self.file);
        components
    }

    /// Whether every component names a real entry.
    ///
    /// Empty, `.` and `..` components are never resolvable.
    pub fn is_resolvable(&self) -> bool {
        self.components()
            .iter()
            .all(|c| !c.is_empty() && *c != "." && *c != ".." && !c.contains('\\'))
    }

    /// Convert to the string form used for lookups and diagnostics.
    pub fn to_string_path(&self) -> String {
        format!("{}{}{}", self.directory, RESOURCE_SEPARATOR, self.file)
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_path())
    }
}
