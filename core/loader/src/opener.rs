//! Dynamic library opening.

use std::path::Path;

use libloading::{Library, Symbol};

use virgilcrypto_common::{Error, LibraryName, Result};

/// A native library mapped into the process.
pub struct LibraryHandle {
    location: String,
    library: Option<Library>,
}

impl LibraryHandle {
    /// Wrap a library loaded from `location`.
    pub fn from_library(library: Library, location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            library: Some(library),
        }
    }

    /// A handle with no OS library behind it.
    ///
    /// Used by openers for statically linked builds, where the native symbols
    /// are already part of the executable.
    pub fn unbacked(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            library: None,
        }
    }

    /// File name or path the library was opened from.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Whether an OS library backs this handle.
    pub fn is_backed(&self) -> bool {
        self.library.is_some()
    }

    /// Look up a symbol.
    ///
    /// # Safety
    /// `T` must match the symbol's real type.
    pub unsafe fn symbol<T>(&self, name: &str) -> Result<Symbol<'_, T>> {
        let library = self
            .library
            .as_ref()
            .ok_or_else(|| Error::NotLoaded(format!("'{}' has no library handle", self.location)))?;
        library
            .get::<T>(name.as_bytes())
            .map_err(|_| Error::SymbolNotFound(name.to_string()))
    }

    /// Check if a symbol exists.
    pub fn has_symbol(&self, name: &str) -> bool {
        match &self.library {
            Some(lib) => unsafe { lib.get::<*const ()>(name.as_bytes()).is_ok() },
            None => false,
        }
    }
}

impl std::fmt::Debug for LibraryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryHandle")
            .field("location", &self.location)
            .field("backed", &self.is_backed())
            .finish()
    }
}

/// Strategy used to map a native library into the process.
pub trait LibraryOpener: Send + Sync {
    /// Open by logical name through the host's library search path.
    ///
    /// # Errors
    /// - `Error::DirectLoad` if the library cannot be found or mapped
    fn open_by_name(&self, name: &LibraryName) -> Result<LibraryHandle>;

    /// Open the library file at an absolute path.
    ///
    /// # Errors
    /// - `Error::Load` if the file cannot be mapped
    fn open_path(&self, path: &Path) -> Result<LibraryHandle>;
}

/// Opener backed by the OS dynamic loader.
///
/// Logical names use the platform naming convention: `lib<name>.so`,
/// `lib<name>.dylib` or `<name>.dll`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicOpener;

impl DynamicOpener {
    /// File name the OS loader searches for.
    pub fn platform_file_name(name: &LibraryName) -> String {
        libloading::library_filename(name.as_str())
            .to_string_lossy()
            .into_owned()
    }
}

impl LibraryOpener for DynamicOpener {
    fn open_by_name(&self, name: &LibraryName) -> Result<LibraryHandle> {
        let file_name = Self::platform_file_name(name);
        let library = unsafe { Library::new(&file_name) }.map_err(|e| Error::DirectLoad {
            name: file_name.clone(),
            reason: e.to_string(),
        })?;
        Ok(LibraryHandle::from_library(library, file_name))
    }

    fn open_path(&self, path: &Path) -> Result<LibraryHandle> {
        let library = unsafe { Library::new(path) }.map_err(|e| Error::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(LibraryHandle::from_library(library, path.display().to_string()))
    }
}
