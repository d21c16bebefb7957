//! Extraction of a bundled binary into a temporary file.

use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::TempPath;

use virgilcrypto_common::{Error, Result};

/// Default copy chunk size (1 KiB).
pub const DEFAULT_COPY_CHUNK_SIZE: usize = 1024;

/// Options for [`extract_to_temp`].
#[derive(Debug, Clone)]
pub struct ExtractOptions<'a> {
    /// File name prefix, normally the library name.
    pub prefix: &'a str,
    /// File name suffix, e.g. ".so" or ".dll". May be empty.
    pub suffix: &'a str,
    /// Copy buffer size in bytes. Must be non-zero.
    pub chunk_size: usize,
    /// Directory to create the file in; the system temp dir if `None`.
    pub dir: Option<&'a Path>,
}

impl<'a> ExtractOptions<'a> {
    /// Options with the default chunk size in the system temp dir.
    pub fn new(prefix: &'a str, suffix: &'a str) -> Self {
        Self {
            prefix,
            suffix,
            chunk_size: DEFAULT_COPY_CHUNK_SIZE,
            dir: None,
        }
    }

    /// Set custom chunk size.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set the target directory.
    pub fn in_dir(mut self, dir: &'a Path) -> Self {
        self.dir = Some(dir);
        self
    }
}

/// A native binary written to a temporary file.
///
/// The file is deleted when this value is dropped unless [`keep`] is called.
///
/// [`keep`]: ExtractedLibrary::keep
#[derive(Debug)]
pub struct ExtractedLibrary {
    path: TempPath,
    len: u64,
}

impl ExtractedLibrary {
    /// Absolute path of the extracted file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the resource was empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Try to remove the file now.
    ///
    /// A failure is not fatal: the file is removed again on drop. Windows
    /// refuses to delete a library that is still mapped.
    pub fn try_remove(&self) -> std::io::Result<()> {
        std::fs::remove_file(&self.path)
    }

    /// Disable deletion and return the file's path.
    pub fn keep(self) -> Result<PathBuf> {
        self.path.keep().map_err(|e| Error::Io(e.error))
    }
}

/// Copy `resource` into a new temporary file, `chunk_size` bytes at a time.
///
/// # Postconditions
/// - The file content is byte-identical to the resource
/// - Both the resource and the file handle are closed on return
/// - On error the partially written file is removed
///
/// # Errors
/// - Zero chunk size
/// - I/O errors while creating, reading or writing
pub fn extract_to_temp<R: Read>(mut resource: R, options: &ExtractOptions<'_>) -> Result<ExtractedLibrary> {
    if options.chunk_size == 0 {
        return Err(Error::InvalidInput(
            "Copy chunk size must be greater than zero".to_string(),
        ));
    }

    let mut builder = tempfile::Builder::new();
    builder.prefix(options.prefix).suffix(options.suffix);
    let mut file = match options.dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };

    let mut buffer = vec![0u8; options.chunk_size];
    let mut len = 0u64;
    loop {
        let read = match resource.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        file.write_all(&buffer[..read])?;
        len += read as u64;
    }
    file.flush()?;
    drop(resource);

    let path = file.into_temp_path();
    tracing::debug!("Extracted {} bytes to {}", len, path.display());

    Ok(ExtractedLibrary { path, len })
}
