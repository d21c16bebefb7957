//! Bundled resource providers.
//!
//! A provider resolves a [`ResourcePath`] to a readable stream holding a
//! platform-specific native binary. Providers never resolve paths with empty,
//! `.` or `..` components; such lookups report "not found".

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use virgilcrypto_common::{Error, ResourcePath, Result};

/// Readable stream over a bundled resource.
pub type ResourceStream = Box<dyn Read + Send>;

/// Source of bundled native binaries.
pub trait ResourceProvider: Send + Sync {
    /// Provider name used in diagnostics (e.g., "directory", "embedded").
    fn name(&self) -> &str;

    /// Open a resource for reading.
    ///
    /// # Returns
    /// - `Ok(Some(stream))` if the resource exists
    /// - `Ok(None)` if it does not
    ///
    /// # Errors
    /// - I/O errors other than absence
    fn open(&self, path: &ResourcePath) -> Result<Option<ResourceStream>>;

    /// Check whether a resource exists.
    fn exists(&self, path: &ResourcePath) -> Result<bool> {
        Ok(self.open(path)?.is_some())
    }
}

impl<P: ResourceProvider + ?Sized> ResourceProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn open(&self, path: &ResourcePath) -> Result<Option<ResourceStream>> {
        (**self).open(path)
    }
}

/// Resources laid out under a filesystem directory.
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    /// Create a provider rooted at `root`. The directory need not exist yet.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn to_fs_path(&self, path: &ResourcePath) -> PathBuf {
        let mut fs_path = self.root.clone();
        for component in path.components() {
            fs_path.push(component);
        }
        fs_path
    }
}

impl ResourceProvider for DirectoryResources {
    fn name(&self) -> &str {
        "directory"
    }

    fn open(&self, path: &ResourcePath) -> Result<Option<ResourceStream>> {
        if !path.is_resolvable() {
            return Ok(None);
        }

        let fs_path = self.to_fs_path(path);
        if !fs_path.is_file() {
            return Ok(None);
        }

        match File::open(&fs_path) {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// Resources compiled into the binary or held in memory.
///
/// ```ignore
/// let resources = EmbeddedResources::new()
///     .with("linux/virgil_crypto_java", &include_bytes!("../native/linux/virgil_crypto_java")[..]);
/// ```
#[derive(Default)]
pub struct EmbeddedResources {
    entries: HashMap<String, Cow<'static, [u8]>>,
}

impl EmbeddedResources {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource at `path` and return self.
    pub fn with(mut self, path: &str, data: impl Into<Cow<'static, [u8]>>) -> Self {
        self.insert(path, data);
        self
    }

    /// Add or replace a resource at `path`.
    pub fn insert(&mut self, path: &str, data: impl Into<Cow<'static, [u8]>>) {
        self.entries.insert(path.to_string(), data.into());
    }

    /// Registered resource paths.
    pub fn paths(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no resources are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceProvider for EmbeddedResources {
    fn name(&self) -> &str {
        "embedded"
    }

    fn open(&self, path: &ResourcePath) -> Result<Option<ResourceStream>> {
        if !path.is_resolvable() {
            return Ok(None);
        }
        Ok(self
            .entries
            .get(&path.to_string_path())
            .map(|data| Box::new(Cursor::new(data.clone())) as ResourceStream))
    }
}

/// Providers consulted in order; the first hit wins.
#[derive(Default)]
pub struct ResourceChain {
    providers: Vec<Box<dyn ResourceProvider>>,
}

impl ResourceChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider and return self.
    pub fn with(mut self, provider: impl ResourceProvider + 'static) -> Self {
        self.push(provider);
        self
    }

    /// Append a provider.
    pub fn push(&mut self, provider: impl ResourceProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    /// Names of the chained providers, in lookup order.
    pub fn providers(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }
}

impl ResourceProvider for ResourceChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn open(&self, path: &ResourcePath) -> Result<Option<ResourceStream>> {
        for provider in &self.providers {
            if let Some(stream) = provider.open(path)? {
                tracing::debug!("Resource {} served by {} provider", path, provider.name());
                return Ok(Some(stream));
            }
        }
        Ok(None)
    }
}

/// Resources from a folder embedded with `rust_embed::RustEmbed`.
///
/// ```ignore
/// #[derive(rust_embed::RustEmbed)]
/// #[folder = "native/"]
/// struct Natives;
///
/// virgilcrypto_loader::initialize_with_resources(RustEmbedResources::<Natives>::new());
/// ```
pub struct RustEmbedResources<E> {
    _marker: std::marker::PhantomData<fn() -> E>,
}

impl<E: rust_embed::RustEmbed> RustEmbedResources<E> {
    /// Create a provider over the embedded folder `E`.
    pub fn new() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<E: rust_embed::RustEmbed> Default for RustEmbedResources<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: rust_embed::RustEmbed> ResourceProvider for RustEmbedResources<E> {
    fn name(&self) -> &str {
        "rust-embed"
    }

    fn open(&self, path: &ResourcePath) -> Result<Option<ResourceStream>> {
        if !path.is_resolvable() {
            return Ok(None);
        }
        Ok(E::get(&path.to_string_path())
            .map(|file| Box::new(Cursor::new(file.data)) as ResourceStream))
    }
}
