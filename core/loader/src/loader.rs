//! Native library resolution and loading.
//!
//! Loading first goes through the host search path. On failure the binary
//! for the classified platform is taken from bundled resources, extracted to
//! a temporary file and loaded from there. The result is always a typed
//! [`LoadOutcome`]; nothing is swallowed and nothing panics.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use virgilcrypto_common::{Error, LibraryName, ResourcePath, Result};

use crate::config::{LoaderConfig, TempCleanup};
use crate::extract::{extract_to_temp, ExtractOptions, ExtractedLibrary};
use crate::opener::{DynamicOpener, LibraryHandle, LibraryOpener};
use crate::platform::OsFamily;
use crate::resource::{DirectoryResources, EmbeddedResources, ResourceChain, ResourceProvider};

/// Where a loaded library came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOrigin {
    /// Found through the host search path.
    SearchPath,
    /// Extracted from bundled resources.
    Extracted {
        resource_path: ResourcePath,
        temp_path: PathBuf,
    },
}

/// A native library mapped into the process.
#[derive(Debug)]
pub struct LoadedLibrary {
    name: LibraryName,
    origin: LoadOrigin,
    // Dropped before `extracted` so the file is unmapped before removal.
    handle: LibraryHandle,
    extracted: Option<ExtractedLibrary>,
}

impl LoadedLibrary {
    /// Logical library name.
    pub fn name(&self) -> &LibraryName {
        &self.name
    }

    /// Where the library came from.
    pub fn origin(&self) -> &LoadOrigin {
        &self.origin
    }

    /// Handle for symbol lookup.
    pub fn handle(&self) -> &LibraryHandle {
        &self.handle
    }
}

/// Why a load attempt failed.
#[derive(Debug)]
pub struct LoadFailure {
    name: LibraryName,
    direct_error: Option<Error>,
    reason: Error,
}

impl LoadFailure {
    /// Create a failure record.
    pub fn new(name: LibraryName, direct_error: Option<Error>, reason: Error) -> Self {
        Self {
            name,
            direct_error,
            reason,
        }
    }

    /// Logical library name.
    pub fn name(&self) -> &LibraryName {
        &self.name
    }

    /// Error from the search-path attempt, if one was made.
    pub fn direct_error(&self) -> Option<&Error> {
        self.direct_error.as_ref()
    }

    /// Error that ended the attempt.
    pub fn reason(&self) -> &Error {
        &self.reason
    }

    /// Consume into the terminal error.
    pub fn into_reason(self) -> Error {
        self.reason
    }
}

impl std::fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Native library '{}' failed to load: {}", self.name, self.reason)
    }
}

/// Result of a load attempt.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(LoadedLibrary),
    Failed(LoadFailure),
}

impl LoadOutcome {
    /// Whether the library is available.
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }

    /// The loaded library, if any.
    pub fn library(&self) -> Option<&LoadedLibrary> {
        match self {
            LoadOutcome::Loaded(library) => Some(library),
            LoadOutcome::Failed(_) => None,
        }
    }

    /// The failure, if any.
    pub fn failure(&self) -> Option<&LoadFailure> {
        match self {
            LoadOutcome::Loaded(_) => None,
            LoadOutcome::Failed(failure) => Some(failure),
        }
    }

    /// Convert into a `Result` for fail-fast callers.
    pub fn into_result(self) -> Result<LoadedLibrary> {
        match self {
            LoadOutcome::Loaded(library) => Ok(library),
            LoadOutcome::Failed(failure) => Err(failure.into_reason()),
        }
    }
}

/// Expected bundled resource layout, for diagnostics.
pub fn layout_guidance(name: &LibraryName) -> String {
    format!(
        "Add the OS specific library to the system library search path, \
         or put the libraries into a resource directory with this structure:\n\
         <resources>\n\
         |\n\
         +---linux\n\
         |\t+---{name}\n\
         +---mac os\n\
         |\t+---{name}\n\
         +---windows\n\
         \t+---amd64\n\
         \t|\t+---{name}\n\
         \t+---x86\n\
         \t\t+---{name}",
        name = name
    )
}

/// Resolves and loads the native library.
pub struct NativeLoader {
    config: LoaderConfig,
    resources: Box<dyn ResourceProvider>,
    opener: Box<dyn LibraryOpener>,
}

impl NativeLoader {
    /// Create a loader using the OS dynamic loader.
    ///
    /// Resources come from `config.resource_dir` when set; otherwise the
    /// resource set is empty until [`with_resources`](Self::with_resources)
    /// supplies one.
    pub fn new(config: LoaderConfig) -> Self {
        let resources: Box<dyn ResourceProvider> = match &config.resource_dir {
            Some(dir) => Box::new(DirectoryResources::new(dir)),
            None => Box::new(EmbeddedResources::new()),
        };
        Self {
            config,
            resources,
            opener: Box::new(DynamicOpener),
        }
    }

    /// Create a loader configured from the process environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(LoaderConfig::from_env()?))
    }

    /// Replace the resource provider.
    pub fn with_resources(mut self, resources: impl ResourceProvider + 'static) -> Self {
        self.resources = Box::new(resources);
        self
    }

    /// Consult `resources` after the current provider.
    pub fn with_fallback_resources(mut self, resources: impl ResourceProvider + 'static) -> Self {
        let current = std::mem::replace(&mut self.resources, Box::new(EmbeddedResources::new()));
        self.resources = Box::new(ResourceChain::new().with(current).with(resources));
        self
    }

    /// Replace the library opener.
    pub fn with_opener(mut self, opener: impl LibraryOpener + 'static) -> Self {
        self.opener = Box::new(opener);
        self
    }

    /// Loader configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Resource path the fallback would use on this host right now.
    pub fn resource_path(&self) -> ResourcePath {
        self.config.host().resource_path(&self.config.library_name)
    }

    /// Load the library, falling back to bundled resources.
    ///
    /// Failures are logged together with the expected resource layout and
    /// returned as [`LoadOutcome::Failed`].
    pub fn ensure_loaded(&self) -> LoadOutcome {
        let name = self.config.library_name.clone();

        if let Err(e) = self.config.validate() {
            error!("{}", e);
            return LoadOutcome::Failed(LoadFailure::new(name, None, e));
        }

        let direct_error = if self.config.skip_search_path {
            debug!("Search path lookup disabled for {}", name);
            None
        } else {
            match self.opener.open_by_name(&name) {
                Ok(handle) => {
                    info!("Native library {} loaded from {}", name, handle.location());
                    return LoadOutcome::Loaded(LoadedLibrary {
                        name,
                        origin: LoadOrigin::SearchPath,
                        handle,
                        extracted: None,
                    });
                }
                Err(e) => {
                    warn!(
                        "Native library can't be loaded from the library search path: {}",
                        e
                    );
                    Some(e)
                }
            }
        };

        info!("Trying to load native library {} from resources", name);
        match self.load_from_resources(&name) {
            Ok(library) => LoadOutcome::Loaded(library),
            Err(reason) => {
                error!("Native library failed to load.\n{}", layout_guidance(&name));
                error!("{}", reason);
                LoadOutcome::Failed(LoadFailure::new(name, direct_error, reason))
            }
        }
    }

    fn load_from_resources(&self, name: &LibraryName) -> Result<LoadedLibrary> {
        let host = self.config.host();
        let family = host.family();
        if family == OsFamily::Unknown {
            warn!(
                "{}",
                Error::UnsupportedPlatform(format!("{} ({})", host.os_name(), host.arch()))
            );
        }

        let resource_path = host.resource_path(name);
        debug!(
            "Resolved resource {} via {} provider",
            resource_path,
            self.resources.name()
        );

        let stream = self.resources.open(&resource_path)?.ok_or_else(|| {
            warn!("Can't load native library from resources");
            Error::ResourceNotFound(resource_path.to_string_path())
        })?;

        let mut options = ExtractOptions::new(name.as_str(), family.library_suffix())
            .with_chunk_size(self.config.copy_chunk_size);
        if let Some(dir) = self.config.extract_dir.as_deref() {
            options = options.in_dir(dir);
        }
        let extracted = extract_to_temp(stream, &options)?;

        // On error `extracted` is dropped here, removing the file.
        let handle = self.opener.open_path(extracted.path())?;
        let temp_path = extracted.path().to_path_buf();
        info!("Native library {} loaded from {}", name, temp_path.display());

        let extracted = self.apply_cleanup(extracted, &temp_path);

        Ok(LoadedLibrary {
            name: name.clone(),
            origin: LoadOrigin::Extracted {
                resource_path,
                temp_path,
            },
            handle,
            extracted,
        })
    }

    // The library is already mapped here, so nothing below may fail the load.
    fn apply_cleanup(&self, extracted: ExtractedLibrary, temp_path: &Path) -> Option<ExtractedLibrary> {
        match self.config.temp_cleanup {
            TempCleanup::Keep => {
                keep_extracted(extracted.keep(), temp_path);
                None
            }
            TempCleanup::DeleteAfterLoad => {
                if let Err(e) = extracted.try_remove() {
                    debug!(
                        "Deferring removal of {} until unload: {}",
                        temp_path.display(),
                        e
                    );
                }
                Some(extracted)
            }
        }
    }
}

/// Report the result of persisting an extracted file. Returns whether the
/// file was kept.
fn keep_extracted(kept: Result<PathBuf>, temp_path: &Path) -> bool {
    match kept {
        Ok(path) => {
            debug!("Keeping extracted library at {}", path.display());
            true
        }
        Err(e) => {
            warn!(
                "Extracted library {} could not be kept, the loaded library stays usable: {}",
                temp_path.display(),
                e
            );
            false
        }
    }
}
