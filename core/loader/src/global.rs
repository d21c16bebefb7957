//! Process-wide load state.
//!
//! The native library is loaded at most once per process. The first call to
//! [`initialize`] or [`initialize_with`] performs the attempt; every later
//! call returns the stored outcome. The state is never torn down.

use once_cell::sync::OnceCell;

use virgilcrypto_common::{Error, LibraryName, Result};

use crate::loader::{LoadFailure, LoadOutcome, LoadedLibrary, NativeLoader};
use crate::resource::ResourceProvider;

static NATIVE: OnceCell<LoadOutcome> = OnceCell::new();

fn load_from_env(bundled: Option<Box<dyn ResourceProvider>>) -> LoadOutcome {
    match NativeLoader::from_env() {
        Ok(loader) => match bundled {
            Some(resources) => loader.with_fallback_resources(resources).ensure_loaded(),
            None => loader.ensure_loaded(),
        },
        Err(e) => {
            tracing::error!("Invalid native loader configuration: {}", e);
            LoadOutcome::Failed(LoadFailure::new(LibraryName::default(), None, e))
        }
    }
}

/// Load the native library configured from the environment.
///
/// Only `VIRGIL_CRYPTO_RESOURCE_DIR` supplies resources here; use
/// [`initialize_with_resources`] to ship binaries inside the executable.
pub fn initialize() -> &'static LoadOutcome {
    NATIVE.get_or_init(|| load_from_env(None))
}

/// Load the native library configured from the environment, falling back to
/// `resources` after any `VIRGIL_CRYPTO_RESOURCE_DIR` tree.
pub fn initialize_with_resources(resources: impl ResourceProvider + 'static) -> &'static LoadOutcome {
    NATIVE.get_or_init(|| load_from_env(Some(Box::new(resources))))
}

/// Load the native library with a custom loader.
///
/// `make_loader` only runs if no attempt has been made yet.
pub fn initialize_with<F>(make_loader: F) -> &'static LoadOutcome
where
    F: FnOnce() -> NativeLoader,
{
    NATIVE.get_or_init(|| make_loader().ensure_loaded())
}

/// Stored outcome, if an attempt has been made.
pub fn outcome() -> Option<&'static LoadOutcome> {
    NATIVE.get()
}

/// Whether the native library is loaded.
pub fn is_loaded() -> bool {
    outcome().is_some_and(LoadOutcome::is_loaded)
}

/// The loaded library, for callers that cannot continue without it.
///
/// # Errors
/// - `Error::NotLoaded` if no attempt was made or the attempt failed
pub fn require_loaded() -> Result<&'static LoadedLibrary> {
    match outcome() {
        None => Err(Error::NotLoaded(
            "initialize() has not been called".to_string(),
        )),
        Some(LoadOutcome::Failed(failure)) => Err(Error::NotLoaded(failure.reason().to_string())),
        Some(LoadOutcome::Loaded(library)) => Ok(library),
    }
}
