//! Native library resolution and loading for Virgil Crypto.
//!
//! The library is first looked up through the host search path. If that
//! fails, the platform is classified from the OS name and architecture, the
//! matching binary is taken from a bundled resource layout
//!
//! ```text
//! linux/<library>
//! mac os/<library>
//! windows/<arch>/<library>
//! ```
//!
//! extracted to a temporary file and loaded from there. Every attempt yields
//! a typed [`LoadOutcome`].

pub mod config;
pub mod extract;
pub mod global;
pub mod loader;
pub mod opener;
pub mod platform;
pub mod resource;

pub use config::{LoaderConfig, TempCleanup};
pub use extract::{extract_to_temp, ExtractOptions, ExtractedLibrary, DEFAULT_COPY_CHUNK_SIZE};
pub use global::{
    initialize, initialize_with, initialize_with_resources, is_loaded, outcome, require_loaded,
};
pub use loader::{layout_guidance, LoadFailure, LoadOrigin, LoadOutcome, LoadedLibrary, NativeLoader};
pub use opener::{DynamicOpener, LibraryHandle, LibraryOpener};
pub use platform::{HostInfo, OsFamily};
pub use resource::{
    DirectoryResources, EmbeddedResources, ResourceChain, ResourceProvider, ResourceStream,
    RustEmbedResources,
};
