//! Common utilities and types shared across the Virgil Crypto native layer.
//!
//! This module provides the error taxonomy and the validated name/path types
//! used by the loader, the stream adapters and the FFI bridge.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{LibraryName, ResourcePath, DEFAULT_LIBRARY_NAME};
