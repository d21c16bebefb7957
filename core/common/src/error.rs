//! Common error types for the native integration layer.

use thiserror::Error;

/// Top-level error type for loader, stream and bridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Loading by logical name through the host search path failed.
    ///
    /// Never fatal on its own: the loader falls back to bundled resources.
    #[error("Direct load of '{name}' failed: {reason}")]
    DirectLoad { name: String, reason: String },

    /// No bundled resource exists at the composed path.
    #[error("Resource '{0}' not found")]
    ResourceNotFound(String),

    /// The host platform has no bundled resource directory.
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// An extracted library file could not be loaded.
    #[error("Failed to load library from '{path}': {reason}")]
    Load { path: String, reason: String },

    /// A symbol lookup in a loaded library failed.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The native library has not been loaded.
    #[error("Native library not loaded: {0}")]
    NotLoaded(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation attempted on a closed adapter.
    #[error("{0} is closed")]
    Closed(&'static str),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be read or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the loader may continue with its fallback strategy.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::DirectLoad { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_not_found_names_path() {
        let err = Error::ResourceNotFound("mac os/virgil_crypto_java".to_string());
        assert_eq!(
            err.to_string(),
            "Resource 'mac os/virgil_crypto_java' not found"
        );
    }

    #[test]
    fn test_only_direct_load_is_recoverable() {
        let direct = Error::DirectLoad {
            name: "x".to_string(),
            reason: "missing".to_string(),
        };
        assert!(direct.is_recoverable());
        assert!(!Error::ResourceNotFound("x".to_string()).is_recoverable());
        assert!(!Error::Closed("data source").is_recoverable());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
