//! FFI error handling
//!
//! Thread-local error storage for FFI functions.

use std::cell::RefCell;
use std::fmt;

/// FFI-specific errors
#[derive(Debug, Clone)]
pub enum FFIError {
    /// Null pointer passed to FFI function
    NullPointer(String),
    /// Invalid UTF-8 in string parameter
    InvalidUtf8(String),
    /// Native library could not be loaded
    LoadError(String),
    /// Data source or sink operation failed
    StreamError(String),
    /// IO error
    IOError(String),
    /// Invalid argument value
    InvalidArgument(String),
}

impl fmt::Display for FFIError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FFIError::NullPointer(msg) => write!(f, "Null pointer: {}", msg),
            FFIError::InvalidUtf8(param) => write!(f, "Invalid UTF-8 in parameter: {}", param),
            FFIError::LoadError(msg) => write!(f, "Load error: {}", msg),
            FFIError::StreamError(msg) => write!(f, "Stream error: {}", msg),
            FFIError::IOError(msg) => write!(f, "IO error: {}", msg),
            FFIError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for FFIError {}

impl From<virgilcrypto_common::Error> for FFIError {
    fn from(e: virgilcrypto_common::Error) -> Self {
        use virgilcrypto_common::Error;
        match e {
            Error::Io(io) => FFIError::IOError(io.to_string()),
            Error::InvalidInput(msg) => FFIError::InvalidArgument(msg),
            Error::Closed(_) => FFIError::StreamError(e.to_string()),
            other => FFIError::LoadError(other.to_string()),
        }
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<FFIError>> = const { RefCell::new(None) };
}

/// Set the last error for the current thread.
pub fn set_last_error(error: FFIError) {
    tracing::error!("FFI error: {}", error);
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some(error);
    });
}

/// Take the last error from the current thread.
pub fn take_last_error() -> Option<FFIError> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

/// Clear the last error for the current thread.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}
