//! C ABI for the Virgil Crypto native loader and stream adapters.
//!
//! Native callers load the library once through [`virgil_native_initialize`]
//! and exchange data through the function tables in [`types`].

#![allow(clippy::missing_safety_doc)]

pub mod bridge;
pub mod error;
pub mod types;

use std::ffi::{c_char, c_int, CStr, CString};
use std::fs::File;
use std::io::BufReader;
use std::ptr;

use virgilcrypto_stream::{StreamDataSink, StreamDataSource, DEFAULT_CHUNK_SIZE};

pub use crate::bridge::{ForeignDataSink, ForeignDataSource};
use crate::error::FFIError;
pub use crate::types::{FFIDataSink, FFIDataSource};

/// Load the native library. Safe to call more than once; only the first
/// call performs the attempt.
///
/// Returns 0 if the library is loaded, -1 otherwise. The failure reason is
/// retrievable via `virgil_last_error`.
#[no_mangle]
pub extern "C" fn virgil_native_initialize() -> c_int {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    match virgilcrypto_loader::initialize() {
        virgilcrypto_loader::LoadOutcome::Loaded(library) => {
            tracing::info!("Virgil native library ready: {}", library.name());
            0
        }
        virgilcrypto_loader::LoadOutcome::Failed(failure) => {
            error::set_last_error(FFIError::LoadError(failure.to_string()));
            -1
        }
    }
}

/// Returns 1 if the native library is loaded, 0 otherwise.
#[no_mangle]
pub extern "C" fn virgil_native_is_loaded() -> c_int {
    c_int::from(virgilcrypto_loader::is_loaded())
}

/// Get the version of this library.
///
/// # Safety
/// Returns a pointer to a static string. Do not free.
#[no_mangle]
pub extern "C" fn virgil_native_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr() as *const c_char
}

/// Get the last error message.
///
/// # Safety
/// - Returned string must be freed with `virgil_string_free`
/// - Returns null if no error occurred
#[no_mangle]
pub extern "C" fn virgil_last_error() -> *mut c_char {
    error::take_last_error()
        .map(|e| {
            CString::new(e.to_string())
                .map(|s| s.into_raw())
                .unwrap_or(ptr::null_mut())
        })
        .unwrap_or(ptr::null_mut())
}

/// Free a string returned by an FFI function.
///
/// # Safety
/// - `s` must be a pointer returned by a virgil FFI function
/// - After this call, the pointer is invalid
#[no_mangle]
pub unsafe extern "C" fn virgil_string_free(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

unsafe fn path_arg<'a>(path: *const c_char) -> Result<&'a str, FFIError> {
    if path.is_null() {
        return Err(FFIError::NullPointer("path is null".into()));
    }
    CStr::from_ptr(path)
        .to_str()
        .map_err(|_| FFIError::InvalidUtf8("path".into()))
}

/// Open a file, pipe or FIFO as a data source.
///
/// A `chunk_size` of 0 selects the default of 1 MiB.
///
/// # Safety
/// - `path` must be a valid null-terminated UTF-8 string
/// - `out` must point to writable memory for one `FFIDataSource`
/// - On success the table must be released with its `dispose` callback
#[no_mangle]
pub unsafe extern "C" fn virgil_data_source_open_file(
    path: *const c_char,
    chunk_size: usize,
    out: *mut FFIDataSource,
) -> c_int {
    if out.is_null() {
        error::set_last_error(FFIError::NullPointer("out is null".into()));
        return -1;
    }
    let path = match path_arg(path) {
        Ok(p) => p,
        Err(e) => {
            error::set_last_error(e);
            return -1;
        }
    };

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            error::set_last_error(FFIError::IOError(format!("{}: {}", path, e)));
            return -1;
        }
    };

    let chunk_size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };
    // Buffered so pipes and FIFOs report availability too.
    let reader = BufReader::with_capacity(chunk_size, file);
    match StreamDataSource::with_chunk_size(reader, chunk_size) {
        Ok(source) => {
            out.write(FFIDataSource::new(source));
            0
        }
        Err(e) => {
            error::set_last_error(e.into());
            -1
        }
    }
}

/// Create (or truncate) a file and expose it as a data sink.
///
/// # Safety
/// - `path` must be a valid null-terminated UTF-8 string
/// - `out` must point to writable memory for one `FFIDataSink`
/// - On success the table must be released with its `dispose` callback,
///   which also flushes the file
#[no_mangle]
pub unsafe extern "C" fn virgil_data_sink_create_file(
    path: *const c_char,
    out: *mut FFIDataSink,
) -> c_int {
    if out.is_null() {
        error::set_last_error(FFIError::NullPointer("out is null".into()));
        return -1;
    }
    let path = match path_arg(path) {
        Ok(p) => p,
        Err(e) => {
            error::set_last_error(e);
            return -1;
        }
    };

    match File::create(path) {
        Ok(file) => {
            out.write(FFIDataSink::new(StreamDataSink::new(file)));
            0
        }
        Err(e) => {
            error::set_last_error(FFIError::IOError(format!("{}: {}", path, e)));
            -1
        }
    }
}
