//! FFI-safe types
//!
//! Function tables that let native code drive Rust data sources and sinks.
//! Every callback takes the table's `context` as its first argument.

use std::ffi::{c_int, c_void};

/// Returns 1 if data is available, 0 if not, -1 on error.
pub type FFIHasDataFn = unsafe extern "C" fn(context: *mut c_void) -> c_int;

/// Copies up to `capacity` bytes into `buffer` and stores the count in
/// `written`. Returns 0 on success, -1 on error. A count of 0 means nothing
/// is available right now.
pub type FFIReadFn = unsafe extern "C" fn(
    context: *mut c_void,
    buffer: *mut u8,
    capacity: usize,
    written: *mut usize,
) -> c_int;

/// Returns 1 if the sink accepts data, 0 otherwise.
pub type FFIIsGoodFn = unsafe extern "C" fn(context: *mut c_void) -> c_int;

/// Writes all `len` bytes from `data`. Returns 0 on success, -1 on error.
pub type FFIWriteFn = unsafe extern "C" fn(context: *mut c_void, data: *const u8, len: usize) -> c_int;

/// Closes the wrapped stream and releases `context`. Must be called exactly
/// once; the table is unusable afterwards.
pub type FFIDisposeFn = unsafe extern "C" fn(context: *mut c_void);

/// Data source function table
#[repr(C)]
pub struct FFIDataSource {
    /// Opaque bridge state (do not touch from C)
    pub context: *mut c_void,
    pub has_data: FFIHasDataFn,
    pub read: FFIReadFn,
    pub dispose: FFIDisposeFn,
}

/// Data sink function table
#[repr(C)]
pub struct FFIDataSink {
    /// Opaque bridge state (do not touch from C)
    pub context: *mut c_void,
    pub is_good: FFIIsGoodFn,
    pub write: FFIWriteFn,
    pub dispose: FFIDisposeFn,
}
