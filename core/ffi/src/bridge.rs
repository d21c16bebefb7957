//! Bridges between Rust adapters and the native function tables.
//!
//! [`FFIDataSource::new`] and [`FFIDataSink::new`] export a Rust adapter to
//! native code. [`ForeignDataSource`] and [`ForeignDataSink`] go the other
//! way and drive a function table from Rust.

use std::ffi::{c_int, c_void};
use std::ptr;

use virgilcrypto_common::{Error, Result};
use virgilcrypto_stream::{DataSink, DataSource};

use crate::error::{self, FFIError};
use crate::types::{FFIDataSink, FFIDataSource};

struct SourceBridge {
    source: Box<dyn DataSource>,
    pending: Vec<u8>,
    offset: usize,
}

impl SourceBridge {
    fn has_pending(&self) -> bool {
        self.offset < self.pending.len()
    }
}

struct SinkBridge {
    sink: Box<dyn DataSink>,
}

impl FFIDataSource {
    /// Export `source` as a function table. Ownership moves to the table and
    /// is released by its `dispose` callback.
    pub fn new(source: impl DataSource + 'static) -> Self {
        let bridge = Box::new(SourceBridge {
            source: Box::new(source),
            pending: Vec::new(),
            offset: 0,
        });
        Self {
            context: Box::into_raw(bridge) as *mut c_void,
            has_data: source_has_data,
            read: source_read,
            dispose: source_dispose,
        }
    }
}

impl FFIDataSink {
    /// Export `sink` as a function table. Ownership moves to the table and is
    /// released by its `dispose` callback.
    pub fn new(sink: impl DataSink + 'static) -> Self {
        let bridge = Box::new(SinkBridge {
            sink: Box::new(sink),
        });
        Self {
            context: Box::into_raw(bridge) as *mut c_void,
            is_good: sink_is_good,
            write: sink_write,
            dispose: sink_dispose,
        }
    }
}

unsafe extern "C" fn source_has_data(context: *mut c_void) -> c_int {
    let Some(bridge) = (context as *mut SourceBridge).as_mut() else {
        error::set_last_error(FFIError::NullPointer("source context is null".into()));
        return -1;
    };
    if bridge.has_pending() {
        return 1;
    }
    match bridge.source.has_data() {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(e) => {
            error::set_last_error(e.into());
            -1
        }
    }
}

unsafe extern "C" fn source_read(
    context: *mut c_void,
    buffer: *mut u8,
    capacity: usize,
    written: *mut usize,
) -> c_int {
    let Some(bridge) = (context as *mut SourceBridge).as_mut() else {
        error::set_last_error(FFIError::NullPointer("source context is null".into()));
        return -1;
    };
    if written.is_null() || (buffer.is_null() && capacity > 0) {
        error::set_last_error(FFIError::NullPointer("buffer or written is null".into()));
        return -1;
    }

    if !bridge.has_pending() {
        match bridge.source.read() {
            Ok(chunk) => {
                bridge.pending = chunk;
                bridge.offset = 0;
            }
            Err(e) => {
                error::set_last_error(e.into());
                return -1;
            }
        }
    }

    let count = capacity.min(bridge.pending.len() - bridge.offset);
    if count > 0 {
        ptr::copy_nonoverlapping(bridge.pending.as_ptr().add(bridge.offset), buffer, count);
    }
    bridge.offset += count;
    *written = count;
    0
}

unsafe extern "C" fn source_dispose(context: *mut c_void) {
    if context.is_null() {
        return;
    }
    let mut bridge = Box::from_raw(context as *mut SourceBridge);
    if let Err(e) = bridge.source.close() {
        error::set_last_error(e.into());
    }
}

unsafe extern "C" fn sink_is_good(context: *mut c_void) -> c_int {
    match (context as *mut SinkBridge).as_mut() {
        Some(bridge) => c_int::from(bridge.sink.is_good()),
        None => 0,
    }
}

unsafe extern "C" fn sink_write(context: *mut c_void, data: *const u8, len: usize) -> c_int {
    let Some(bridge) = (context as *mut SinkBridge).as_mut() else {
        error::set_last_error(FFIError::NullPointer("sink context is null".into()));
        return -1;
    };
    let bytes: &[u8] = if len == 0 {
        &[]
    } else if data.is_null() {
        error::set_last_error(FFIError::NullPointer("data is null".into()));
        return -1;
    } else {
        std::slice::from_raw_parts(data, len)
    };
    match bridge.sink.write(bytes) {
        Ok(()) => 0,
        Err(e) => {
            error::set_last_error(e.into());
            -1
        }
    }
}

unsafe extern "C" fn sink_dispose(context: *mut c_void) {
    if context.is_null() {
        return;
    }
    let mut bridge = Box::from_raw(context as *mut SinkBridge);
    if let Err(e) = bridge.sink.close() {
        error::set_last_error(e.into());
    }
}

fn last_error_or(fallback: &str) -> Error {
    let message = error::take_last_error()
        .map(|e| e.to_string())
        .unwrap_or_else(|| fallback.to_string());
    Error::Io(std::io::Error::other(message))
}

/// Default buffer size used when pulling from a foreign source.
pub const FOREIGN_READ_BUFFER: usize = 64 * 1024;

/// A native data source function table driven from Rust.
pub struct ForeignDataSource {
    table: FFIDataSource,
    buffer: Vec<u8>,
    disposed: bool,
}

impl ForeignDataSource {
    /// Take ownership of a function table.
    ///
    /// # Safety
    /// The table's callbacks must honour the documented contract and
    /// `context` must be valid until `dispose` is called.
    pub unsafe fn new(table: FFIDataSource) -> Self {
        Self {
            table,
            buffer: vec![0u8; FOREIGN_READ_BUFFER],
            disposed: false,
        }
    }
}

impl DataSource for ForeignDataSource {
    fn has_data(&mut self) -> Result<bool> {
        if self.disposed {
            return Err(Error::Closed("foreign data source"));
        }
        match unsafe { (self.table.has_data)(self.table.context) } {
            1 => Ok(true),
            0 => Ok(false),
            _ => Err(last_error_or("foreign has_data failed")),
        }
    }

    fn read(&mut self) -> Result<Vec<u8>> {
        if self.disposed {
            return Err(Error::Closed("foreign data source"));
        }
        let mut written = 0usize;
        let status = unsafe {
            (self.table.read)(
                self.table.context,
                self.buffer.as_mut_ptr(),
                self.buffer.len(),
                &mut written,
            )
        };
        if status != 0 {
            return Err(last_error_or("foreign read failed"));
        }
        Ok(self.buffer[..written.min(self.buffer.len())].to_vec())
    }

    fn close(&mut self) -> Result<()> {
        if !self.disposed {
            self.disposed = true;
            unsafe { (self.table.dispose)(self.table.context) };
            self.table.context = ptr::null_mut();
        }
        Ok(())
    }
}

impl Drop for ForeignDataSource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// A native data sink function table driven from Rust.
pub struct ForeignDataSink {
    table: FFIDataSink,
    disposed: bool,
}

impl ForeignDataSink {
    /// Take ownership of a function table.
    ///
    /// # Safety
    /// The table's callbacks must honour the documented contract and
    /// `context` must be valid until `dispose` is called.
    pub unsafe fn new(table: FFIDataSink) -> Self {
        Self {
            table,
            disposed: false,
        }
    }
}

impl DataSink for ForeignDataSink {
    fn is_good(&mut self) -> bool {
        !self.disposed && unsafe { (self.table.is_good)(self.table.context) } == 1
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.disposed {
            return Err(Error::Closed("foreign data sink"));
        }
        let status = unsafe { (self.table.write)(self.table.context, data.as_ptr(), data.len()) };
        if status != 0 {
            return Err(last_error_or("foreign write failed"));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.disposed {
            self.disposed = true;
            unsafe { (self.table.dispose)(self.table.context) };
            self.table.context = ptr::null_mut();
        }
        Ok(())
    }
}

impl Drop for ForeignDataSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
