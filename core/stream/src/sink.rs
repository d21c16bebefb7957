//! Push-based data sink backed by a byte stream.

use std::io::Write;

use virgilcrypto_common::{Error, Result};

use crate::io::OutputStream;
use crate::DisposeHook;

/// Data sink shape expected by the native library.
pub trait DataSink {
    /// Whether the sink can accept data.
    fn is_good(&mut self) -> bool;

    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Close the wrapped stream and signal disposal.
    fn close(&mut self) -> Result<()>;
}

impl<T: DataSink + ?Sized> DataSink for Box<T> {
    fn is_good(&mut self) -> bool {
        (**self).is_good()
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// [`DataSink`] over an [`OutputStream`].
pub struct StreamDataSink<S: OutputStream> {
    stream: S,
    closed: bool,
    on_dispose: Option<DisposeHook>,
}

impl<S: OutputStream> StreamDataSink<S> {
    /// Wrap `stream`.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            closed: false,
            on_dispose: None,
        }
    }

    /// Install the disposal signal run after the stream is closed.
    pub fn on_dispose(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_dispose = Some(Box::new(hook));
        self
    }

    /// Whether `close` has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Reference to the wrapped stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}

impl<S: OutputStream> DataSink for StreamDataSink<S> {
    /// Always true. Stream failures surface from `write`.
    fn is_good(&mut self) -> bool {
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::Closed("data sink"));
        }
        self.stream.write_all(data)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let result = self.stream.close();
        if let Some(dispose) = self.on_dispose.take() {
            dispose();
        }
        result.map_err(Error::from)
    }
}

impl<S: OutputStream> Drop for StreamDataSink<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Closing data sink on drop failed: {}", e);
        }
    }
}
