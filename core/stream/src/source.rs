//! Pull-based data source backed by a byte stream.

use std::io::{ErrorKind, Read};

use virgilcrypto_common::{Error, Result};

use crate::io::InputStream;
use crate::DisposeHook;

/// Default read chunk limit (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Data source shape expected by the native library.
pub trait DataSource {
    /// Whether more data can be read now.
    fn has_data(&mut self) -> Result<bool>;

    /// Read the next chunk. May be empty.
    fn read(&mut self) -> Result<Vec<u8>>;

    /// Close the wrapped stream and signal disposal.
    fn close(&mut self) -> Result<()>;
}

impl<T: DataSource + ?Sized> DataSource for Box<T> {
    fn has_data(&mut self) -> Result<bool> {
        (**self).has_data()
    }

    fn read(&mut self) -> Result<Vec<u8>> {
        (**self).read()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// [`DataSource`] over an [`InputStream`].
///
/// Each [`read`](DataSource::read) returns at most
/// `min(available, chunk_size)` bytes and never blocks beyond what the
/// stream's availability probe allows. Closing closes the stream, then runs
/// the disposal hook exactly once. Dropping an open source closes it.
pub struct StreamDataSource<S: InputStream> {
    stream: S,
    chunk_size: usize,
    closed: bool,
    on_dispose: Option<DisposeHook>,
}

impl<S: InputStream> StreamDataSource<S> {
    /// Wrap `stream` with the default chunk size.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            chunk_size: DEFAULT_CHUNK_SIZE,
            closed: false,
            on_dispose: None,
        }
    }

    /// Wrap `stream` with a custom chunk size.
    ///
    /// # Errors
    /// - Zero chunk size
    pub fn with_chunk_size(stream: S, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidInput(
                "Chunk size must be greater than zero".to_string(),
            ));
        }
        let mut source = Self::new(stream);
        source.chunk_size = chunk_size;
        Ok(source)
    }

    /// Install the disposal signal run after the stream is closed.
    pub fn on_dispose(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_dispose = Some(Box::new(hook));
        self
    }

    /// Chunk limit in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Whether `close` has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Reference to the wrapped stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed("data source"));
        }
        Ok(())
    }
}

impl<S: InputStream> DataSource for StreamDataSource<S> {
    fn has_data(&mut self) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.stream.available()? > 0)
    }

    fn read(&mut self) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let wanted = self.stream.available()?.min(self.chunk_size);
        let mut chunk = vec![0u8; wanted];
        if wanted == 0 {
            return Ok(chunk);
        }
        let read = loop {
            match self.stream.read(&mut chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        chunk.truncate(read);
        Ok(chunk)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let result = self.stream.close();
        // Disposal is signalled even when closing the stream failed.
        if let Some(dispose) = self.on_dispose.take() {
            dispose();
        }
        result.map_err(Error::from)
    }
}

impl<S: InputStream> Drop for StreamDataSource<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Closing data source on drop failed: {}", e);
        }
    }
}
