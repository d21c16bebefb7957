//! Byte stream handles wrapped by the adapters.
//!
//! `std::io` has no availability probe and no explicit close, so both are
//! added here on top of `Read` and `Write`.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Cursor, ErrorKind, Read, Seek, Write};

/// A readable stream that can report how many bytes are ready now.
pub trait InputStream: Read {
    /// Bytes that can be read without blocking. Zero at end of stream.
    fn available(&mut self) -> io::Result<usize>;

    /// Release the underlying resource.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A writable stream with an explicit close.
pub trait OutputStream: Write {
    /// Flush and release the underlying resource.
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl<T: AsRef<[u8]>> InputStream for Cursor<T> {
    fn available(&mut self) -> io::Result<usize> {
        let len = self.get_ref().as_ref().len() as u64;
        Ok(len.saturating_sub(self.position()) as usize)
    }
}

impl InputStream for &[u8] {
    fn available(&mut self) -> io::Result<usize> {
        Ok(self.len())
    }
}

/// Regular files only. Pipes, FIFOs and terminals have no length to
/// measure against; wrap them in a [`BufReader`].
impl InputStream for File {
    fn available(&mut self) -> io::Result<usize> {
        let metadata = self.metadata()?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "not a regular file, wrap it in a BufReader to read it as a stream",
            ));
        }
        let position = self.stream_position()?;
        Ok(usize::try_from(metadata.len().saturating_sub(position)).unwrap_or(usize::MAX))
    }
}

/// Reports the buffered bytes, refilling an empty buffer first. Works for
/// any reader, including pipes: a refill waits for the next bytes and only
/// an exhausted reader reports zero.
impl<R: Read> InputStream for BufReader<R> {
    fn available(&mut self) -> io::Result<usize> {
        loop {
            match self.fill_buf() {
                Ok(buf) => return Ok(buf.len()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<S: InputStream + ?Sized> InputStream for &mut S {
    fn available(&mut self) -> io::Result<usize> {
        (**self).available()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S: InputStream + ?Sized> InputStream for Box<S> {
    fn available(&mut self) -> io::Result<usize> {
        (**self).available()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl OutputStream for Vec<u8> {}

impl OutputStream for Cursor<Vec<u8>> {}

impl OutputStream for io::Sink {}

impl OutputStream for File {
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_all()
    }
}

impl<W: OutputStream> OutputStream for BufWriter<W> {
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_mut().close()
    }
}

impl<S: OutputStream + ?Sized> OutputStream for &mut S {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S: OutputStream + ?Sized> OutputStream for Box<S> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}
