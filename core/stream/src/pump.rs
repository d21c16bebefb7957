//! Driving a source into a sink.

use std::io::{Error as IoError, ErrorKind};

use virgilcrypto_common::{Error, Result};

use crate::sink::DataSink;
use crate::source::DataSource;

/// Move chunks from `source` to `sink` until the source has no more data.
///
/// Neither side is closed. An empty chunk while the source still reports
/// data is treated as end of stream.
///
/// # Returns
/// Number of bytes transferred.
///
/// # Errors
/// - Source or sink errors
/// - `ErrorKind::BrokenPipe` if the sink reports it is not good
pub fn pump<S, K>(source: &mut S, sink: &mut K) -> Result<u64>
where
    S: DataSource + ?Sized,
    K: DataSink + ?Sized,
{
    let mut total = 0u64;
    while source.has_data()? {
        if !sink.is_good() {
            return Err(Error::Io(IoError::new(
                ErrorKind::BrokenPipe,
                "data sink is not good",
            )));
        }
        let chunk = source.read()?;
        if chunk.is_empty() {
            break;
        }
        sink.write(&chunk)?;
        total += chunk.len() as u64;
    }
    tracing::debug!("Pumped {} bytes", total);
    Ok(total)
}
