//! Data source and data sink adapters for the Virgil Crypto native library.
//!
//! The native library pulls input through a data source
//! (`has_data`, `read`, dispose) and pushes output through a data sink
//! (`is_good`, `write`, dispose). [`StreamDataSource`] and [`StreamDataSink`]
//! implement those shapes over ordinary byte streams.
//!
//! Adapters are not meant to be shared between threads.

pub mod io;
pub mod pump;
pub mod sink;
pub mod source;

pub use io::{InputStream, OutputStream};
pub use pump::pump;
pub use sink::{DataSink, StreamDataSink};
pub use source::{DataSource, StreamDataSource, DEFAULT_CHUNK_SIZE};

/// Disposal signal run once when an adapter is closed.
pub type DisposeHook = Box<dyn FnOnce() + Send>;
