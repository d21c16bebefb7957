//! Function tables driven end to end through the C ABI.

use std::ffi::CString;
use std::io::Cursor;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use virgil_native::{
    virgil_data_sink_create_file, virgil_data_source_open_file, virgil_last_error,
    virgil_string_free, FFIDataSink, FFIDataSource, ForeignDataSink, ForeignDataSource,
};
use virgilcrypto_stream::{pump, DataSink, DataSource, StreamDataSink, StreamDataSource};

#[test]
fn test_exported_source_round_trips_into_foreign_sink() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.bin");
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 253) as u8).collect();

    let path = CString::new(output.to_str().unwrap()).unwrap();
    let mut sink_table = MaybeUninit::<FFIDataSink>::uninit();
    let status = unsafe { virgil_data_sink_create_file(path.as_ptr(), sink_table.as_mut_ptr()) };
    assert_eq!(status, 0);

    let source_table =
        FFIDataSource::new(StreamDataSource::with_chunk_size(Cursor::new(data.clone()), 4096).unwrap());
    let mut source = unsafe { ForeignDataSource::new(source_table) };
    let mut sink = unsafe { ForeignDataSink::new(sink_table.assume_init()) };

    assert!(sink.is_good());
    assert_eq!(pump(&mut source, &mut sink).unwrap(), data.len() as u64);
    source.close().unwrap();
    sink.close().unwrap();

    assert_eq!(std::fs::read(&output).unwrap(), data);
}

#[test]
fn test_open_file_source_reads_whole_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.bin");
    std::fs::write(&input, b"native payload").unwrap();

    let path = CString::new(input.to_str().unwrap()).unwrap();
    let mut table = MaybeUninit::<FFIDataSource>::uninit();
    let status = unsafe { virgil_data_source_open_file(path.as_ptr(), 4, table.as_mut_ptr()) };
    assert_eq!(status, 0);

    let mut source = unsafe { ForeignDataSource::new(table.assume_init()) };
    let mut collected = Vec::new();
    while source.has_data().unwrap() {
        collected.extend(source.read().unwrap());
    }
    assert_eq!(collected, b"native payload");
}

#[test]
fn test_dispose_runs_once() {
    let disposed = Arc::new(AtomicUsize::new(0));

    let counter = disposed.clone();
    let source = StreamDataSource::new(Cursor::new(b"x".to_vec()))
        .on_dispose(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    let mut foreign = unsafe { ForeignDataSource::new(FFIDataSource::new(source)) };
    foreign.close().unwrap();
    foreign.close().unwrap();
    assert!(foreign.read().is_err());
    drop(foreign);

    let counter = disposed.clone();
    let sink = StreamDataSink::new(Vec::new()).on_dispose(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let foreign = unsafe { ForeignDataSink::new(FFIDataSink::new(sink)) };
    drop(foreign);

    assert_eq!(disposed.load(Ordering::SeqCst), 2);
}

#[test]
fn test_foreign_sink_reports_not_good_after_close() {
    let mut sink = unsafe { ForeignDataSink::new(FFIDataSink::new(StreamDataSink::new(Vec::new()))) };
    assert!(sink.is_good());
    sink.close().unwrap();
    assert!(!sink.is_good());
    assert!(sink.write(b"late").is_err());
}

#[test]
fn test_create_file_in_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("missing").join("out.bin");
    let path = CString::new(target.to_str().unwrap()).unwrap();
    let mut table = MaybeUninit::<FFIDataSink>::uninit();

    let status = unsafe { virgil_data_sink_create_file(path.as_ptr(), table.as_mut_ptr()) };
    assert_eq!(status, -1);

    let message = virgil_last_error();
    assert!(!message.is_null());
    unsafe { virgil_string_free(message) };
}

#[cfg(unix)]
#[test]
fn test_open_file_source_reads_fifo() {
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let fifo = dir.path().join("input.fifo");
    let status = std::process::Command::new("mkfifo").arg(&fifo).status().unwrap();
    assert!(status.success());

    let writer_path = fifo.clone();
    let writer = std::thread::spawn(move || {
        let mut file = std::fs::OpenOptions::new().write(true).open(writer_path).unwrap();
        file.write_all(b"streamed ").unwrap();
        file.flush().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));
        file.write_all(b"through a fifo").unwrap();
    });

    let path = CString::new(fifo.to_str().unwrap()).unwrap();
    let mut table = MaybeUninit::<FFIDataSource>::uninit();
    let status = unsafe { virgil_data_source_open_file(path.as_ptr(), 0, table.as_mut_ptr()) };
    assert_eq!(status, 0);

    let mut source = unsafe { ForeignDataSource::new(table.assume_init()) };
    let mut collected = Vec::new();
    while source.has_data().unwrap() {
        collected.extend(source.read().unwrap());
    }
    writer.join().unwrap();

    assert_eq!(collected, b"streamed through a fifo");
}
