//! Integration tests for diskgate-transfer

use diskgate_transfer::{
    Client, HttpSource, ProgressEvent, ProgressSink, ReaderSource, TransferAdapter,
    TransferOptions, TransferSource,
};
use httpmock::prelude::*;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

fn patterned(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

fn client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Source that counts how often it was closed
struct CountingSource {
    inner: Cursor<Vec<u8>>,
    len: u64,
    closes: Arc<AtomicUsize>,
    closed: bool,
}

impl CountingSource {
    fn new(data: Vec<u8>, closes: Arc<AtomicUsize>) -> Self {
        Self {
            len: data.len() as u64,
            inner: Cursor::new(data),
            closes,
            closed: false,
        }
    }
}

impl Read for CountingSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.closed {
            return Ok(0);
        }
        self.inner.read(buf)
    }
}

impl TransferSource for CountingSource {
    fn length(&self) -> Option<u64> {
        Some(self.len)
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}

fn recording_sink() -> (Arc<Mutex<Vec<ProgressEvent>>>, Arc<dyn ProgressSink>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = events.clone();
    let sink: Arc<dyn ProgressSink> = Arc::new(move |event: &ProgressEvent| {
        sink_events.lock().unwrap().push(*event);
    });
    (events, sink)
}

#[test]
fn test_reads_sum_to_length() {
    for size in [0usize, 1, 4095, 512 * 1024, 512 * 1024 + 7, 3 * 1024 * 1024] {
        let data = patterned(size);
        let source = ReaderSource::new(Cursor::new(data.clone()), Some(size as u64));
        let mut adapter = TransferAdapter::new(source, TransferOptions::default());

        let mut collected = Vec::new();
        let mut total = 0u64;
        loop {
            let chunk = adapter.read_chunk(100_000);
            if chunk.is_empty() {
                break;
            }
            assert!(chunk.len() <= 100_000);
            total += chunk.len() as u64;
            collected.extend_from_slice(&chunk);
        }

        assert_eq!(Some(total), adapter.length());
        assert_eq!(collected, data);
    }
}

#[test]
fn test_file_adapter_reads_whole_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("upload.bin");
    let data = patterned(1_500_000);
    std::fs::write(&path, &data).unwrap();

    let mut adapter = TransferAdapter::open_file(&path, TransferOptions::default());
    assert!(!adapter.has_error());
    assert_eq!(adapter.length(), Some(1_500_000));

    let mut out = Vec::new();
    adapter.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_missing_file_captured_as_error() {
    let mut adapter =
        TransferAdapter::open_file("/nonexistent/diskgate/upload.bin", TransferOptions::default());
    assert!(adapter.has_error());
    assert!(adapter.read_chunk(1024).is_empty());
    assert!(adapter.read_chunk(1024).is_empty());
    adapter.close();
}

#[test]
fn test_close_zero_one_or_many_times() {
    // Never closed explicitly: dropping closes exactly once
    let closes = Arc::new(AtomicUsize::new(0));
    {
        let _adapter = TransferAdapter::new(
            CountingSource::new(patterned(10), closes.clone()),
            TransferOptions::default(),
        );
    }
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    // Closed before any read, then many more times
    let closes = Arc::new(AtomicUsize::new(0));
    let mut adapter = TransferAdapter::new(
        CountingSource::new(patterned(10), closes.clone()),
        TransferOptions::default(),
    );
    adapter.close();
    adapter.close();
    adapter.close();
    assert!(adapter.is_closed());
    assert!(adapter.read_chunk(10).is_empty());
    drop(adapter);
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    // Closed through a shared handle and a guard
    let closes = Arc::new(AtomicUsize::new(0));
    let shared = TransferAdapter::new(
        CountingSource::new(patterned(10), closes.clone()),
        TransferOptions::default(),
    )
    .share();
    {
        let _guard = shared.close_guard();
    }
    shared.close();
    drop(shared);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unreachable_url_reports_error() {
    let mut adapter = TransferAdapter::open_url(
        &client(),
        "http://127.0.0.1:1/unreachable.bin",
        TransferOptions::default(),
    );

    assert!(adapter.has_error());
    assert!(adapter.read_chunk(1024).is_empty());
    let mut buf = [0u8; 16];
    assert!(adapter.read(&mut buf).is_err());
    adapter.close();
    adapter.close();
}

#[test]
fn test_html_response_rejected() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/share/page");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body("<html><body>share page</body></html>");
    });

    let adapter = TransferAdapter::open_url(
        &client(),
        &server.url("/share/page"),
        TransferOptions::default(),
    );
    assert!(adapter.has_error());
    assert!(adapter.error().unwrap().to_string().contains("HTML"));
}

#[test]
fn test_error_status_captured() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/missing.bin");
        then.status(404);
    });

    let result = HttpSource::open(&client(), &server.url("/missing.bin"));
    let err = result.unwrap_err();
    assert!(err.to_string().contains("404"));
}

#[test]
fn test_five_megabyte_remote_file_progress() {
    let server = MockServer::start();
    let data = patterned(5 * 1024 * 1024);
    let mock = server.mock(|when, then| {
        when.method(GET).path("/media/track.mp3");
        then.status(200)
            .header("content-type", "audio/mpeg")
            .body(&data);
    });

    let (events, sink) = recording_sink();
    let mut adapter = TransferAdapter::open_url(
        &client(),
        &server.url("/media/track.mp3"),
        TransferOptions::default().with_sink(sink),
    );

    assert!(!adapter.has_error());
    assert_eq!(adapter.length(), Some(5 * 1024 * 1024));
    assert_eq!(adapter.chunk_size(), 512 * 1024);

    let copied = adapter.copy_to(&mut std::io::sink()).unwrap();
    assert_eq!(copied, 5 * 1024 * 1024);
    adapter.close();
    mock.assert();

    let events = events.lock().unwrap();
    let percents: Vec<u8> = events.iter().map(|e| e.percent.unwrap()).collect();
    assert!(!percents.is_empty());
    assert!(percents.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(*percents.last().unwrap(), 100);
    assert_eq!(events.last().unwrap().transferred, 5 * 1024 * 1024);
}

#[test]
fn test_range_request_reports_start() {
    let server = MockServer::start();
    let tail = patterned(500);
    server.mock(|when, then| {
        when.method(GET)
            .path("/big.bin")
            .header("range", "bytes=1000-");
        then.status(206)
            .header("content-range", "bytes 1000-1499/1500")
            .header("content-type", "application/octet-stream")
            .body(&tail);
    });

    let source = HttpSource::open_from(&client(), &server.url("/big.bin"), 1000).unwrap();
    assert_eq!(source.status(), 206);
    assert_eq!(source.range_start(), Some(1000));
    assert_eq!(source.complete_size(), Some(1500));
    assert_eq!(source.length(), Some(500));
}

#[test]
fn test_shared_transfer_as_request_body() {
    let server = MockServer::start();
    let put = server.mock(|when, then| {
        when.method(PUT)
            .path("/upload/target")
            .header("content-length", "70000");
        then.status(201);
    });

    let source = ReaderSource::new(Cursor::new(patterned(70_000)), Some(70_000));
    let transfer = TransferAdapter::new(source, TransferOptions::default()).share();
    let _guard = transfer.close_guard();

    let response = client()
        .put(server.url("/upload/target"))
        .body(transfer.clone().into_body())
        .send()
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    assert_eq!(transfer.bytes_read(), 70_000);
    put.assert();
}
