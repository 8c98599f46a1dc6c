//! TransferAdapter - a progress-tracking, chunked byte source for HTTP bodies

use crate::{
    buffer::ChunkBuffer,
    chunk::choose_chunk_size,
    progress::{NoProgress, ProgressSink, ProgressTracker},
    remote::HttpSource,
    source::{FileSource, TransferSource},
    Result, TransferError,
};
use bytes::Bytes;
use reqwest::blocking::{Body, Client};
use std::fmt;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Options for a single transfer session
#[derive(Clone)]
pub struct TransferOptions {
    /// Explicit chunk size; wins over the size-based policy when positive
    pub chunk_size: Option<usize>,
    /// Bytes already transferred in an earlier session (resumed downloads)
    pub resume_offset: u64,
    /// Where progress events go
    pub sink: Arc<dyn ProgressSink>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            chunk_size: None,
            resume_offset: 0,
            sink: Arc::new(NoProgress),
        }
    }
}

impl TransferOptions {
    pub fn with_chunk_size(mut self, chunk_size: Option<usize>) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_resume_offset(mut self, offset: u64) -> Self {
        self.resume_offset = offset;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }
}

impl fmt::Debug for TransferOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferOptions")
            .field("chunk_size", &self.chunk_size)
            .field("resume_offset", &self.resume_offset)
            .finish()
    }
}

/// Wraps a [`TransferSource`] with chunked reads, byte accounting and
/// progress reporting.
///
/// Initialization failures do not escape as errors: the adapter is created
/// in an error state instead, reports [`has_error`](Self::has_error) and
/// yields empty reads. Callers check `has_error()` before trusting
/// [`length`](Self::length) or starting an upload.
pub struct TransferAdapter {
    source: Option<Box<dyn TransferSource>>,
    label: String,
    length: Option<u64>,
    chunk_size: usize,
    buffer: ChunkBuffer,
    progress: ProgressTracker,
    bytes_read: u64,
    error: Option<TransferError>,
    eof: bool,
    closed: bool,
}

impl TransferAdapter {
    /// Create an adapter over an already opened source
    pub fn new<S: TransferSource + 'static>(source: S, options: TransferOptions) -> Self {
        let label = source.describe();
        let length = source.length();
        let chunk_size = choose_chunk_size(length, options.chunk_size);
        let total = length.map(|len| len + options.resume_offset);

        debug!(
            "Transfer from {}: size {:?}, chunk size {} bytes",
            label, length, chunk_size
        );

        Self {
            source: Some(Box::new(source)),
            label,
            length,
            chunk_size,
            buffer: ChunkBuffer::new(chunk_size),
            progress: ProgressTracker::new(options.sink, options.resume_offset, total, chunk_size),
            bytes_read: 0,
            error: None,
            eof: false,
            closed: false,
        }
    }

    /// Create an adapter that captures a failed initialization
    pub fn failed(error: TransferError, options: TransferOptions) -> Self {
        warn!("Transfer source failed to initialize: {}", error);
        let chunk_size = choose_chunk_size(None, options.chunk_size);

        Self {
            source: None,
            label: "failed source".to_string(),
            length: None,
            chunk_size,
            buffer: ChunkBuffer::new(chunk_size),
            progress: ProgressTracker::new(options.sink, options.resume_offset, None, chunk_size),
            bytes_read: 0,
            error: Some(error),
            eof: true,
            closed: false,
        }
    }

    /// Create an adapter from the outcome of opening a source
    pub fn from_result<S: TransferSource + 'static>(
        opened: Result<S>,
        options: TransferOptions,
    ) -> Self {
        match opened {
            Ok(source) => Self::new(source, options),
            Err(e) => Self::failed(e, options),
        }
    }

    /// Adapter over a local file
    pub fn open_file<P: AsRef<Path>>(path: P, options: TransferOptions) -> Self {
        Self::from_result(FileSource::open(path), options)
    }

    /// Adapter over a streamed remote URL
    pub fn open_url(client: &Client, url: &str, options: TransferOptions) -> Self {
        Self::from_result(HttpSource::open(client, url), options)
    }

    /// Read at most `max_bytes`. An empty result means end-of-stream, a
    /// closed adapter, or a failure recorded in [`error`](Self::error).
    pub fn read_chunk(&mut self, max_bytes: usize) -> Bytes {
        if max_bytes == 0 || self.fill().is_err() {
            return Bytes::new();
        }
        let chunk = self.buffer.take(max_bytes);
        self.advance(chunk.len());
        chunk
    }

    /// Total bytes the source will yield, if known
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// Chunk size chosen for this session
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Bytes handed out by this session
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Bytes handed out plus any resumed prefix
    pub fn total_transferred(&self) -> u64 {
        self.progress.transferred()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&TransferError> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<TransferError> {
        self.error.take()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True once the source reported end-of-stream
    pub fn is_exhausted(&self) -> bool {
        self.eof
    }

    /// Release the source. Safe to call any number of times.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(mut source) = self.source.take() {
            source.close();
            debug!(
                "Transfer from {} closed after {} bytes",
                self.label, self.bytes_read
            );
        }
        self.buffer.clear();
        self.progress.finish();
    }

    /// Drain the adapter into `writer` one chunk at a time
    ///
    /// # Errors
    /// Returns the recorded source error, or any error from `writer`
    pub fn copy_to<W: Write + ?Sized>(&mut self, writer: &mut W) -> Result<u64> {
        if let Some(ref err) = self.error {
            return Err(TransferError::Init(err.to_string()));
        }

        let mut copied = 0u64;
        loop {
            let chunk = self.read_chunk(self.chunk_size);
            if chunk.is_empty() {
                break;
            }
            writer.write_all(&chunk)?;
            copied += chunk.len() as u64;
        }
        writer.flush()?;

        match self.error {
            Some(ref err) => Err(TransferError::Interrupted(err.to_string())),
            None => Ok(copied),
        }
    }

    /// Move the adapter behind a shared handle
    pub fn share(self) -> SharedTransfer {
        SharedTransfer {
            inner: Arc::new(Mutex::new(self)),
        }
    }

    /// Make sure the staging buffer holds data unless the stream is over
    fn fill(&mut self) -> io::Result<()> {
        if let Some(ref err) = self.error {
            return Err(io::Error::new(io::ErrorKind::Other, err.to_string()));
        }
        if self.closed || self.eof || !self.buffer.is_empty() {
            return Ok(());
        }

        let Some(source) = self.source.as_mut() else {
            self.eof = true;
            return Ok(());
        };

        match self.buffer.fill_from(source.as_mut()) {
            Ok(0) => {
                self.eof = true;
                debug!("Transfer from {} complete: {} bytes", self.label, self.bytes_read);
                self.progress.finish();
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Read from {} failed: {}", self.label, e);
                let reported = io::Error::new(e.kind(), e.to_string());
                self.error = Some(TransferError::Io(e));
                Err(reported)
            }
        }
    }

    fn advance(&mut self, n: usize) {
        self.bytes_read += n as u64;
        self.progress.record(n);
    }
}

impl Read for TransferAdapter {
    /// Unlike [`TransferAdapter::read_chunk`], failures surface as errors here
    /// so that an HTTP client aborts the request instead of sending a
    /// truncated body.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.fill()?;
        let n = self.buffer.copy_into(buf);
        self.advance(n);
        Ok(n)
    }
}

impl Drop for TransferAdapter {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for TransferAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferAdapter")
            .field("label", &self.label)
            .field("length", &self.length)
            .field("chunk_size", &self.chunk_size)
            .field("bytes_read", &self.bytes_read)
            .field("error", &self.error)
            .field("eof", &self.eof)
            .field("closed", &self.closed)
            .finish()
    }
}

/// A cloneable handle to a [`TransferAdapter`].
///
/// One clone becomes the HTTP request body while the call site keeps
/// another to read counters and close the source.
#[derive(Clone)]
pub struct SharedTransfer {
    inner: Arc<Mutex<TransferAdapter>>,
}

impl SharedTransfer {
    fn lock(&self) -> MutexGuard<'_, TransferAdapter> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn length(&self) -> Option<u64> {
        self.lock().length()
    }

    pub fn chunk_size(&self) -> usize {
        self.lock().chunk_size()
    }

    pub fn bytes_read(&self) -> u64 {
        self.lock().bytes_read()
    }

    pub fn total_transferred(&self) -> u64 {
        self.lock().total_transferred()
    }

    pub fn has_error(&self) -> bool {
        self.lock().has_error()
    }

    /// Message of the recorded error, if any
    pub fn error_message(&self) -> Option<String> {
        self.lock().error().map(|e| e.to_string())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_closed()
    }

    pub fn close(&self) {
        self.lock().close();
    }

    /// Guard that closes the transfer when dropped
    pub fn close_guard(&self) -> CloseGuard {
        CloseGuard {
            transfer: self.clone(),
        }
    }

    /// Turn this handle into a streaming request body. The body is sized
    /// when the length is known so that `Content-Length` is sent.
    pub fn into_body(self) -> Body {
        match self.length() {
            Some(len) => Body::sized(self, len),
            None => Body::new(self),
        }
    }
}

impl Read for SharedTransfer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.lock().read(buf)
    }
}

impl fmt::Debug for SharedTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedTransfer").field(&*self.lock()).finish()
    }
}

/// Closes a [`SharedTransfer`] on every exit path
#[derive(Debug)]
pub struct CloseGuard {
    transfer: SharedTransfer,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.transfer.close();
    }
}
