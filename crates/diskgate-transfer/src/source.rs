//! Byte sources that can feed a transfer

use crate::Result;
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A pull-based byte source with an optional known length.
///
/// Implementations must make `close` idempotent and must return `Ok(0)` from
/// `read` once closed.
pub trait TransferSource: Read + Send {
    /// Total number of bytes this source will yield, if known in advance
    fn length(&self) -> Option<u64>;

    /// Release the underlying handle or connection
    fn close(&mut self);

    /// Whether `close` has been called
    fn is_closed(&self) -> bool;

    /// Short human-readable label for logs
    fn describe(&self) -> String;
}

/// A source backed by a local file
pub struct FileSource {
    path: PathBuf,
    file: Option<File>,
    len: u64,
}

impl FileSource {
    /// Open a file for streaming
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its metadata read
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_at(path, 0)
    }

    /// Open a file and start reading at `offset`. The reported length is the
    /// number of bytes remaining after the offset.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, inspected or seeked
    pub fn open_at<P: AsRef<Path>>(path: P, offset: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let size = file.metadata()?.len();
        let offset = offset.min(size);
        if offset > 0 {
            file.seek(SeekFrom::Start(offset))?;
        }

        debug!("Opened {} ({} bytes, offset {})", path.display(), size, offset);

        Ok(Self {
            path,
            file: Some(file),
            len: size - offset,
        })
    }

    /// Path this source reads from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.read(buf),
            None => Ok(0),
        }
    }
}

impl TransferSource for FileSource {
    fn length(&self) -> Option<u64> {
        Some(self.len)
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            debug!("Closed file source {}", self.path.display());
        }
    }

    fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSource")
            .field("path", &self.path)
            .field("len", &self.len)
            .field("closed", &self.file.is_none())
            .finish()
    }
}

/// A source over any reader, with a caller-declared length
pub struct ReaderSource<R> {
    reader: Option<R>,
    len: Option<u64>,
    label: String,
}

impl<R: Read + Send> ReaderSource<R> {
    pub fn new(reader: R, len: Option<u64>) -> Self {
        Self {
            reader: Some(reader),
            len,
            label: "reader".to_string(),
        }
    }

    /// Set the label used in logs
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl<R: Read + Send> Read for ReaderSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.reader.as_mut() {
            Some(reader) => reader.read(buf),
            None => Ok(0),
        }
    }
}

impl<R: Read + Send> TransferSource for ReaderSource<R> {
    fn length(&self) -> Option<u64> {
        self.len
    }

    fn close(&mut self) {
        self.reader = None;
    }

    fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

impl<R> fmt::Debug for ReaderSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderSource")
            .field("label", &self.label)
            .field("len", &self.len)
            .field("closed", &self.reader.is_none())
            .finish()
    }
}
