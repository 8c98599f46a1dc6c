//! Buffer management utilities

use bytes::{Bytes, BytesMut};
use std::io::{self, Read};

/// A staging buffer that is refilled from a source one chunk at a time
#[derive(Debug)]
pub(crate) struct ChunkBuffer {
    /// Bytes pulled from the source but not yet handed out
    data: BytesMut,
    /// Target fill size
    capacity: usize,
}

impl ChunkBuffer {
    /// Create a new chunk buffer with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            data: BytesMut::new(),
            capacity: capacity.max(1),
        }
    }

    /// Get the current length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pull from `reader` until the buffer holds a full chunk or the reader
    /// reports end-of-stream. Returns the number of bytes added; zero means
    /// the reader is exhausted.
    pub fn fill_from<R: Read + ?Sized>(&mut self, reader: &mut R) -> io::Result<usize> {
        let start = self.data.len();
        if start >= self.capacity {
            return Ok(0);
        }

        self.data.resize(self.capacity, 0);
        let mut filled = start;

        while filled < self.capacity {
            match reader.read(&mut self.data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.data.truncate(filled);
                    return Err(e);
                }
            }
        }

        self.data.truncate(filled);
        Ok(filled - start)
    }

    /// Take up to `max` bytes from the front of the buffer
    pub fn take(&mut self, max: usize) -> Bytes {
        let n = max.min(self.data.len());
        self.data.split_to(n).freeze()
    }

    /// Copy as much as fits into `out`, consuming it from the buffer
    pub fn copy_into(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.data.len());
        out[..n].copy_from_slice(&self.data[..n]);
        let _ = self.data.split_to(n);
        n
    }

    /// Clear the buffer and release its memory
    pub fn clear(&mut self) {
        self.data = BytesMut::new();
    }
}
