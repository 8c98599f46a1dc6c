//! # diskgate-transfer
//!
//! Streaming transfer layer for diskgate. This crate turns a local file or a
//! remote HTTP response body into a pull-based byte source that an HTTP
//! client can send as a request body without holding the payload in memory.
//!
//! ## Architecture
//!
//! The main abstractions are:
//! - [`TransferSource`]: one interface over the byte sources (`FileSource`,
//!   `HttpSource`, `ReaderSource`)
//! - [`TransferAdapter`]: wraps a source with adaptive chunking, byte
//!   accounting, progress reporting and an idempotent `close`
//! - [`SharedTransfer`]: a handle that lets the same adapter be used as a
//!   `reqwest` blocking body while the caller keeps control of it
//!
//! Progress goes to a caller-supplied [`ProgressSink`], never into the byte
//! stream.

#![warn(missing_debug_implementations)]

mod adapter;
mod buffer;
pub mod chunk;
mod error;
pub mod progress;
mod remote;
mod source;

pub use adapter::{CloseGuard, SharedTransfer, TransferAdapter, TransferOptions};
pub use chunk::choose_chunk_size;
pub use error::{Result, TransferError};
pub use progress::{BarProgress, LogProgress, NoProgress, ProgressEvent, ProgressSink};
pub use remote::{parse_content_range, parse_disposition_filename, HttpSource};
pub use source::{FileSource, ReaderSource, TransferSource};

// Re-export the blocking client so callers build sources with the same type
pub use reqwest::blocking::Client;
