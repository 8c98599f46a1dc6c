//! Progress reporting for streaming transfers
//!
//! Progress never travels through the byte stream. The adapter calls a
//! [`ProgressSink`] supplied by the caller with cumulative byte counts.

use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::info;

/// A single progress notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Bytes transferred so far, including any resumed prefix
    pub transferred: u64,
    /// Total expected bytes, if known
    pub total: Option<u64>,
    /// Whole percent complete, only when the total is known
    pub percent: Option<u8>,
}

/// Receiver of transfer progress
pub trait ProgressSink: Send + Sync {
    /// Called when progress is made
    fn on_progress(&self, event: &ProgressEvent);

    /// Called once when the transfer ends, successfully or not
    fn on_finish(&self, _transferred: u64) {}
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// No-op progress sink
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Progress sink that writes `tracing` events
#[derive(Debug, Clone)]
pub struct LogProgress {
    label: String,
}

impl LogProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl ProgressSink for LogProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        match (event.percent, event.total) {
            (Some(percent), Some(total)) => {
                info!("{} {:>3}% ({}/{} bytes)", self.label, percent, event.transferred, total)
            }
            _ => info!("{} {} bytes...", self.label, event.transferred),
        }
    }

    fn on_finish(&self, transferred: u64) {
        info!("{} finished: {} bytes", self.label, transferred);
    }
}

/// Terminal progress bar, created lazily on the first event so that the
/// bar type (bounded or spinner) matches what the source knows about its size
pub struct BarProgress {
    label: String,
    bar: OnceLock<ProgressBar>,
}

impl BarProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            bar: OnceLock::new(),
        }
    }

    fn bar(&self, total: Option<u64>) -> &ProgressBar {
        self.bar.get_or_init(|| {
            let bar = match total {
                Some(total) => {
                    let bar = ProgressBar::new(total);
                    if let Ok(style) = ProgressStyle::default_bar().template(
                        "{spinner:.green} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({percent}%, {bytes_per_sec})",
                    ) {
                        bar.set_style(style.progress_chars("#>-"));
                    }
                    bar
                }
                None => {
                    let bar = ProgressBar::new_spinner();
                    if let Ok(style) =
                        ProgressStyle::default_spinner().template("{spinner:.green} {msg} {bytes}")
                    {
                        bar.set_style(style);
                    }
                    bar
                }
            };
            bar.set_message(self.label.clone());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        })
    }
}

impl fmt::Debug for BarProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarProgress")
            .field("label", &self.label)
            .field("started", &self.bar.get().is_some())
            .finish()
    }
}

impl ProgressSink for BarProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        self.bar(event.total).set_position(event.transferred);
    }

    fn on_finish(&self, transferred: u64) {
        if let Some(bar) = self.bar.get() {
            bar.set_position(transferred);
            bar.finish_with_message(format!("{} done", self.label));
        }
    }
}

/// Per-session bookkeeping that decides when to notify the sink
pub(crate) struct ProgressTracker {
    sink: Arc<dyn ProgressSink>,
    /// Bytes already present before this session started
    offset: u64,
    /// Bytes moved by this session
    moved: u64,
    /// Full expected size including `offset`
    total: Option<u64>,
    last_percent: Option<u8>,
    last_reported: u64,
    /// Reporting interval in bytes when the total is unknown
    interval: u64,
    finished: bool,
}

impl ProgressTracker {
    pub fn new(sink: Arc<dyn ProgressSink>, offset: u64, total: Option<u64>, interval: usize) -> Self {
        let mut tracker = Self {
            sink,
            offset,
            moved: 0,
            total,
            last_percent: None,
            last_reported: offset,
            interval: interval.max(1) as u64,
            finished: false,
        };
        tracker.last_percent = tracker.percent();
        tracker
    }

    pub fn transferred(&self) -> u64 {
        self.offset + self.moved
    }

    fn percent(&self) -> Option<u8> {
        self.total.map(|total| {
            if total == 0 {
                100
            } else {
                (self.transferred().saturating_mul(100) / total).min(100) as u8
            }
        })
    }

    fn emit(&mut self) {
        let event = ProgressEvent {
            transferred: self.transferred(),
            total: self.total,
            percent: self.percent(),
        };
        self.last_reported = event.transferred;
        self.last_percent = event.percent;
        self.sink.on_progress(&event);
    }

    /// Account for `n` more bytes
    pub fn record(&mut self, n: usize) {
        if n == 0 || self.finished {
            return;
        }
        self.moved += n as u64;

        let due = match self.total {
            Some(_) => self.percent() != self.last_percent,
            None => self.transferred() - self.last_reported >= self.interval,
        };
        if due {
            self.emit();
        }
    }

    /// Flush a final event for any unreported bytes and notify the sink once
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if self.transferred() != self.last_reported || (self.moved == 0 && self.total == Some(0)) {
            self.emit();
        }
        self.sink.on_finish(self.transferred());
    }
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("offset", &self.offset)
            .field("moved", &self.moved)
            .field("total", &self.total)
            .field("last_percent", &self.last_percent)
            .field("finished", &self.finished)
            .finish()
    }
}
