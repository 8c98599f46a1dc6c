//! Retry wrapper for provider calls
//!
//! Only server errors (5xx) and connection or timeout failures are retried.
//! A 4xx answer is final. When every attempt ends in a 5xx the last
//! response is handed back so its error body can be reported.

use reqwest::blocking::Response;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempt budget and backoff for one provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// A budget of zero attempts is treated as one
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    /// Single attempt, no retries
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the zero-based `attempt` failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay
            .checked_mul(1u32 << attempt.min(16))
            .unwrap_or(Duration::MAX)
    }

    /// Run `send` until it yields a final answer or the budget is spent
    pub fn send<F>(&self, what: &str, mut send: F) -> reqwest::Result<Response>
    where
        F: FnMut() -> reqwest::Result<Response>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let last = attempt >= self.max_attempts;

            match send() {
                Ok(response) if !response.status().is_server_error() => return Ok(response),
                Ok(response) => {
                    if last {
                        warn!(
                            "{} failed with HTTP {} after {} attempts",
                            what,
                            response.status().as_u16(),
                            attempt
                        );
                        return Ok(response);
                    }
                    warn!(
                        "{} returned HTTP {}, retrying ({}/{})",
                        what,
                        response.status().as_u16(),
                        attempt,
                        self.max_attempts
                    );
                }
                Err(e) if is_transient(&e) && !last => {
                    warn!(
                        "{} failed: {}, retrying ({}/{})",
                        what, e, attempt, self.max_attempts
                    );
                }
                Err(e) => return Err(e),
            }

            let delay = self.delay_for(attempt - 1);
            debug!("Waiting {:?} before the next attempt", delay);
            thread::sleep(delay);
        }
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}
