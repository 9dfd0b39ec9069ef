use std::time::Duration;

use tracing::warn;

use crate::error::Result;

/// Bounded retry for transient DOM-provider failures.
///
/// Only errors reporting [`Error::is_retryable`](crate::Error::is_retryable) are
/// retried; everything else propagates on the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self {
            attempts: 0,
            delay: Duration::ZERO,
        }
    }

    pub const fn once(delay: Duration) -> Self {
        Self { attempts: 1, delay }
    }

    pub fn run<T>(&self, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut retries = 0u32;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && retries < self.attempts => {
                    retries += 1;
                    warn!(
                        attempt = retries,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %err,
                        "dom access failed, retrying"
                    );
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once(Duration::from_millis(50))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorConfig {
    pub retry: RetryPolicy,
    /// NFC-normalize indexed text and locator input before matching.
    pub normalize_unicode: bool,
}

impl LocatorConfig {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_normalize_unicode(mut self, enabled: bool) -> Self {
        self.normalize_unicode = enabled;
        self
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            normalize_unicode: true,
        }
    }
}
