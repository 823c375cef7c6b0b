use std::future::Future;
use tokio::time::{timeout, Duration};

/// How long to wait for a reply and how many times the last packet is resent
/// before the transfer gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub retries: u8,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(crate::DEF_TIMEOUT_MS),
            retries: crate::DEF_RETRY_COUNT,
        }
    }
}

impl RetryPolicy {
    pub fn new(timeout: Duration, retries: u8) -> Self {
        Self { timeout, retries }
    }

    /// One wait, no retransmission: the first timeout fails the transfer.
    pub fn single_wait(timeout: Duration) -> Self {
        Self::new(timeout, 0)
    }

    /// Total number of waits, the first send included.
    pub fn attempts(&self) -> u32 {
        u32::from(self.retries) + 1
    }

    /// Whether the transfer may resend after `timeouts` consecutive expiries.
    pub fn should_retry(&self, timeouts: u32) -> bool {
        timeouts < self.attempts()
    }

    /// Runs one receive under the deadline. `None` means it expired.
    pub async fn wait<F: Future>(&self, fut: F) -> Option<F::Output> {
        timeout(self.timeout, fut).await.ok()
    }
}
