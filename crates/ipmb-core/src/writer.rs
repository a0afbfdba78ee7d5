//! The single write path onto a bus.
//!
//! Both the request server (replies) and the client gateway (requests)
//! write to the same physical bus. [`BusWriter`] serializes them behind its
//! own lock, separate from the sequence table's, and retries transient
//! failures a bounded number of times.

use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{error::BusError, transport::BusWrite};

/// Serialized, retrying writer shared by everything that transmits.
pub struct BusWriter {
    inner: Mutex<Box<dyn BusWrite>>,
    attempts: u32,
    retry_delay: Duration,
}

impl BusWriter {
    /// Wrap `writer`, trying each frame up to `attempts` times with
    /// `retry_delay` between failures.
    pub fn new(writer: impl BusWrite, attempts: u32, retry_delay: Duration) -> Self {
        Self { inner: Mutex::new(Box::new(writer)), attempts: attempts.max(1), retry_delay }
    }

    /// Write one frame.
    ///
    /// The bus stays locked across retries so another frame cannot slip in
    /// between attempts.
    ///
    /// # Errors
    ///
    /// `WriteFailed` with the last I/O error once every attempt failed.
    pub async fn write(&self, frame: &[u8]) -> Result<(), BusError> {
        let mut writer = self.inner.lock().await;

        let mut attempt = 1;
        loop {
            match writer.write_frame(frame).await {
                Ok(()) => return Ok(()),
                Err(source) if attempt >= self.attempts => {
                    warn!(attempts = attempt, error = %source, "bus write failed");
                    return Err(BusError::WriteFailed { attempts: attempt, source });
                },
                Err(e) => {
                    debug!(attempt, error = %e, "bus write failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                },
            }
        }
    }
}

impl std::fmt::Debug for BusWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusWriter")
            .field("attempts", &self.attempts)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}
