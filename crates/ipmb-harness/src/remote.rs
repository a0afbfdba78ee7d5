//! The node at the far end of a simulated bus.
//!
//! Tests use it to observe what the daemon writes and to feed the daemon
//! inbound frames: replies to its requests, requests of its own, or raw
//! corrupted bytes.

use std::time::Duration;

use ipmb_core::IpmiResponse;
use ipmb_proto::{Frame, FrameKind};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

/// Scripted peer on a [`crate::SimBus`].
#[derive(Debug)]
pub struct RemoteNode {
    inbound: mpsc::UnboundedSender<Vec<u8>>,
    written: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl RemoteNode {
    pub(crate) fn new(
        inbound: mpsc::UnboundedSender<Vec<u8>>,
        written: mpsc::UnboundedReceiver<Vec<u8>>,
    ) -> Self {
        Self { inbound, written }
    }

    /// Put raw bytes on the bus towards the daemon.
    ///
    /// Returns `false` once the daemon's reader has been dropped.
    pub fn inject(&self, raw: impl Into<Vec<u8>>) -> bool {
        self.inbound.send(raw.into()).is_ok()
    }

    /// Encode `frame` and put it on the bus towards the daemon.
    pub fn send_frame(&self, frame: &Frame) -> bool {
        match frame.to_bytes() {
            Ok(bytes) => self.inject(bytes.to_vec()),
            Err(_) => false,
        }
    }

    /// Reply to `request` as its responder would.
    pub fn respond(&self, request: &Frame, response: &IpmiResponse) -> bool {
        self.send_frame(&Frame::response_to(request, response.completion_code, &response.data))
    }

    /// Next raw frame the daemon wrote, waiting up to `timeout`.
    pub async fn next_written(&mut self, timeout: Duration) -> Option<Vec<u8>> {
        tokio::time::timeout(timeout, self.written.recv()).await.ok().flatten()
    }

    /// Next frame the daemon wrote, decoded. Undecodable writes are skipped.
    pub async fn next_frame(&mut self, timeout: Duration) -> Option<Frame> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let raw = self.next_written(remaining).await?;
            match Frame::decode(&raw) {
                Ok(frame) => return Some(frame),
                Err(e) => debug!(error = %e, "remote node skipped undecodable write"),
            }
        }
    }

    /// Answer every request the daemon writes with `reply`, in a background
    /// task. Returning `None` from `reply` leaves that request unanswered.
    pub fn serve<F>(mut self, mut reply: F) -> JoinHandle<()>
    where
        F: FnMut(&Frame) -> Option<IpmiResponse> + Send + 'static,
    {
        tokio::spawn(async move {
            while let Some(raw) = self.written.recv().await {
                let Ok(frame) = Frame::decode(&raw) else {
                    continue;
                };
                if frame.kind() != FrameKind::Request {
                    continue;
                }
                if let Some(response) = reply(&frame) {
                    self.respond(&frame, &response);
                }
            }
        })
    }
}
