//! Bus receiver: the only reader of the bus.
//!
//! Per cycle: read a frame, validate the header (repairing the address byte
//! if enabled), validate the trailer, classify by network function parity
//! and queue it for the request server or the response collector. Nothing
//! that goes wrong with a single frame stops the loop.

use std::sync::Arc;

use ipmb_core::{BusConfig, BusRead};
use ipmb_proto::{Frame, FrameKind, MAX_FRAME_SIZE, decode_with_repair};
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tracing::{debug, info, trace, warn};

/// Turn raw bytes off the bus into a validated frame.
///
/// With `repair` set, a failing header checksum first goes through the
/// address-byte repair strategies. A failing data checksum is always final.
pub fn ingest(raw: &[u8], local_addr: u8, repair: bool) -> ipmb_proto::Result<Frame> {
    if !repair {
        return Frame::decode(raw);
    }

    let (frame, strategy) = decode_with_repair(raw, local_addr)?;
    if let Some(strategy) = strategy {
        debug!(%strategy, "repaired inbound frame header");
    }
    Ok(frame)
}

/// Receive loop. Returns only when both consumers are gone.
pub(crate) async fn run(
    mut reader: impl BusRead,
    requests: mpsc::Sender<Frame>,
    responses: mpsc::Sender<Frame>,
    config: Arc<BusConfig>,
) {
    let bus = config.bus_id;
    let mut buf = [0u8; MAX_FRAME_SIZE];

    loop {
        let len = match reader.read_frame(&mut buf).await {
            Ok(len) if len > 0 => len,
            Ok(_) => {
                tokio::time::sleep(config.poll_interval).await;
                continue;
            },
            Err(e) => {
                trace!(bus, error = %e, "bus read failed");
                tokio::time::sleep(config.poll_interval).await;
                continue;
            },
        };

        let raw = &buf[..len];
        trace!(bus, frame = %hex::encode(raw), "bus frame received");

        let frame = match ingest(raw, config.local_addr, config.repair_frames) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(bus, error = %e, frame = %hex::encode(raw), "dropping corrupt frame");
                continue;
            },
        };
        debug!(bus, %frame, "inbound");

        let queue = match frame.kind() {
            FrameKind::Request => &requests,
            FrameKind::Response => &responses,
        };

        match queue.send_timeout(frame, config.enqueue_timeout).await {
            Ok(()) => {},
            Err(SendTimeoutError::Timeout(frame)) => {
                warn!(bus, kind = %frame.kind(), seq = frame.seq(), "queue full, dropping frame");
                tokio::time::sleep(config.enqueue_backoff).await;
            },
            Err(SendTimeoutError::Closed(frame)) => {
                if requests.is_closed() && responses.is_closed() {
                    info!(bus, "bus receiver stopping");
                    return;
                }
                warn!(bus, kind = %frame.kind(), seq = frame.seq(), "no consumer, dropping frame");
            },
        }
    }
}
