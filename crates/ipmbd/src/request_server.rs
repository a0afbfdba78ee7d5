//! Request server: answers requests other nodes address to us.

use std::sync::Arc;

use bytes::Bytes;
use ipmb_core::{BusConfig, BusWriter, CommandHandler, IpmiRequest, IpmiResponse};
use ipmb_proto::{CompletionCode, Frame};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Encode the reply to `request`, falling back to a bare error completion
/// code when the handler's data does not fit on the bus.
fn encode_reply(request: &Frame, reply: &IpmiResponse) -> Option<Bytes> {
    Frame::response_to(request, reply.completion_code, &reply.data)
        .to_bytes()
        .or_else(|e| {
            warn!(error = %e, cmd = request.header().cmd(), "reply does not fit on the bus");
            Frame::response_to(request, CompletionCode::UNSPECIFIED, &[]).to_bytes()
        })
        .ok()
}

/// Serve queued requests until the receiver goes away.
pub(crate) async fn run(
    mut requests: mpsc::Receiver<Frame>,
    handler: Arc<dyn CommandHandler>,
    writer: Arc<BusWriter>,
    config: Arc<BusConfig>,
) {
    let bus = config.bus_id;

    while let Some(request) = requests.recv().await {
        let ipmi = IpmiRequest::from_frame(&request, config.payload_id);
        let handler = Arc::clone(&handler);

        let reply = match tokio::task::spawn_blocking(move || handler.handle(&ipmi)).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(bus, error = %e, "command handler failed");
                IpmiResponse::error(CompletionCode::UNSPECIFIED)
            },
        };

        let Some(bytes) = encode_reply(&request, &reply) else {
            continue;
        };

        match writer.write(&bytes).await {
            Ok(()) => debug!(
                bus,
                seq = request.seq(),
                cc = reply.completion_code,
                frame = %hex::encode(&bytes),
                "reply sent"
            ),
            Err(e) => warn!(bus, seq = request.seq(), error = %e, "dropping reply"),
        }
    }
}
