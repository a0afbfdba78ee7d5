//! Response collector: routes inbound responses to their waiters.

use std::sync::Arc;

use ipmb_core::SequenceTable;
use ipmb_proto::Frame;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Deliver queued responses until the receiver goes away.
///
/// The payload handed over is the response body: completion code first,
/// then data.
pub(crate) async fn run(mut responses: mpsc::Receiver<Frame>, sequences: Arc<SequenceTable>) {
    while let Some(response) = responses.recv().await {
        let seq = response.seq();
        match sequences.complete(seq, response.body().clone()) {
            Ok(()) => trace!(seq, "response delivered"),
            // Expected when the client already timed out
            Err(e) => debug!(seq, error = %e, "response without waiter"),
        }
    }
}
