//! Command-processing collaborator.
//!
//! Requests that other nodes address to us are decoded from their bus frame
//! and handed to a [`CommandHandler`]. The handler sees only the command and
//! its data; framing, checksums and sequence numbers stay on this side.

use bytes::Bytes;
use ipmb_proto::{CompletionCode, Frame};

/// A decoded inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpmiRequest {
    /// Payload (node) identifier this bus serves
    pub payload_id: u8,
    /// Request network function
    pub netfn: u8,
    /// Responder LUN the request targeted
    pub lun: u8,
    /// Command code
    pub cmd: u8,
    /// Request data
    pub data: Bytes,
}

impl IpmiRequest {
    /// Build from a validated request frame.
    pub fn from_frame(frame: &Frame, payload_id: u8) -> Self {
        let header = frame.header();
        Self {
            payload_id,
            netfn: header.netfn(),
            lun: header.dest_lun(),
            cmd: header.cmd(),
            data: frame.data(),
        }
    }
}

/// Reply produced by the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpmiResponse {
    /// Completion code
    pub completion_code: u8,
    /// Response data after the completion code
    pub data: Bytes,
}

impl IpmiResponse {
    /// Successful reply carrying `data`.
    pub fn success(data: impl Into<Bytes>) -> Self {
        Self { completion_code: CompletionCode::SUCCESS, data: data.into() }
    }

    /// Data-less reply with completion code `code`.
    pub fn error(code: u8) -> Self {
        Self { completion_code: code, data: Bytes::new() }
    }
}

/// Turns a request into a reply, synchronously.
///
/// Called from a blocking-capable thread, one request at a time per bus.
pub trait CommandHandler: Send + Sync + 'static {
    /// Process one request.
    fn handle(&self, request: &IpmiRequest) -> IpmiResponse;
}

impl<F> CommandHandler for F
where
    F: Fn(&IpmiRequest) -> IpmiResponse + Send + Sync + 'static,
{
    fn handle(&self, request: &IpmiRequest) -> IpmiResponse {
        self(request)
    }
}
