//! Built-in command handler.
//!
//! Enough of the App network function to make the daemon discoverable on
//! the bus without an external command stack. Everything else gets
//! `INVALID_COMMAND`.

use ipmb_core::{CommandHandler, IpmiRequest, IpmiResponse};
use ipmb_proto::{
    CompletionCode, NetFn,
    opcodes::app::{GET_DEVICE_ID, GET_SELFTEST_RESULTS},
};
use tracing::debug;

/// Self test passed, no failures to report.
const SELFTEST_PASSED: [u8; 2] = [0x55, 0x00];

/// Values reported by Get Device ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Device ID
    pub device_id: u8,
    /// Device revision; bit 7 set means the device provides SDRs
    pub device_revision: u8,
    /// Major firmware revision (7 bits)
    pub firmware_major: u8,
    /// Minor firmware revision, BCD
    pub firmware_minor: u8,
    /// IPMI version, BCD with the minor digit in the high nibble
    pub ipmi_version: u8,
    /// Additional device support bitmap
    pub device_support: u8,
    /// IANA manufacturer ID (20 bits)
    pub manufacturer_id: u32,
    /// Product ID
    pub product_id: u16,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            device_id: 0x20,
            device_revision: 0x81,
            firmware_major: 0x01,
            firmware_minor: 0x00,
            ipmi_version: 0x02,
            device_support: 0xBF,
            manufacturer_id: 0x00A015,
            product_id: 0x0000,
        }
    }
}

impl DeviceIdentity {
    /// Get Device ID response data, completion code excluded.
    pub fn to_bytes(&self) -> [u8; 11] {
        let mfr = self.manufacturer_id.to_le_bytes();
        let product = self.product_id.to_le_bytes();
        [
            self.device_id,
            self.device_revision,
            self.firmware_major & 0x7F,
            self.firmware_minor,
            self.ipmi_version,
            self.device_support,
            mfr[0],
            mfr[1],
            mfr[2] & 0x0F,
            product[0],
            product[1],
        ]
    }
}

/// Answers Get Device ID and Get Self Test Results.
#[derive(Debug, Clone, Default)]
pub struct BasicHandler {
    identity: DeviceIdentity,
}

impl BasicHandler {
    /// Handler reporting `identity`.
    pub fn new(identity: DeviceIdentity) -> Self {
        Self { identity }
    }
}

impl CommandHandler for BasicHandler {
    fn handle(&self, request: &IpmiRequest) -> IpmiResponse {
        match (NetFn::from_u8(request.netfn), request.cmd) {
            (Some(NetFn::App), GET_DEVICE_ID) => {
                IpmiResponse::success(self.identity.to_bytes().to_vec())
            },
            (Some(NetFn::App), GET_SELFTEST_RESULTS) => {
                IpmiResponse::success(SELFTEST_PASSED.to_vec())
            },
            _ => {
                debug!(
                    payload_id = request.payload_id,
                    netfn = request.netfn,
                    cmd = request.cmd,
                    "unsupported command"
                );
                IpmiResponse::error(CompletionCode::INVALID_COMMAND)
            },
        }
    }
}
