//! Network function and completion code values.
//!
//! Only the codes this daemon inspects are named; everything else passes
//! through as a raw byte.

/// Request network functions (responses use `netfn | 1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NetFn {
    /// Chassis device requests
    Chassis = 0x00,
    /// Bridge requests
    Bridge = 0x02,
    /// Sensor and event requests
    SensorEvent = 0x04,
    /// Application requests
    App = 0x06,
    /// Firmware transfer requests
    Firmware = 0x08,
    /// Non-volatile storage requests
    Storage = 0x0A,
    /// Media-specific transport requests
    Transport = 0x0C,
    /// Group extension requests
    GroupExtension = 0x2C,
    /// OEM requests
    Oem = 0x30,
    /// OEM requests for single-socket server boards behind a bridge IC
    Oem1s = 0x38,
}

impl NetFn {
    /// Convert from the request form of a network function.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Chassis),
            0x02 => Some(Self::Bridge),
            0x04 => Some(Self::SensorEvent),
            0x06 => Some(Self::App),
            0x08 => Some(Self::Firmware),
            0x0A => Some(Self::Storage),
            0x0C => Some(Self::Transport),
            0x2C => Some(Self::GroupExtension),
            0x30 => Some(Self::Oem),
            0x38 => Some(Self::Oem1s),
            _ => None,
        }
    }

    /// Request form as a byte.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Matching response network function.
    pub fn response(self) -> u8 {
        self.to_u8() | 1
    }
}

/// Completion codes carried as the first body byte of every response.
pub struct CompletionCode;

impl CompletionCode {
    /// Command completed normally.
    pub const SUCCESS: u8 = 0x00;
    /// Node busy; the command could not be processed.
    pub const NODE_BUSY: u8 = 0xC0;
    /// Invalid or unsupported command.
    pub const INVALID_COMMAND: u8 = 0xC1;
    /// Request data length invalid.
    pub const INVALID_LENGTH: u8 = 0xC7;
    /// Unspecified error.
    pub const UNSPECIFIED: u8 = 0xFF;
}

/// Application network function commands.
pub mod app {
    /// Get Device ID
    pub const GET_DEVICE_ID: u8 = 0x01;
    /// Get Self Test Results
    pub const GET_SELFTEST_RESULTS: u8 = 0x04;
}

/// OEM-1S network function commands.
pub mod oem_1s {
    /// Firmware update (the command allowed in restricted mode)
    pub const UPDATE_FW: u8 = 0x09;
}
