//! Per-bus configuration.

use std::time::Duration;

use ipmb_proto::{BMC_SLAVE_ADDR, NetFn, SEQ_NUM_MAX, opcodes::oem_1s};

/// The single command forwarded while restricted mode is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedCommand {
    /// Request network function
    pub netfn: u8,
    /// Command code
    pub cmd: u8,
}

impl AllowedCommand {
    /// Whether a request with this network function and command matches.
    pub fn matches(&self, netfn: u8, cmd: u8) -> bool {
        self.netfn == netfn && self.cmd == cmd
    }
}

impl Default for AllowedCommand {
    fn default() -> Self {
        Self { netfn: NetFn::Oem1s.to_u8(), cmd: oem_1s::UPDATE_FW }
    }
}

/// Configuration for one bus instance.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Bus number
    pub bus_id: u8,
    /// Payload identifier passed to the command handler
    pub payload_id: u8,
    /// Our own slave address on the bus
    pub local_addr: u8,
    /// How long a client waits for a correlated response
    pub response_timeout: Duration,
    /// Attempts per bus write
    pub write_retries: u32,
    /// Delay between failed write attempts
    pub retry_delay: Duration,
    /// Capacity of the request and response queues
    pub queue_depth: usize,
    /// How long the receiver waits for queue space
    pub enqueue_timeout: Duration,
    /// Sleep after a failed enqueue
    pub enqueue_backoff: Duration,
    /// Sleep after a failed bus read
    pub poll_interval: Duration,
    /// Number of sequence slots (at most 64)
    pub sequence_slots: usize,
    /// Reject all client requests except `allowed_command`
    pub restricted: bool,
    /// The command let through in restricted mode
    pub allowed_command: AllowedCommand,
    /// Attempt address-byte repair on frames with a bad header checksum
    pub repair_frames: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bus_id: 0,
            payload_id: 1,
            local_addr: BMC_SLAVE_ADDR,
            response_timeout: Duration::from_secs(5),
            write_retries: 3,
            retry_delay: Duration::from_secs(1),
            queue_depth: 10,
            enqueue_timeout: Duration::from_millis(100),
            enqueue_backoff: Duration::from_secs(1),
            poll_interval: Duration::from_millis(10),
            sequence_slots: SEQ_NUM_MAX,
            restricted: false,
            allowed_command: AllowedCommand::default(),
            repair_frames: true,
        }
    }
}

impl BusConfig {
    /// Default configuration for `bus_id`.
    pub fn for_bus(bus_id: u8) -> Self {
        Self { bus_id, ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allows_firmware_update_only() {
        let allowed = AllowedCommand::default();
        assert!(allowed.matches(0x38, 0x09));
        assert!(!allowed.matches(0x06, 0x01));
        assert!(!allowed.matches(0x38, 0x0A));
    }

    #[test]
    fn for_bus_keeps_defaults() {
        let config = BusConfig::for_bus(3);
        assert_eq!(config.bus_id, 3);
        assert_eq!(config.local_addr, 0x20);
        assert_eq!(config.sequence_slots, 64);
        assert!(!config.restricted);
    }
}
