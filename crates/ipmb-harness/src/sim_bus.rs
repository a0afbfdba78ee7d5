//! In-memory bus.
//!
//! Frames the daemon writes land in a channel drained by the
//! [`RemoteNode`]; frames the remote node injects come out of the daemon's
//! slave reader. Bytes are delivered exactly as given, so tests can inject
//! corrupted frames.
//!
//! Faults are opt-in through [`FaultConfig`]: failed writes (fixed count or
//! seeded random rate) and failed reads.

use std::{
    io,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use ipmb_core::{BusRead, BusTransport, BusWrite};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc;
use tracing::trace;

use crate::remote::RemoteNode;

/// Faults injected by the simulated bus.
#[derive(Debug, Clone, Copy)]
pub struct FaultConfig {
    /// Fail this many writes before anything else is considered
    pub fail_first_writes: u32,
    /// Fail this many reads before delivering anything
    pub fail_first_reads: u32,
    /// Probability that any later write fails
    pub write_failure_rate: f64,
    /// RNG seed for `write_failure_rate`
    pub seed: u64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self { fail_first_writes: 0, fail_first_reads: 0, write_failure_rate: 0.0, seed: 0 }
    }
}

#[derive(Debug)]
struct FaultState {
    config: FaultConfig,
    failed: u32,
    failed_reads: u32,
    rng: ChaCha8Rng,
}

impl FaultState {
    fn should_fail_read(&mut self) -> bool {
        if self.failed_reads < self.config.fail_first_reads {
            self.failed_reads += 1;
            return true;
        }
        false
    }

    fn should_fail(&mut self) -> bool {
        if self.failed < self.config.fail_first_writes {
            self.failed += 1;
            return true;
        }
        self.config.write_failure_rate > 0.0 && self.rng.gen_bool(self.config.write_failure_rate)
    }
}

/// Simulated bus transport.
#[derive(Debug)]
pub struct SimBus {
    reader: Mutex<Option<SimReader>>,
    written: mpsc::UnboundedSender<Vec<u8>>,
    faults: Arc<Mutex<FaultState>>,
}

impl SimBus {
    /// Fault-free bus and the node at its far end.
    pub fn new() -> (Self, RemoteNode) {
        Self::with_faults(FaultConfig::default())
    }

    /// Bus that injects `faults` into writes.
    pub fn with_faults(faults: FaultConfig) -> (Self, RemoteNode) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (written_tx, written_rx) = mpsc::unbounded_channel();

        let state = FaultState {
            config: faults,
            failed: 0,
            failed_reads: 0,
            rng: ChaCha8Rng::seed_from_u64(faults.seed),
        };

        let faults = Arc::new(Mutex::new(state));
        let reader = SimReader { inbound: inbound_rx, faults: Arc::clone(&faults) };
        let bus = Self { reader: Mutex::new(Some(reader)), written: written_tx, faults };

        (bus, RemoteNode::new(inbound_tx, written_rx))
    }
}

#[async_trait]
impl BusTransport for SimBus {
    type Reader = SimReader;
    type Writer = SimWriter;

    async fn open_slave(&self, bus: u8) -> io::Result<SimReader> {
        self.reader.lock().unwrap_or_else(PoisonError::into_inner).take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::AddrInUse, format!("bus {bus} slave already open"))
        })
    }

    async fn open_master(&self, _bus: u8) -> io::Result<SimWriter> {
        Ok(SimWriter { written: self.written.clone(), faults: Arc::clone(&self.faults) })
    }
}

/// Slave side of a [`SimBus`].
#[derive(Debug)]
pub struct SimReader {
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
    faults: Arc<Mutex<FaultState>>,
}

#[async_trait]
impl BusRead for SimReader {
    async fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let fail = self.faults.lock().unwrap_or_else(PoisonError::into_inner).should_fail_read();
        if fail {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "injected read failure"));
        }
        let Some(frame) = self.inbound.recv().await else {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "remote node gone"));
        };
        let len = frame.len().min(buf.len());
        buf[..len].copy_from_slice(&frame[..len]);
        trace!(len, "sim bus delivered frame");
        Ok(len)
    }
}

/// Master side of a [`SimBus`].
#[derive(Debug)]
pub struct SimWriter {
    written: mpsc::UnboundedSender<Vec<u8>>,
    faults: Arc<Mutex<FaultState>>,
}

#[async_trait]
impl BusWrite for SimWriter {
    async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        let fail = self.faults.lock().unwrap_or_else(PoisonError::into_inner).should_fail();
        if fail {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "injected write failure"));
        }
        self.written
            .send(frame.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "remote node gone"))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn frames_flow_both_ways() {
        let (bus, mut remote) = SimBus::new();
        let mut reader = bus.open_slave(0).await.unwrap();
        let mut writer = bus.open_master(0).await.unwrap();

        remote.inject(vec![0x20, 0x18, 0xC8]);
        let mut buf = [0u8; 255];
        let len = reader.read_frame(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &[0x20, 0x18, 0xC8]);

        writer.write_frame(&[0x40, 0x18, 0xA8]).await.unwrap();
        let written = remote.next_written(Duration::from_secs(1)).await;
        assert_eq!(written, Some(vec![0x40, 0x18, 0xA8]));
    }

    #[tokio::test]
    async fn slave_opens_once() {
        let (bus, _remote) = SimBus::new();
        assert!(bus.open_slave(0).await.is_ok());
        assert!(bus.open_slave(0).await.is_err());
    }

    #[tokio::test]
    async fn first_writes_fail_on_request() {
        let faults = FaultConfig { fail_first_writes: 2, ..FaultConfig::default() };
        let (bus, _remote) = SimBus::with_faults(faults);
        let mut writer = bus.open_master(0).await.unwrap();

        assert!(writer.write_frame(&[0x40]).await.is_err());
        assert!(writer.write_frame(&[0x40]).await.is_err());
        assert!(writer.write_frame(&[0x40]).await.is_ok());
    }

    #[tokio::test]
    async fn first_reads_fail_on_request() {
        let faults = FaultConfig { fail_first_reads: 1, ..FaultConfig::default() };
        let (bus, remote) = SimBus::with_faults(faults);
        let mut reader = bus.open_slave(0).await.unwrap();
        remote.inject(vec![0x20, 0x18, 0xC8]);

        let mut buf = [0u8; 255];
        assert!(reader.read_frame(&mut buf).await.is_err());
        assert_eq!(reader.read_frame(&mut buf).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn seeded_failures_are_reproducible() {
        async fn pattern(seed: u64) -> Vec<bool> {
            let faults = FaultConfig { write_failure_rate: 0.5, seed, ..FaultConfig::default() };
            let (bus, _remote) = SimBus::with_faults(faults);
            let mut writer = bus.open_master(0).await.unwrap();
            let mut out = Vec::new();
            for _ in 0..32 {
                out.push(writer.write_frame(&[0x40]).await.is_ok());
            }
            out
        }

        assert_eq!(pattern(7).await, pattern(7).await);
    }
}
