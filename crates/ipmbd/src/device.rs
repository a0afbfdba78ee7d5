//! Character-device bus transport.
//!
//! The kernel IPMB driver exposes each bus as a device node. Reads return
//! one whole frame addressed to us, destination byte included. Writes take
//! the frame without its destination byte: the controller addresses the
//! slave itself.

use std::{io, path::PathBuf};

use async_trait::async_trait;
use ipmb_core::{BusRead, BusTransport, BusWrite};
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

/// Default device path template. `{bus}` is replaced by the bus number.
pub const DEFAULT_DEVICE_TEMPLATE: &str = "/dev/ipmb-{bus}";

/// Opens bus device nodes from a path template.
#[derive(Debug, Clone)]
pub struct DeviceTransport {
    template: String,
}

impl DeviceTransport {
    /// Transport using `template`, where `{bus}` stands for the bus number.
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }

    /// Device path for `bus`.
    pub fn path(&self, bus: u8) -> PathBuf {
        PathBuf::from(self.template.replace("{bus}", &bus.to_string()))
    }

    async fn open(&self, bus: u8, read: bool, write: bool) -> io::Result<File> {
        let path = self.path(bus);
        let file = OpenOptions::new().read(read).write(write).open(&path).await?;
        debug!(bus, path = %path.display(), read, write, "opened bus device");
        Ok(file)
    }
}

impl Default for DeviceTransport {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_TEMPLATE)
    }
}

#[async_trait]
impl BusTransport for DeviceTransport {
    type Reader = DeviceReader;
    type Writer = DeviceWriter;

    async fn open_slave(&self, bus: u8) -> io::Result<DeviceReader> {
        self.open(bus, true, false).await.map(|file| DeviceReader { file })
    }

    async fn open_master(&self, bus: u8) -> io::Result<DeviceWriter> {
        self.open(bus, false, true).await.map(|file| DeviceWriter { file })
    }
}

/// Slave-side device handle.
#[derive(Debug)]
pub struct DeviceReader {
    file: File,
}

#[async_trait]
impl BusRead for DeviceReader {
    async fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf).await
    }
}

/// Master-side device handle.
#[derive(Debug)]
pub struct DeviceWriter {
    file: File,
}

#[async_trait]
impl BusWrite for DeviceWriter {
    async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        let Some(rest) = frame.get(1..) else {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty frame"));
        };
        self.file.write_all(rest).await?;
        self.file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_from_template() {
        assert_eq!(DeviceTransport::default().path(2), PathBuf::from("/dev/ipmb-2"));
        assert_eq!(
            DeviceTransport::new("/tmp/bus{bus}.dev").path(11),
            PathBuf::from("/tmp/bus11.dev")
        );
    }

    #[tokio::test]
    async fn writes_skip_destination_byte() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("ipmb-{bus}").to_string_lossy().into_owned();
        let transport = DeviceTransport::new(template);
        std::fs::write(transport.path(0), b"").unwrap();

        let mut writer = transport.open_master(0).await.unwrap();
        writer.write_frame(&[0x40, 0x18, 0xA8, 0x20, 0x04, 0x01, 0xDB]).await.unwrap();
        drop(writer);

        let written = std::fs::read(transport.path(0)).unwrap();
        assert_eq!(written, vec![0x18, 0xA8, 0x20, 0x04, 0x01, 0xDB]);
    }

    #[tokio::test]
    async fn reads_keep_destination_byte() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("ipmb-{bus}").to_string_lossy().into_owned();
        let transport = DeviceTransport::new(template);
        std::fs::write(transport.path(4), [0x20, 0x18, 0xC8]).unwrap();

        let mut reader = transport.open_slave(4).await.unwrap();
        let mut buf = [0u8; 255];
        let len = reader.read_frame(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &[0x20, 0x18, 0xC8]);
    }

    #[tokio::test]
    async fn missing_device_fails_to_open() {
        let transport = DeviceTransport::new("/nonexistent/ipmb-{bus}");
        assert!(transport.open_slave(0).await.is_err());
    }
}
