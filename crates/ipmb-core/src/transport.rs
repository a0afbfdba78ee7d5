//! Bus transport abstraction.
//!
//! A bus is used in two roles at once. As a slave we listen for frames other
//! nodes address to us; as a master we write our own requests and replies.
//! Production talks to a kernel bus device, tests use an in-memory
//! simulation.

use std::io;

use async_trait::async_trait;

/// Opens the two halves of a bus.
///
/// Each bus instance opens exactly one reader and one writer. The reader is
/// owned by the receive loop; the writer is shared behind
/// [`crate::BusWriter`].
#[async_trait]
pub trait BusTransport: Send + Sync + 'static {
    /// Slave-side handle for inbound frames.
    type Reader: BusRead;

    /// Master-side handle for outbound frames.
    type Writer: BusWrite;

    /// Start listening as a slave on `bus`.
    async fn open_slave(&self, bus: u8) -> io::Result<Self::Reader>;

    /// Open `bus` for master writes.
    async fn open_master(&self, bus: u8) -> io::Result<Self::Writer>;
}

/// Reads whole frames addressed to this node.
#[async_trait]
pub trait BusRead: Send + 'static {
    /// Read one frame into `buf` and return its length.
    ///
    /// Implementations may return an error when nothing is pending; the
    /// caller backs off briefly and retries.
    async fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Writes whole frames onto the bus.
#[async_trait]
pub trait BusWrite: Send + 'static {
    /// Write one encoded frame, destination address first.
    async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;
}

#[async_trait]
impl<R: BusRead + ?Sized> BusRead for Box<R> {
    async fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_frame(buf).await
    }
}

#[async_trait]
impl<W: BusWrite + ?Sized> BusWrite for Box<W> {
    async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        (**self).write_frame(frame).await
    }
}
