//! Client gateway: local processes reach the bus through here.
//!
//! Each connection on the bus's Unix socket carries one request. The client
//! sends `[rsSA, netFn<<2|rsLUN, cmd, data..]`; the gateway allocates a
//! sequence number, frames and writes the request, waits for the correlated
//! response and sends back `[cc, data..]`. Any failure, timeout included,
//! yields a zero-length reply.

use std::{
    io,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use bytes::Bytes;
use ipmb_core::{BusConfig, BusWriter, SequenceTable};
use ipmb_proto::{Endpoint, Frame, MAX_FRAME_SIZE};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    task::JoinSet,
};
use tracing::{debug, error, trace, warn};

use crate::error::{GatewayError, ServerError};

/// `rsSA`, `netFn/rsLUN` and `cmd`.
const CLIENT_HEADER_SIZE: usize = 3;

/// Path of the client socket for `bus` under `dir`.
pub fn socket_path(dir: impl AsRef<Path>, bus: u8) -> PathBuf {
    dir.as_ref().join(format!("ipmb_socket_{bus}"))
}

/// Bind the client socket at `path`, removing a stale socket file first.
pub fn bind_socket(path: impl AsRef<Path>) -> Result<UnixListener, ServerError> {
    let path = path.as_ref();
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed stale client socket"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {},
        Err(source) => return Err(ServerError::Bind { path: path.to_path_buf(), source }),
    }
    UnixListener::bind(path)
        .map_err(|source| ServerError::Bind { path: path.to_path_buf(), source })
}

struct Shared {
    sequences: Arc<SequenceTable>,
    writer: Arc<BusWriter>,
    config: Arc<BusConfig>,
    restricted: AtomicBool,
}

/// Handle for issuing requests on one bus. Cheap to clone.
#[derive(Clone)]
pub struct Gateway {
    shared: Arc<Shared>,
}

impl Gateway {
    pub(crate) fn new(
        sequences: Arc<SequenceTable>,
        writer: Arc<BusWriter>,
        config: Arc<BusConfig>,
    ) -> Self {
        let restricted = AtomicBool::new(config.restricted);
        Self { shared: Arc::new(Shared { sequences, writer, config, restricted }) }
    }

    /// Whether restricted mode is on.
    pub fn is_restricted(&self) -> bool {
        self.shared.restricted.load(Ordering::Acquire)
    }

    /// Turn restricted mode on or off, e.g. around a firmware update.
    pub fn set_restricted(&self, restricted: bool) {
        self.shared.restricted.store(restricted, Ordering::Release);
    }

    /// Run one client request through the bus.
    ///
    /// Returns the response body (`[cc, data..]`).
    ///
    /// # Errors
    ///
    /// See [`GatewayError`]. The sequence slot is released on every path.
    pub async fn transact(&self, request: &[u8]) -> Result<Bytes, GatewayError> {
        if request.len() < CLIENT_HEADER_SIZE {
            return Err(GatewayError::Malformed("shorter than address, netfn and command"));
        }

        let dest = Endpoint::with_lun(request[0], request[1]);
        let netfn = request[1] >> 2;
        let cmd = request[2];
        if netfn % 2 != 0 {
            return Err(GatewayError::Malformed("response netfn in a request"));
        }

        let config = &self.shared.config;
        if self.is_restricted() && !config.allowed_command.matches(netfn, cmd) {
            return Err(GatewayError::Restricted { netfn, cmd });
        }

        let lease = self.shared.sequences.allocate()?;
        let seq = lease.seq();

        let frame = Frame::request(
            dest,
            netfn,
            Endpoint::new(config.local_addr),
            seq,
            cmd,
            Bytes::copy_from_slice(&request[CLIENT_HEADER_SIZE..]),
        );
        let bytes = frame.to_bytes()?;
        trace!(seq, frame = %hex::encode(&bytes), "sending client request");

        self.shared.writer.write(&bytes).await?;

        lease.wait(config.response_timeout).await.ok_or(GatewayError::Timeout(seq))
    }

    /// Accept client connections on `listener`, one task per connection.
    ///
    /// Connection tasks belong to this future: dropping or aborting it
    /// cancels every request still in flight. Returns only if accepting
    /// fails.
    pub async fn serve(self, listener: UnixListener) -> io::Result<()> {
        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, _) = accepted.inspect_err(|e| {
                        error!(bus = self.shared.config.bus_id, error = %e, "accept failed");
                    })?;
                    let gateway = self.clone();
                    connections.spawn(async move { gateway.handle_connection(stream).await });
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {},
            }
        }
    }

    async fn handle_connection(&self, mut stream: UnixStream) {
        let bus = self.shared.config.bus_id;
        let mut buf = [0u8; MAX_FRAME_SIZE];

        let len = match stream.read(&mut buf).await {
            Ok(0) => {
                debug!(bus, "client closed without a request");
                return;
            },
            Ok(len) => len,
            Err(e) => {
                warn!(bus, error = %e, "client read failed");
                return;
            },
        };

        let reply = match self.transact(&buf[..len]).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(bus, error = %e, "client request failed");
                Bytes::new()
            },
        };

        if let Err(e) = stream.write_all(&reply).await {
            warn!(bus, error = %e, "client write failed");
            return;
        }
        if let Err(e) = stream.shutdown().await {
            debug!(bus, error = %e, "client shutdown failed");
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("bus", &self.shared.config.bus_id)
            .field("restricted", &self.is_restricted())
            .finish_non_exhaustive()
    }
}
