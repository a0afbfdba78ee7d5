//! Client side of the gateway socket.
//!
//! Local tools link against this to talk to a running daemon.

use std::{io, path::Path};

use ipmb_proto::Endpoint;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::UnixStream,
};

/// Encode a client request for `dest`.
pub fn request_bytes(dest: Endpoint, netfn: u8, cmd: u8, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + data.len());
    out.push(dest.addr);
    out.push((netfn << 2) | (dest.lun & 0x03));
    out.push(cmd);
    out.extend_from_slice(data);
    out
}

/// Send one request to the gateway at `path` and read the reply.
///
/// The reply is `[cc, data..]`, or empty if the daemon could not complete
/// the request (timeout, restricted mode, bus failure).
///
/// # Errors
///
/// Socket errors only; daemon-side failures show up as an empty reply.
pub async fn send_request(path: impl AsRef<Path>, request: &[u8]) -> io::Result<Vec<u8>> {
    let mut stream = UnixStream::connect(path).await?;
    stream.write_all(request).await?;

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await?;
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_layout() {
        let bytes = request_bytes(Endpoint::with_lun(0x40, 2), 0x06, 0x01, &[0xAB]);
        assert_eq!(bytes, vec![0x40, 0x1A, 0x01, 0xAB]);
    }
}
