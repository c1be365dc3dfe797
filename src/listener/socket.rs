//! UDP socket creation with receive-buffer negotiation.

use std::{io, net::SocketAddr};

use log::{info, warn};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

/// Largest value `SO_RCVBUF` accepts; the option is a C `int`.
pub const MAX_RECV_BUFFER: usize = 0x7FFF_FFFF;

/// Outcome of asking the kernel for a receive buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecvBuffer {
    /// Size asked for, after clamping to [`MAX_RECV_BUFFER`].
    pub requested: usize,
    /// Size the kernel reports back.
    pub granted: usize,
}

impl RecvBuffer {
    /// Report whether the kernel granted at least the requested size.
    ///
    /// # Examples
    ///
    /// ```
    /// use downlink::listener::RecvBuffer;
    ///
    /// assert!(RecvBuffer { requested: 4096, granted: 8192 }.is_honored());
    /// assert!(!RecvBuffer { requested: 1 << 30, granted: 425_984 }.is_honored());
    /// ```
    #[must_use]
    pub const fn is_honored(&self) -> bool { self.granted >= self.requested }
}

/// Create a UDP socket bound to `addr`, requesting `recv_buffer_size` bytes
/// of kernel receive buffer first.
///
/// A refused or reduced buffer is logged and tolerated: the link then loses
/// datagrams under load instead of failing. Only socket creation and binding
/// errors are returned.
///
/// # Errors
///
/// Returns the I/O error raised while creating, binding or registering the
/// socket with the runtime.
pub fn bind_udp(addr: SocketAddr, recv_buffer_size: usize) -> io::Result<(UdpSocket, RecvBuffer)> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;

    let requested = recv_buffer_size.min(MAX_RECV_BUFFER);
    if let Err(e) = socket.set_recv_buffer_size(requested) {
        warn!("failed to set receive buffer size: requested={requested}, error={e}");
    }
    let buffer = RecvBuffer {
        requested,
        granted: socket.recv_buffer_size()?,
    };
    info!(
        "kernel receive buffer: requested={}, granted={}",
        buffer.requested, buffer.granted
    );
    if !buffer.is_honored() {
        warn!(
            "kernel receive buffer smaller than requested, datagrams may be dropped under load: \
             requested={}, granted={}; raise net.core.rmem_max to allow more",
            buffer.requested, buffer.granted
        );
    }

    info!("binding datagram socket: addr={addr}");
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;
    let socket = UdpSocket::from_std(socket.into())?;
    Ok((socket, buffer))
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddr};

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn binds_ephemeral_port_with_small_buffer() {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
        let (socket, buffer) = bind_udp(addr, 64 * 1024).expect("bind loopback");

        assert_ne!(socket.local_addr().expect("local addr").port(), 0);
        assert_eq!(buffer.requested, 64 * 1024);
        assert!(buffer.granted > 0);
    }

    #[rstest]
    #[tokio::test]
    async fn oversized_request_is_clamped() {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
        let (_socket, buffer) = bind_udp(addr, usize::MAX).expect("bind loopback");
        assert_eq!(buffer.requested, MAX_RECV_BUFFER);
    }

    #[rstest]
    #[tokio::test]
    async fn bind_to_taken_port_fails() {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
        let (first, _) = bind_udp(addr, 4096).expect("bind loopback");
        let taken = first.local_addr().expect("local addr");

        assert!(bind_udp(taken, 4096).is_err());
    }
}
