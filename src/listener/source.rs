//! Sources of raw datagrams consumed by the [`Listener`](super::Listener).

use std::{io, net::SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;

/// Anything the listener can pull datagrams from.
///
/// Implementations must be cancellation-safe: dropping a pending `recv()`
/// future must not lose a datagram that was already dequeued.
#[async_trait]
pub trait DatagramSource: Send + Sync {
    /// Wait for the next datagram and copy it into `buf`.
    ///
    /// Returns the number of bytes written. Datagrams longer than `buf` are
    /// truncated.
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Address the source is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl DatagramSource for UdpSocket {
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let (len, _peer) = self.recv_from(buf).await?;
        Ok(len)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> { UdpSocket::local_addr(self) }
}
