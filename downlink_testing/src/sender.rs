//! A UDP sender that fragments messages the way the flight side does.

use std::{io, net::SocketAddr};

use bytes::Bytes;
use downlink::fragment::{FragmentationError, Fragmenter, SeqId};
use tokio::net::UdpSocket;

fn fragmentation(err: FragmentationError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, err)
}

/// Sends fragmented messages to a fixed target over loopback.
pub struct DatagramSender {
    socket: UdpSocket,
    target: SocketAddr,
    fragmenter: Fragmenter,
}

impl DatagramSender {
    /// Bind an ephemeral loopback socket that sends `packet_size` datagrams
    /// to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound or `packet_size` is
    /// too small to carry a header.
    pub async fn bind(target: SocketAddr, packet_size: usize) -> io::Result<Self> {
        let fragmenter = Fragmenter::new(packet_size).map_err(fragmentation)?;
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        Ok(Self {
            socket,
            target,
            fragmenter,
        })
    }

    /// Split `message` into datagrams under the next sequence id without
    /// sending them.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be fragmented.
    pub fn fragment(&mut self, message: &[u8]) -> io::Result<(SeqId, Vec<Bytes>)> {
        self.fragmenter.fragment(message).map_err(fragmentation)
    }

    /// Split `message` under an explicit sequence id without sending it.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be fragmented.
    pub fn fragment_as(&self, seq_id: SeqId, message: &[u8]) -> io::Result<Vec<Bytes>> {
        self.fragmenter
            .fragment_with_seq_id(seq_id, message)
            .map_err(fragmentation)
    }

    /// Fragment and send `message` in order under the next sequence id.
    ///
    /// # Errors
    ///
    /// Returns an error if fragmenting or sending fails.
    pub async fn send_message(&mut self, message: &[u8]) -> io::Result<SeqId> {
        let (seq_id, datagrams) = self.fragment(message)?;
        self.send_all(&datagrams).await?;
        Ok(seq_id)
    }

    /// Send raw bytes as one datagram.
    ///
    /// # Errors
    ///
    /// Returns an error if the send fails.
    pub async fn send_raw(&self, datagram: &[u8]) -> io::Result<()> {
        self.socket.send_to(datagram, self.target).await.map(drop)
    }

    /// Send each datagram in slice order.
    ///
    /// # Errors
    ///
    /// Returns an error if any send fails.
    pub async fn send_all(&self, datagrams: &[Bytes]) -> io::Result<()> {
        for datagram in datagrams {
            self.send_raw(datagram).await?;
        }
        Ok(())
    }

    /// Send the datagrams at `order`, skipping indices out of range.
    ///
    /// Repeating an index duplicates a datagram; omitting one simulates loss.
    ///
    /// # Errors
    ///
    /// Returns an error if any send fails.
    pub async fn send_selected(&self, datagrams: &[Bytes], order: &[usize]) -> io::Result<()> {
        for datagram in order.iter().filter_map(|&i| datagrams.get(i)) {
            self.send_raw(datagram).await?;
        }
        Ok(())
    }
}
