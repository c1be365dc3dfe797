//! Integration coverage for `DatagramSender`.

use downlink::fragment::{Fragment, SeqId};
use downlink_testing::{DatagramSender, TestResult};
use tokio::{
    net::UdpSocket,
    time::{Duration, timeout},
};

async fn recv_one(socket: &UdpSocket) -> TestResult<Vec<u8>> {
    let mut buf = [0_u8; 64];
    let len = timeout(Duration::from_secs(1), socket.recv(&mut buf)).await??;
    Ok(buf[..len].to_vec())
}

#[tokio::test]
async fn sends_fixed_size_datagrams_in_selected_order() -> TestResult {
    let target = UdpSocket::bind("127.0.0.1:0").await?;
    let mut sender = DatagramSender::bind(target.local_addr()?, 16).await?;

    let (seq_id, datagrams) = sender.fragment(b"0123456789")?;
    assert_eq!(seq_id, SeqId::new(0));
    assert_eq!(datagrams.len(), 3);
    sender.send_selected(&datagrams, &[2, 0, 9]).await?;

    let first = recv_one(&target).await?;
    let second = recv_one(&target).await?;
    assert_eq!(first.len(), 16);
    assert_eq!(Fragment::parse(&first)?.index().get(), 2);
    assert_eq!(Fragment::parse(&second)?.index().get(), 0);
    Ok(())
}

#[tokio::test]
async fn send_message_advances_the_sequence_id() -> TestResult {
    let target = UdpSocket::bind("127.0.0.1:0").await?;
    let mut sender = DatagramSender::bind(target.local_addr()?, 16).await?;

    assert_eq!(sender.send_message(b"one").await?, SeqId::new(0));
    assert_eq!(sender.send_message(b"two").await?, SeqId::new(1));
    let datagram = recv_one(&target).await?;
    assert_eq!(Fragment::parse(&datagram)?.seq_id(), SeqId::new(0));
    Ok(())
}

#[tokio::test]
async fn rejects_packets_without_room_for_payload() -> TestResult {
    let target = UdpSocket::bind("127.0.0.1:0").await?;
    assert!(DatagramSender::bind(target.local_addr()?, 12).await.is_err());
    Ok(())
}
