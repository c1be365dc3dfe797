//! End-to-end tests driving a bound receiver over loopback UDP.
//!
//! Each test binds on an ephemeral port, sends datagrams with
//! `downlink_testing::DatagramSender` and inspects what reached the sink.

use std::{future::Future, sync::Arc};

use bytes::Bytes;
use downlink::{
    codec::{FieldMessage, RawCodec},
    config::ReceiverConfig,
    dispatch::ChannelHub,
    fragment::SeqId,
    health::Activity,
    runtime::DownlinkReceiver,
};
use downlink_testing::{DatagramSender, RecordingHealth, RecordingSink, TestResult};
use rstest::{fixture, rstest};
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{Duration, sleep, timeout},
};

const PACKET_SIZE: usize = 16;
const BLOCK_LEN: usize = PACKET_SIZE - 12;

#[fixture]
fn config() -> ReceiverConfig {
    ReceiverConfig {
        receive_address: "127.0.0.1".into(),
        receive_port: 0,
        packet_size: PACKET_SIZE,
        fragment_tolerance: 2,
        recv_buffer_size: 256 * 1024,
        health_period_ms: 20,
        shutdown_timeout_ms: 500,
        ..ReceiverConfig::default()
    }
}

/// A receiver running on a background task.
struct Running {
    sender: DatagramSender,
    activity: Activity,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Running {
    async fn stop(self) -> TestResult {
        let _ = self.stop.send(());
        timeout(Duration::from_secs(2), self.handle).await??;
        Ok(())
    }
}

async fn start_raw(config: ReceiverConfig, sink: Arc<RecordingSink>) -> TestResult<Running> {
    let receiver = DownlinkReceiver::new(config, RawCodec, sink).bind().await?;
    spawn(receiver.local_addr(), receiver.activity(), |shutdown| {
        receiver.run_with_shutdown(async move {
            let _ = shutdown.await;
        })
    })
    .await
}

async fn spawn<F, Fut>(
    target: std::net::SocketAddr,
    activity: Activity,
    run: F,
) -> TestResult<Running>
where
    F: FnOnce(oneshot::Receiver<()>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (stop, stop_rx) = oneshot::channel();
    let handle = tokio::spawn(run(stop_rx));
    let sender = DatagramSender::bind(target, PACKET_SIZE).await?;
    Ok(Running {
        sender,
        activity,
        stop,
        handle,
    })
}

/// Wait until the reassembler has handled `groups` groups.
async fn settle(activity: &Activity, groups: u64) -> TestResult {
    timeout(Duration::from_secs(2), async {
        loop {
            let snapshot = activity.snapshot();
            if snapshot.delivered + snapshot.dropped >= groups {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}

fn padded(message: &[u8]) -> Bytes {
    let mut buffer = message.to_vec();
    buffer.resize(message.len().div_ceil(BLOCK_LEN) * BLOCK_LEN, 0);
    Bytes::from(buffer)
}

#[rstest]
#[tokio::test]
async fn reordered_and_duplicated_fragments_publish_once(config: ReceiverConfig) -> TestResult {
    let sink = RecordingSink::shared();
    let mut running = start_raw(config, Arc::clone(&sink)).await?;

    let message = b"telemetry frame 0001";
    let (_, datagrams) = running.sender.fragment(message)?;
    running
        .sender
        .send_selected(&datagrams, &[4, 2, 2, 0, 3, 1, 0])
        .await?;

    settle(&running.activity, 1).await?;
    running.stop().await?;

    assert_eq!(sink.payloads("/from_fc/data"), vec![padded(message)]);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn stale_partial_group_is_published_with_zero_gap(config: ReceiverConfig) -> TestResult {
    let sink = RecordingSink::shared();
    let mut running = start_raw(config, Arc::clone(&sink)).await?;

    let (_, lossy) = running.sender.fragment(b"AAAABBBBCCCC")?;
    running.sender.send_selected(&lossy, &[0, 2]).await?;
    let newer = running.sender.fragment_as(SeqId::new(3), b"DDDD")?;
    running.sender.send_all(&newer).await?;

    settle(&running.activity, 2).await?;
    running.stop().await?;

    let published = sink.payloads("/from_fc/data");
    assert_eq!(published.len(), 2);
    assert!(published.contains(&Bytes::from_static(b"AAAA\0\0\0\0CCCC")));
    assert!(published.contains(&Bytes::from_static(b"DDDD")));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn pessimistic_receiver_drops_stale_partial_group(config: ReceiverConfig) -> TestResult {
    let sink = RecordingSink::shared();
    let config = ReceiverConfig {
        pessimistic: true,
        ..config
    };
    let mut running = start_raw(config, Arc::clone(&sink)).await?;

    let (_, lossy) = running.sender.fragment(b"AAAABBBBCCCC")?;
    running.sender.send_selected(&lossy, &[0, 2]).await?;
    let newer = running.sender.fragment_as(SeqId::new(3), b"DDDD")?;
    running.sender.send_all(&newer).await?;

    settle(&running.activity, 1).await?;
    // Give a wrongly forwarded partial group time to show up.
    sleep(Duration::from_millis(50)).await;
    running.stop().await?;

    assert_eq!(
        sink.payloads("/from_fc/data"),
        vec![Bytes::from_static(b"DDDD")]
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn malformed_datagrams_do_not_stop_the_receiver(config: ReceiverConfig) -> TestResult {
    let sink = RecordingSink::shared();
    let mut running = start_raw(config, Arc::clone(&sink)).await?;

    running.sender.send_raw(b"short").await?;
    running.sender.send_raw(&[0; PACKET_SIZE]).await?;
    running.sender.send_message(b"after").await?;

    settle(&running.activity, 1).await?;
    running.stop().await?;

    assert_eq!(sink.payloads("/from_fc/data"), vec![padded(b"after")]);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn health_reports_and_last_received_time_are_published(
    config: ReceiverConfig,
) -> TestResult {
    let sink = RecordingSink::shared();
    let health = RecordingHealth::default();
    let receiver = DownlinkReceiver::new(config, RawCodec, Arc::clone(&sink))
        .with_health_sink(health.clone())
        .bind()
        .await?;
    let mut running = spawn(receiver.local_addr(), receiver.activity(), |shutdown| {
        receiver.run_with_shutdown(async move {
            let _ = shutdown.await;
        })
    })
    .await?;

    running.sender.send_message(b"ping").await?;
    settle(&running.activity, 1).await?;
    sleep(Duration::from_millis(60)).await;
    running.stop().await?;

    let last = health.last().ok_or("no health report")?;
    assert_eq!(last.address, "127.0.0.1");
    assert_eq!(last.delivered, 1);
    assert!(last.since_last_input.is_some());

    let stamps = sink.payloads("last_received_time");
    let latest = stamps.last().ok_or("no last_received_time published")?;
    assert_eq!(latest.len(), 8);
    assert_ne!(latest.as_ref(), &[0; 8]);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn fields_schema_latches_values_for_late_subscribers(config: ReceiverConfig) -> TestResult {
    let config = ReceiverConfig {
        message_type: "fields".into(),
        fields: vec!["imu".into(), "image".into()],
        output_prefix: "downlink".into(),
        ..config
    };
    let hub = Arc::new(ChannelHub::new(config.latch));
    let receiver = DownlinkReceiver::from_config(config, Arc::clone(&hub))?
        .bind()
        .await?;
    let mut running = spawn(receiver.local_addr(), receiver.activity(), |shutdown| {
        receiver.run_with_shutdown(async move {
            let _ = shutdown.await;
        })
    })
    .await?;

    let message = FieldMessage::default()
        .with_field("imu", vec![1, 2, 3])
        .with_field("image", b"not really a jpeg".to_vec());
    running.sender.send_message(&message.to_bytes()?).await?;
    settle(&running.activity, 1).await?;
    running.stop().await?;

    let mut imu = hub.subscribe("/downlink/imu");
    assert_eq!(imu.next().await, Some(Bytes::from_static(&[1, 2, 3])));
    assert_eq!(
        hub.latest("/downlink/image"),
        Some(Bytes::from_static(b"not really a jpeg"))
    );
    assert!(hub.channels().contains(&"last_received_time".to_owned()));
    Ok(())
}
