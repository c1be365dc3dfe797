//! Receiver lifecycle.
//!
//! [`DownlinkReceiver`] validates configuration and binds the socket;
//! [`BoundReceiver`] spawns the listener, the reassembler and the health
//! reporter and runs them until shutdown. The three tasks share nothing but
//! the handoff queue, the output sink and the [`Activity`] region.


use std::{future::Future, net::SocketAddr, sync::Arc};

use tokio::{net::UdpSocket, select, signal, time::timeout};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{info, warn};

use crate::{
    codec::{MessageCodec, Schema},
    config::{ConfigError, ReceiverConfig},
    dispatch::OutputSink,
    error::{ReceiverError, Result},
    fragment::FragmentTable,
    handoff::handoff_queue,
    health::{Activity, HealthReporter, HealthSink, LogHealthSink},
    listener::{BackoffConfig, Listener, RecvBuffer, bind_udp},
    reassembler::Reassembler,
};

/// An unbound receiver.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use downlink::{config::ReceiverConfig, dispatch::ChannelHub, runtime::DownlinkReceiver};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ReceiverConfig::default();
/// let hub = Arc::new(ChannelHub::new(config.latch));
/// let receiver = DownlinkReceiver::from_config(config, Arc::clone(&hub))?
///     .bind()
///     .await?;
/// receiver.run().await;
/// # Ok(())
/// # }
/// ```
pub struct DownlinkReceiver<C, O> {
    config: ReceiverConfig,
    codec: C,
    sink: Arc<O>,
    health_sink: Arc<dyn HealthSink>,
    backoff: BackoffConfig,
}

impl<O: OutputSink> DownlinkReceiver<Schema, O> {
    /// Create a receiver using the built-in schema named by
    /// `config.message_type`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the message type is unknown or its
    /// parameters are missing.
    pub fn from_config(config: ReceiverConfig, sink: Arc<O>) -> std::result::Result<Self, ConfigError> {
        let schema = Schema::resolve(&config.message_type, &config.fields)?;
        Ok(Self::new(config, schema, sink))
    }
}

impl<C, O> DownlinkReceiver<C, O>
where
    C: MessageCodec,
    O: OutputSink,
{
    /// Create a receiver decoding with `codec` and publishing to `sink`.
    #[must_use]
    pub fn new(config: ReceiverConfig, codec: C, sink: Arc<O>) -> Self {
        Self {
            config,
            codec,
            sink,
            health_sink: Arc::new(LogHealthSink),
            backoff: BackoffConfig::default(),
        }
    }

    /// Send health reports to `sink` instead of the log.
    #[must_use]
    pub fn with_health_sink(mut self, sink: impl HealthSink) -> Self {
        self.health_sink = Arc::new(sink);
        self
    }

    /// Override the back-off applied after socket receive errors.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Borrow the configuration.
    #[must_use]
    pub fn config(&self) -> &ReceiverConfig { &self.config }

    /// Validate the configuration and bind the receive socket.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiverError::Config`] for invalid configuration,
    /// [`ReceiverError::Resolve`] or [`ReceiverError::NoAddress`] when the
    /// receive address cannot be resolved, and [`ReceiverError::Bind`] when
    /// the socket cannot be bound.
    pub async fn bind(self) -> Result<BoundReceiver<C, O>> {
        self.config.validate()?;
        let addr = resolve(&self.config.receive_address, self.config.receive_port).await?;
        let (socket, recv_buffer) = bind_udp(addr, self.config.recv_buffer_size)
            .map_err(|source| ReceiverError::Bind { addr, source })?;
        let local_addr = socket
            .local_addr()
            .map_err(|source| ReceiverError::Bind { addr, source })?;
        info!(
            %local_addr,
            message_type = %self.config.message_type,
            packet_size = self.config.packet_size,
            tolerance = self.config.fragment_tolerance,
            pessimistic = self.config.pessimistic,
            "receiver bound"
        );

        let Self {
            config,
            codec,
            sink,
            health_sink,
            backoff,
        } = self;
        Ok(BoundReceiver {
            config,
            codec,
            sink,
            health_sink,
            backoff,
            socket,
            local_addr,
            recv_buffer,
            activity: Activity::new(),
        })
    }
}

async fn resolve(address: &str, port: u16) -> Result<SocketAddr> {
    let mut addrs = tokio::net::lookup_host((address, port))
        .await
        .map_err(|source| ReceiverError::Resolve {
            address: address.to_owned(),
            port,
            source,
        })?;
    addrs.next().ok_or_else(|| ReceiverError::NoAddress {
        address: address.to_owned(),
        port,
    })
}

/// A receiver with a bound socket, ready to run.
pub struct BoundReceiver<C, O> {
    config: ReceiverConfig,
    codec: C,
    sink: Arc<O>,
    health_sink: Arc<dyn HealthSink>,
    backoff: BackoffConfig,
    socket: UdpSocket,
    local_addr: SocketAddr,
    recv_buffer: RecvBuffer,
    activity: Activity,
}

impl<C, O> BoundReceiver<C, O>
where
    C: MessageCodec,
    O: OutputSink,
{
    /// Address the socket is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr { self.local_addr }

    /// Receive buffer negotiated with the kernel.
    #[must_use]
    pub const fn recv_buffer(&self) -> RecvBuffer { self.recv_buffer }

    /// Handle to the activity region the reassembler will update.
    #[must_use]
    pub fn activity(&self) -> Activity { self.activity.clone() }

    /// Run until Ctrl+C.
    pub async fn run(self) {
        self.run_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await;
    }

    /// Run until `shutdown` resolves.
    ///
    /// On shutdown every task is cancelled, including a listener blocked in
    /// a receive, and the call waits at most the configured shutdown timeout
    /// for them to finish.
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    pub async fn run_with_shutdown<S>(self, shutdown: S)
    where
        S: Future<Output = ()> + Send,
    {
        let BoundReceiver {
            config,
            codec,
            sink,
            health_sink,
            backoff,
            socket,
            activity,
            ..
        } = self;
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let (queue_tx, queue_rx) = handoff_queue();

        let table = FragmentTable::new(
            config.payload_len(),
            config.fragment_tolerance,
            config.eviction_policy(),
        );
        let listener =
            Listener::new(socket, table, queue_tx, config.packet_size).with_backoff(backoff);
        let reassembler = Reassembler::new(
            codec,
            Arc::clone(&sink),
            config.normalized_prefix(),
            activity.clone(),
        );
        let output: Arc<dyn OutputSink> = sink;
        let reporter = HealthReporter::new(
            activity,
            health_sink,
            output,
            config.receive_address.clone(),
            config.receive_port,
            config.health_period(),
        );

        tracker.spawn(listener.run(token.clone()));
        tracker.spawn(reassembler.run(queue_rx, token.clone()));
        tracker.spawn(reporter.run(token.clone()));
        tracker.close();

        select! {
            () = shutdown => info!("shutdown requested"),
            () = tracker.wait() => {},
        }
        token.cancel();

        if timeout(config.shutdown_timeout(), tracker.wait()).await.is_err() {
            warn!(
                remaining = tracker.len(),
                timeout_ms = config.shutdown_timeout_ms,
                "receiver tasks still running after shutdown timeout"
            );
        }
        info!("receiver stopped");
    }
}
