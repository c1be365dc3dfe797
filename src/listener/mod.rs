//! Datagram ingestion.
//!
//! The [`Listener`] owns the socket and the [`FragmentTable`]. It runs in
//! its own task, parses each datagram into a fragment, feeds the table and
//! pushes every group the table releases onto the handoff queue. The queue
//! is the only thing it shares with the rest of the receiver, so a slow
//! consumer never delays ingestion.

mod backoff;
mod socket;
mod source;


pub use backoff::BackoffConfig;
use log::{debug, info, warn};
pub use socket::{MAX_RECV_BUFFER, RecvBuffer, bind_udp};
pub use source::DatagramSource;
use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::{
    fragment::{Disposition, Fragment, FragmentTable},
    handoff::{HandoffClosed, HandoffSender},
    metrics::{self, GroupOutcome},
};

/// Receive loop driving a [`FragmentTable`].
pub struct Listener<S> {
    source: S,
    table: FragmentTable,
    queue: HandoffSender,
    packet_size: usize,
    backoff: BackoffConfig,
}

impl<S: DatagramSource> Listener<S> {
    /// Create a listener reading datagrams of at most `packet_size` bytes
    /// from `source`.
    #[must_use]
    pub fn new(source: S, table: FragmentTable, queue: HandoffSender, packet_size: usize) -> Self {
        Self {
            source,
            table,
            queue,
            packet_size,
            backoff: BackoffConfig::default(),
        }
    }

    /// Override the back-off applied after receive errors.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Borrow the fragment table.
    #[must_use]
    pub fn table(&self) -> &FragmentTable { &self.table }

    /// Feed one raw datagram through the table.
    ///
    /// Malformed datagrams are logged and dropped. Returns the number of
    /// groups pushed onto the handoff queue.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffClosed`] when the reassembler has gone away.
    pub fn ingest(&mut self, datagram: &[u8]) -> Result<usize, HandoffClosed> {
        metrics::inc_datagrams();
        let fragment = match Fragment::parse(datagram) {
            Ok(fragment) => fragment,
            Err(e) => {
                metrics::inc_malformed();
                warn!("dropping malformed datagram: error={e}");
                return Ok(0);
            }
        };

        let mut queued = 0;
        for disposition in self.table.accept(fragment) {
            metrics::inc_groups(outcome(&disposition));
            if let Some(group) = disposition.into_group() {
                self.queue.send(group)?;
                queued += 1;
            }
        }
        Ok(queued)
    }

    /// Receive datagrams until `shutdown` is cancelled or the handoff queue
    /// closes.
    ///
    /// Receive errors never end the loop; they are logged and retried after
    /// an exponential back-off. Cancellation interrupts a blocked receive.
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    pub async fn run(mut self, shutdown: CancellationToken) {
        let backoff = self.backoff.normalized();
        let mut delay = backoff.initial_delay;
        let mut buf = vec![0_u8; self.packet_size];
        info!(
            "listener started: local_addr={:?}, packet_size={}",
            self.source.local_addr().ok(),
            self.packet_size
        );

        loop {
            let received = select! {
                biased;

                () = shutdown.cancelled() => break,
                res = self.source.recv(&mut buf) => res,
            };

            match received {
                Ok(len) => {
                    delay = backoff.initial_delay;
                    if let Err(e) = self.ingest(&buf[..len]) {
                        warn!("reassembler gone, listener stopping: {e}");
                        break;
                    }
                }
                Err(e) => {
                    let local_addr = self.source.local_addr().ok();
                    warn!("receive error: error={e:?}, local_addr={local_addr:?}");
                    select! {
                        biased;

                        () = shutdown.cancelled() => break,
                        () = sleep(delay) => {}
                    }
                    delay = backoff.next_delay(delay);
                }
            }
        }

        debug!(
            "listener stopped: open_groups={}, highest_seen={:?}",
            self.table.tracked_len(),
            self.table.highest_seen()
        );
    }
}

fn outcome(disposition: &Disposition) -> GroupOutcome {
    match disposition {
        Disposition::Complete(_) => GroupOutcome::Complete,
        Disposition::Evicted(_) => GroupOutcome::Evicted,
        Disposition::Pruned { .. } => GroupOutcome::Pruned,
    }
}
