#![doc(html_root_url = "https://docs.rs/downlink/latest")]
//! Receiver-side reassembly of fragmented messages from a lossy UDP link.
//!
//! Large application messages arrive split across many fixed-size datagrams,
//! possibly out of order, duplicated or with pieces missing, and there is no
//! way to ask the sender for a retransmission. The pipeline is:
//!
//! socket → [`listener::Listener`] → [`fragment::FragmentTable`] →
//! [`handoff`] queue → [`reassembler::Reassembler`] → [`codec`] →
//! [`dispatch`].
//!
//! [`runtime::DownlinkReceiver`] wires the stages together.

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fragment;
pub mod handoff;
pub mod health;
pub mod listener;
pub mod metrics;
pub mod panic;
pub mod reassembler;
pub mod runtime;

#[cfg(test)]
mod test_helpers;

pub use codec::{MessageCodec, Schema};
pub use config::{ConfigError, ReceiverConfig};
pub use dispatch::{ChannelHub, OutputSink};
pub use error::{ReceiverError, Result};
pub use fragment::{Fragment, FragmentGroup, FragmentTable, SeqId};
pub use runtime::{BoundReceiver, DownlinkReceiver};
