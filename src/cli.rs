//! Command line interface for the `downlink` receiver binary.
//!
//! Every flag overrides the matching key of the optional JSON config file.

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Command line arguments for the `downlink` binary.
#[derive(Debug, Parser)]
#[command(
    name = "downlink",
    version,
    about = "Reassemble fragmented messages from a lossy UDP downlink"
)]
pub struct Cli {
    /// JSON configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Schema used to decode reconstructed messages (`raw` or `fields`).
    #[arg(short, long)]
    pub message_type: Option<String>,

    /// Field published by the `fields` schema; repeat for several.
    #[arg(short, long = "field")]
    pub fields: Vec<String>,

    /// Address to receive datagrams on.
    #[arg(short, long)]
    pub address: Option<String>,

    /// UDP port to receive datagrams on.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Size of every datagram on the link, header included.
    #[arg(long)]
    pub packet_size: Option<usize>,

    /// Sequence-id distance after which an incomplete message is stale.
    #[arg(short, long)]
    pub tolerance: Option<u32>,

    /// Drop stale incomplete messages instead of publishing them with gaps.
    #[arg(long)]
    pub pessimistic: bool,

    /// Namespace for output channels.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Do not retain the last value per channel for late subscribers.
    #[arg(long)]
    pub no_latch: bool,

    /// Kernel receive buffer to request, in bytes.
    #[arg(long)]
    pub recv_buffer_size: Option<usize>,

    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}
