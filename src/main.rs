//! `downlink` receiver binary.
//!
//! Loads configuration, binds the receive socket and publishes reassembled
//! messages on an in-process channel hub until Ctrl+C.

mod cli;

use std::sync::Arc;

use clap::Parser;
use downlink::{
    config::{ConfigError, ReceiverConfig},
    dispatch::ChannelHub,
    runtime::DownlinkReceiver,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = cli::Cli::parse();
    let config = load_config(&cli)?;
    serve_metrics(&cli)?;

    let hub = Arc::new(ChannelHub::new(config.latch));
    let receiver = DownlinkReceiver::from_config(config, hub)?.bind().await?;
    receiver.run().await;
    Ok(())
}

/// Merge the config file, if any, with command-line overrides.
fn load_config(cli: &cli::Cli) -> Result<ReceiverConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => ReceiverConfig::from_file(path)?,
        None => ReceiverConfig::default(),
    };
    if let Some(message_type) = &cli.message_type {
        config.message_type.clone_from(message_type);
    }
    if !cli.fields.is_empty() {
        config.fields.clone_from(&cli.fields);
    }
    if let Some(address) = &cli.address {
        config.receive_address.clone_from(address);
    }
    if let Some(port) = cli.port {
        config.receive_port = port;
    }
    if let Some(packet_size) = cli.packet_size {
        config.packet_size = packet_size;
    }
    if let Some(tolerance) = cli.tolerance {
        config.fragment_tolerance = tolerance;
    }
    if cli.pessimistic {
        config.pessimistic = true;
    }
    if let Some(prefix) = &cli.prefix {
        config.output_prefix.clone_from(prefix);
    }
    if cli.no_latch {
        config.latch = false;
    }
    if let Some(size) = cli.recv_buffer_size {
        config.recv_buffer_size = size;
    }
    Ok(config)
}

#[cfg(feature = "metrics")]
fn serve_metrics(cli: &cli::Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(addr) = cli.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        tracing::info!(%addr, "serving metrics");
    }
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn serve_metrics(cli: &cli::Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.metrics_addr.is_some() {
        tracing::warn!("--metrics-addr ignored: built without the metrics feature");
    }
    Ok(())
}
