//! Receiver configuration.
//!
//! Values come from defaults, an optional JSON file and command-line
//! overrides, in that order. [`ReceiverConfig::validate`] runs before any
//! socket is bound so misconfiguration is reported at startup.

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    codec::normalize_prefix,
    fragment::{EvictionPolicy, HEADER_LEN},
};

/// Largest UDP payload carried by an IPv4 datagram.
pub const MAX_PACKET_SIZE: usize = 65_507;

/// Receiver configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Name of the schema used to decode reconstructed buffers.
    #[serde(default = "default_message_type")]
    pub message_type: String,

    /// Field names published by the `fields` schema.
    #[serde(default)]
    pub fields: Vec<String>,

    /// Host name or address to bind to.
    #[serde(default = "default_receive_address")]
    pub receive_address: String,

    /// UDP port to bind to.
    #[serde(default = "default_receive_port")]
    pub receive_port: u16,

    /// Size of every datagram on the link, header included.
    #[serde(default = "default_packet_size")]
    pub packet_size: usize,

    /// Sequence-id distance after which an incomplete group is stale.
    #[serde(default = "default_fragment_tolerance")]
    pub fragment_tolerance: u32,

    /// Drop stale incomplete groups instead of dispatching them partially.
    #[serde(default)]
    pub pessimistic: bool,

    /// Namespace for output channels.
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,

    /// Retain the last value per output channel for late subscribers.
    #[serde(default = "default_true")]
    pub latch: bool,

    /// Receive buffer size requested from the operating system (bytes).
    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,

    /// Health report period in milliseconds.
    #[serde(default = "default_health_period_ms")]
    pub health_period_ms: u64,

    /// Upper bound on waiting for tasks at shutdown, in milliseconds.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

fn default_message_type() -> String { crate::codec::schema::RAW.to_owned() }

fn default_receive_address() -> String { "localhost".to_owned() }

fn default_receive_port() -> u16 { 16484 }

fn default_packet_size() -> usize { 1400 }

fn default_fragment_tolerance() -> u32 { 20 }

fn default_output_prefix() -> String { "/from_fc".to_owned() }

fn default_true() -> bool { true }

fn default_recv_buffer_size() -> usize { 1_564_475_392 }

fn default_health_period_ms() -> u64 { 100 }

fn default_shutdown_timeout_ms() -> u64 { 1000 }

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            message_type: default_message_type(),
            fields: Vec::new(),
            receive_address: default_receive_address(),
            receive_port: default_receive_port(),
            packet_size: default_packet_size(),
            fragment_tolerance: default_fragment_tolerance(),
            pessimistic: false,
            output_prefix: default_output_prefix(),
            latch: true,
            recv_buffer_size: default_recv_buffer_size(),
            health_period_ms: default_health_period_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl ReceiverConfig {
    /// Load configuration from a JSON file.
    ///
    /// Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid JSON for this structure.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if `json` does not describe a
    /// configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending
    /// option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.packet_size <= HEADER_LEN {
            return Err(ConfigError::InvalidValue(format!(
                "packet_size must exceed the {HEADER_LEN}-byte header, got {}",
                self.packet_size
            )));
        }
        if self.packet_size > MAX_PACKET_SIZE {
            return Err(ConfigError::InvalidValue(format!(
                "packet_size must not exceed {MAX_PACKET_SIZE}, got {}",
                self.packet_size
            )));
        }
        if self.health_period_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "health_period_ms cannot be 0".into(),
            ));
        }
        if self.shutdown_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "shutdown_timeout_ms cannot be 0".into(),
            ));
        }
        Ok(())
    }

    /// Payload bytes carried by each fragment.
    #[must_use]
    pub fn payload_len(&self) -> usize { self.packet_size.saturating_sub(HEADER_LEN) }

    /// Eviction policy selected by [`pessimistic`](Self::pessimistic).
    #[must_use]
    pub fn eviction_policy(&self) -> EvictionPolicy { EvictionPolicy::from_pessimistic(self.pessimistic) }

    /// Output prefix with a leading `/`, or empty for the root namespace.
    #[must_use]
    pub fn normalized_prefix(&self) -> String { normalize_prefix(&self.output_prefix) }

    /// Health report period.
    #[must_use]
    pub fn health_period(&self) -> Duration { Duration::from_millis(self.health_period_ms) }

    /// Shutdown wait bound.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration { Duration::from_millis(self.shutdown_timeout_ms) }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path as given.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid JSON for [`ReceiverConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// An option is outside its accepted range.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
    /// No schema is registered under the configured name.
    #[error("unknown message type {message_type:?}; expected one of {known:?}")]
    UnknownMessageType {
        /// Name from the configuration.
        message_type: String,
        /// Registered schema names.
        known: &'static [&'static str],
    },
    /// The schema needs at least one field name.
    #[error("message type {message_type:?} requires at least one field")]
    MissingFields {
        /// Name from the configuration.
        message_type: String,
    },
}
