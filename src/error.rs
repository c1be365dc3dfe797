//! Canonical startup error type for the receiver.
//!
//! Only configuration and socket setup can fail the process. Everything that
//! goes wrong once datagrams flow is logged and absorbed by the stage that
//! saw it.

use std::{io, net::SocketAddr};

use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned while preparing a receiver.
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The receive address could not be resolved.
    #[error("failed to resolve {address}:{port}: {source}")]
    Resolve {
        /// Configured host.
        address: String,
        /// Configured port.
        port: u16,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// The receive address resolved to nothing.
    #[error("{address}:{port} resolved to no addresses")]
    NoAddress {
        /// Configured host.
        address: String,
        /// Configured port.
        port: u16,
    },
    /// The socket could not be created or bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Resolved bind target.
        addr: SocketAddr,
        /// Socket error.
        #[source]
        source: io::Error,
    },
}

/// Result alias for receiver setup.
pub type Result<T> = std::result::Result<T, ReceiverError>;
