//! Utilities for exercising a `downlink` receiver in tests.
//!
//! [`DatagramSender`] plays the part of the flight computer: it fragments
//! messages exactly as the receiver expects and lets a test reorder,
//! duplicate or drop individual datagrams before they hit the socket.
//! [`RecordingSink`] and [`RecordingHealth`] capture what the receiver
//! publishes.
//!
//! ```rust,no_run
//! use downlink_testing::DatagramSender;
//!
//! # async fn example(target: std::net::SocketAddr) -> std::io::Result<()> {
//! let mut sender = DatagramSender::bind(target, 16).await?;
//! sender.send_message(b"hello, downlink").await?;
//! # Ok(())
//! # }
//! ```

pub mod logging;
pub mod metrics;
pub mod sender;
pub mod sink;

pub use logging::{LoggerHandle, logger};
pub use metrics::{counter_value, debugging_recorder};
pub use sender::DatagramSender;
pub use sink::{RecordingHealth, RecordingSink};

/// Result type for fallible tests.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
