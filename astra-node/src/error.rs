use std::time::Duration;

use astra_relay::error::HostError;
use thiserror::Error;

/// Errors that can occur in the node.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {reason}")]
    ConfigError { reason: String },

    #[error("host error: {0}")]
    Host(#[from] HostError),

    #[error("node started without any listen address")]
    NoListenAddrs,

    #[error("shutdown did not complete within {timeout:?}")]
    ShutdownTimeout { timeout: Duration },
}
