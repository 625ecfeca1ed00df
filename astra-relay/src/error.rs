use thiserror::Error;

/// Errors that can occur in the node host layer.
#[derive(Debug, Error)]
pub enum HostError {
    /// Failed to build the transport stack.
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// Failed to build the network behaviour.
    #[error("behaviour error: {reason}")]
    Behaviour { reason: String },

    /// The keypair seed could not be turned into an identity.
    #[error("invalid keypair seed: {reason}")]
    InvalidKeypairSeed { reason: String },

    /// A configured listen address is not a valid multiaddr.
    #[error("invalid listen address '{addr}': {reason}")]
    InvalidListenAddr { addr: String, reason: String },

    /// The transport refused to listen on an address.
    #[error("failed to listen on {addr}: {reason}")]
    Listen { addr: String, reason: String },

    /// No listener reported a bound address before the startup timeout.
    #[error("no listen address bound within {timeout_ms} ms")]
    NoListenAddrs { timeout_ms: u64 },

    /// The relay limits cannot produce a working relay.
    #[error("invalid relay limits: {reason}")]
    InvalidRelayLimits { reason: String },

    /// A relay service is already attached to this node.
    #[error("relay already attached")]
    RelayAlreadyAttached,

    /// The node has been closed and no longer accepts changes.
    #[error("node is closed")]
    NodeClosed,

    /// `close` was called on a node that was already closed.
    #[error("node already closed")]
    AlreadyClosed,

    /// Releasing the node's resources failed.
    #[error("close error: {reason}")]
    Close { reason: String },
}

impl HostError {
    /// Whether the caller may carry on as if the operation had succeeded.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, HostError::AlreadyClosed)
    }
}
