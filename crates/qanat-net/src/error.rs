//! Error handling for the network layer.

use thiserror::Error;

/// Result type for network-layer operations.
pub type NetResult<T> = Result<T, NetError>;

/// Errors that can occur in channels, agents, and the orchestrator.
///
/// Note that stochastic qubit loss is *not* an error: a lost qubit is a
/// normal `None` value flowing out of a channel.
#[derive(Error, Debug)]
pub enum NetError {
    /// The named peer has no channel to this agent.
    #[error("not connected to peer: {0}")]
    NotConnected(String),

    /// The other endpoint of a channel was dropped.
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// Invalid noise-model construction.
    #[error("noise model configuration: {0}")]
    NoiseConfig(String),

    /// Classical payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An agent task panicked or returned an error.
    #[error("agent failed: {0}")]
    AgentFailed(String),

    /// State-engine error.
    #[error(transparent)]
    Core(#[from] qanat_core::CoreError),
}
