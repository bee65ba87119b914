//! Error types shared across the session

use crate::control::ControlError;
use crate::protocol::{EncodeError, PeerId};

/// Link multiplexer errors
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("no open channel to peer {0}")]
    UnknownPeer(PeerId),

    #[error("channel to peer {0} is closed")]
    ChannelClosed(PeerId),

    #[error("outbound queue to peer {0} is full")]
    Full(PeerId),

    #[error("link multiplexer is closed")]
    Closed,
}

/// Session-level errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error("host connection lost")]
    HostLost,

    #[error("operation requires the host role")]
    NotHost,

    #[error("session is closed")]
    Closed,
}
