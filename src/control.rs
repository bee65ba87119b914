//! Session-directory boundary
//!
//! The directory service (create/join/leave a game by id) lives outside this
//! crate. The session only issues requests through `ControlChannel` and
//! reacts to `ControlEvent`s delivered by whoever owns that connection.

use tokio::sync::mpsc;

use crate::protocol::PeerId;

/// Events coming from the directory service
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// This client is now part of `game_id` under `assigned_id`
    Joined { game_id: String, assigned_id: PeerId },

    /// A named participant joined the game (consumed by the host)
    ParticipantJoined { id: PeerId, name: String },

    /// A participant left the game (consumed by the host)
    ParticipantLeft { id: PeerId },
}

/// Outbound requests to the directory service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    Create { name: String },
    Join { name: String, game_id: String },
    Leave,
}

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("control channel disconnected")]
    Disconnected,
}

pub trait ControlChannel: Send {
    fn create(&mut self, name: &str) -> Result<(), ControlError>;
    fn join(&mut self, name: &str, game_id: &str) -> Result<(), ControlError>;
    fn leave(&mut self) -> Result<(), ControlError>;
}

/// Queues requests for the task that owns the directory connection
#[derive(Debug, Clone)]
pub struct ChannelControl {
    tx: mpsc::UnboundedSender<ControlRequest>,
}

impl ChannelControl {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ControlRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn push(&self, request: ControlRequest) -> Result<(), ControlError> {
        self.tx
            .send(request)
            .map_err(|_| ControlError::Disconnected)
    }
}

impl ControlChannel for ChannelControl {
    fn create(&mut self, name: &str) -> Result<(), ControlError> {
        self.push(ControlRequest::Create {
            name: name.to_string(),
        })
    }

    fn join(&mut self, name: &str, game_id: &str) -> Result<(), ControlError> {
        self.push(ControlRequest::Join {
            name: name.to_string(),
            game_id: game_id.to_string(),
        })
    }

    fn leave(&mut self) -> Result<(), ControlError> {
        self.push(ControlRequest::Leave)
    }
}
