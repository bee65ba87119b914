//! Follower-side reconciliation of host frames
//!
//! Every positions and game frame is a complete snapshot that replaces the
//! mirrored state outright. Nothing is merged, so a follower that misses
//! frames is correct again after the next one of each kind arrives.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::link::LinkMux;
use crate::notify::{self, NotificationSink};
use crate::protocol::{decode, encode, Frame, GameState, PeerId, PlayerInput, Team};

use super::source::NetworkMirrorSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerStatus {
    Active,
    /// The host's channel closed. Terminal for this synchronizer.
    HostLost,
}

/// What a single inbound frame did to the mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Positions,
    Game { transition: Option<Team> },
    JoinLeft,
    Ignored,
    Dropped,
}

pub struct FollowerSync {
    local_id: PeerId,
    host_id: PeerId,
    link: Arc<LinkMux>,
    mirror: Arc<NetworkMirrorSource>,
    sink: Arc<dyn NotificationSink>,
    status: FollowerStatus,
}

impl FollowerSync {
    pub fn new(
        local_id: PeerId,
        host_id: PeerId,
        link: Arc<LinkMux>,
        mirror: Arc<NetworkMirrorSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            local_id,
            host_id,
            link,
            mirror,
            sink,
            status: FollowerStatus::Active,
        }
    }

    pub fn status(&self) -> FollowerStatus {
        self.status
    }

    pub fn host_id(&self) -> &PeerId {
        &self.host_id
    }

    pub fn mirror(&self) -> &Arc<NetworkMirrorSource> {
        &self.mirror
    }

    /// Decode and apply one inbound payload
    pub fn handle_frame(&mut self, peer: &PeerId, bytes: &[u8]) -> FrameOutcome {
        if self.status == FollowerStatus::HostLost {
            return FrameOutcome::Ignored;
        }
        if peer != &self.host_id {
            debug!(peer = %peer, "Ignoring frame from non-host peer");
            return FrameOutcome::Ignored;
        }

        match decode(bytes) {
            Ok(frame) => self.apply(frame),
            Err(e) => {
                warn!(peer = %peer, error = %e, "Dropping undecodable frame");
                FrameOutcome::Dropped
            }
        }
    }

    /// Apply an already decoded frame from the host
    pub fn apply(&mut self, frame: Frame) -> FrameOutcome {
        match frame {
            Frame::Positions(positions) => {
                self.mirror.replace_positions(positions);
                FrameOutcome::Positions
            }
            Frame::Game(game) => {
                let transition = self.replace_game(game);
                FrameOutcome::Game { transition }
            }
            Frame::PlayerJoinLeft(event) => {
                self.sink.notify(notify::join_left(&event.name, event.joined));
                FrameOutcome::JoinLeft
            }
            Frame::Input(_) => {
                debug!("Followers ignore input frames");
                FrameOutcome::Ignored
            }
        }
    }

    /// Swap in the new game state and report a team change for the local
    /// participant, compared against the state this frame replaced
    fn replace_game(&mut self, game: GameState) -> Option<Team> {
        let incoming = game.team_of(&self.local_id);
        let previous = self.mirror.replace_game(game);

        match (previous.team_of(&self.local_id), incoming) {
            (Some(old), Some(new)) if old != new => {
                info!(from = %old, to = %new, "Local participant changed team");
                self.sink.notify(notify::team_change(new));
                Some(new)
            }
            _ => None,
        }
    }

    /// React to a closed channel. Losing the host is terminal.
    pub fn on_peer_disconnected(&mut self, peer: &PeerId) -> FollowerStatus {
        if peer == &self.host_id && self.status == FollowerStatus::Active {
            warn!(host = %peer, "Host connection lost, session cannot continue");
            self.status = FollowerStatus::HostLost;
        } else {
            debug!(peer = %peer, "Non-host peer disconnected");
        }
        self.status
    }

    /// Forward local controls to the host
    pub fn send_input(&self, input: PlayerInput) -> Result<(), SessionError> {
        if self.status == FollowerStatus::HostLost {
            return Err(SessionError::HostLost);
        }
        let bytes = encode(&Frame::Input(input))?;
        self.link.send(&self.host_id, bytes)?;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.mirror.reset();
    }
}
