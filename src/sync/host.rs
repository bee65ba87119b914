//! Host-side packaging of simulation output into frames

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::SessionError;
use crate::link::LinkMux;
use crate::protocol::{
    decode, encode, Frame, GameState, JoinLeft, PeerId, PlayerInput, PositionSnapshot,
};
use crate::util::rate_limit::PeerRateLimiter;

use super::source::{LocalSimulationSource, StateSource};

pub struct HostSync {
    link: Arc<LinkMux>,
    source: Arc<LocalSimulationSource>,
    input_rate: u32,
    limiters: HashMap<PeerId, PeerRateLimiter>,
}

impl HostSync {
    pub fn new(link: Arc<LinkMux>, source: Arc<LocalSimulationSource>, input_rate: u32) -> Self {
        Self {
            link,
            source,
            input_rate,
            limiters: HashMap::new(),
        }
    }

    pub fn source(&self) -> &Arc<LocalSimulationSource> {
        &self.source
    }

    /// Publish this tick's positions locally and broadcast them
    pub fn package_tick(&self, positions: PositionSnapshot) -> Result<usize, SessionError> {
        self.source.publish_positions(positions.clone());
        let bytes = encode(&Frame::Positions(positions))?;
        let delivered = self.link.broadcast(bytes)?;
        trace!(delivered, "Positions frame broadcast");
        Ok(delivered)
    }

    /// Publish a roster mutation and broadcast the full game state at once
    pub fn package_roster(&self, game: GameState) -> Result<usize, SessionError> {
        self.source.publish_game(game.clone());
        let bytes = encode(&Frame::Game(game))?;
        let delivered = self.link.broadcast(bytes)?;
        debug!(delivered, "Game frame broadcast");
        Ok(delivered)
    }

    /// Broadcast a join/leave announcement
    pub fn announce(&self, name: &str, joined: bool) -> Result<usize, SessionError> {
        let bytes = encode(&Frame::PlayerJoinLeft(JoinLeft {
            name: name.to_string(),
            joined,
        }))?;
        Ok(self.link.broadcast(bytes)?)
    }

    /// Send the current game state to a freshly connected peer
    pub fn welcome(&self, peer: &PeerId) -> Result<(), SessionError> {
        let game = GameState::clone(&self.source.game());
        self.link.send(peer, encode(&Frame::Game(game))?)?;
        Ok(())
    }

    /// Decode a follower frame. Only rate-limited input frames come back.
    pub fn handle_frame(&mut self, peer: &PeerId, bytes: &[u8]) -> Option<PlayerInput> {
        let frame = match decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(peer = %peer, error = %e, "Dropping undecodable frame");
                return None;
            }
        };

        match frame {
            Frame::Input(input) => {
                let rate = self.input_rate;
                let limiter = self
                    .limiters
                    .entry(peer.clone())
                    .or_insert_with(|| PeerRateLimiter::new(rate));
                if !limiter.check_input() {
                    debug!(peer = %peer, "Rate limited input frame");
                    return None;
                }
                Some(input)
            }
            other => {
                debug!(peer = %peer, kind = other.kind(), "Host ignores follower-bound frame");
                None
            }
        }
    }

    /// Drop bookkeeping for a disconnected peer
    pub fn forget(&mut self, peer: &PeerId) {
        self.limiters.remove(peer);
    }

    pub fn reset(&mut self) {
        self.limiters.clear();
        self.source.reset();
    }
}
