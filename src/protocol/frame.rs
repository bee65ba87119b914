//! Wire frame definitions
//! These are the data types exchanged between the host and its followers

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque peer identifier assigned by the session directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier, used when no directory assigns one
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Team membership of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Red,
    Blue,
    /// Not on the pitch; follows another participant's position
    Spectator,
}

impl Team {
    pub fn is_playing(self) -> bool {
        self != Team::Spectator
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Red => f.write_str("red"),
            Team::Blue => f.write_str("blue"),
            Team::Spectator => f.write_str("spectator"),
        }
    }
}

/// A participant record, keyed by `PeerId` inside `GameState`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub team: Team,
    /// Display slot, unique among non-spectators
    pub index: u32,
}

/// Canonical membership state. Only the host produces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    #[serde(rename = "host")]
    pub host_id: PeerId,
    pub participants: HashMap<PeerId, Participant>,
}

impl GameState {
    pub fn new(host_id: PeerId) -> Self {
        Self {
            host_id,
            participants: HashMap::new(),
        }
    }

    pub fn participant(&self, id: &PeerId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn team_of(&self, id: &PeerId) -> Option<Team> {
        self.participants.get(id).map(|p| p.team)
    }
}

/// One participant's position, encoded on the wire as `[x, y, shooting]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f32, f32, bool)", into = "(f32, f32, bool)")]
pub struct PositionRecord {
    pub x: f32,
    pub y: f32,
    pub shooting: bool,
}

impl From<(f32, f32, bool)> for PositionRecord {
    fn from((x, y, shooting): (f32, f32, bool)) -> Self {
        Self { x, y, shooting }
    }
}

impl From<PositionRecord> for (f32, f32, bool) {
    fn from(p: PositionRecord) -> Self {
        (p.x, p.y, p.shooting)
    }
}

/// Ball position, encoded on the wire as `[x, y]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f32, f32)", into = "(f32, f32)")]
pub struct BallState {
    pub x: f32,
    pub y: f32,
}

impl From<(f32, f32)> for BallState {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<BallState> for (f32, f32) {
    fn from(b: BallState) -> Self {
        (b.x, b.y)
    }
}

/// Per-tick output of the authority simulation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub positions: HashMap<PeerId, PositionRecord>,
    pub ball: BallState,
}

impl PositionSnapshot {
    pub fn position(&self, id: &PeerId) -> Option<&PositionRecord> {
        self.positions.get(id)
    }
}

/// Participant join/leave announcement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinLeft {
    pub name: String,
    pub joined: bool,
}

/// Controls sent from a follower to the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Movement direction, each axis in -1.0..=1.0
    pub direction: [f32; 2],
    pub shooting: bool,
}

/// Every message on the synchronization channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Positions of every participant plus the ball (host, every tick)
    Positions(PositionSnapshot),

    /// Full membership state (host, on every roster mutation)
    Game(GameState),

    /// One-shot join/leave event (host)
    PlayerJoinLeft(JoinLeft),

    /// Follower controls (follower to host)
    Input(PlayerInput),
}

impl Frame {
    /// Wire tags accepted by the decoder
    pub const TAGS: [&'static str; 4] = ["positions", "game", "player_join_left", "input"];

    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Positions(_) => "positions",
            Frame::Game(_) => "game",
            Frame::PlayerJoinLeft(_) => "player_join_left",
            Frame::Input(_) => "input",
        }
    }
}
