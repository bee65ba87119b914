//! Host-side participant roster and team assignment

use std::collections::{BTreeSet, HashMap};

use tracing::info;

use crate::protocol::{GameState, Participant, PeerId, Team};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("unknown participant {0}")]
    UnknownParticipant(PeerId),

    #[error("participant {0} already joined")]
    AlreadyJoined(PeerId),

    #[error("{0} team is full")]
    TeamFull(Team),
}

/// Canonical participant set, owned by the host
#[derive(Debug, Clone)]
pub struct Roster {
    host_id: PeerId,
    participants: HashMap<PeerId, Participant>,
    max_per_team: usize,
}

impl Roster {
    pub fn new(host_id: PeerId, max_per_team: usize) -> Self {
        Self {
            host_id,
            participants: HashMap::new(),
            max_per_team,
        }
    }

    pub fn get(&self, id: &PeerId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn team_size(&self, team: Team) -> usize {
        self.participants.values().filter(|p| p.team == team).count()
    }

    /// Add a participant to the smaller team, or to the spectators when
    /// both teams are full
    pub fn join(&mut self, id: PeerId, name: String) -> Result<&Participant, RosterError> {
        if self.participants.contains_key(&id) {
            return Err(RosterError::AlreadyJoined(id));
        }

        let red = self.team_size(Team::Red);
        let blue = self.team_size(Team::Blue);
        let team = if red <= blue && red < self.max_per_team {
            Team::Red
        } else if blue < self.max_per_team {
            Team::Blue
        } else {
            Team::Spectator
        };
        let index = if team.is_playing() {
            self.lowest_free_index()
        } else {
            0
        };

        info!(participant = %id, name = %name, team = %team, index, "Participant joined roster");
        Ok(self
            .participants
            .entry(id)
            .or_insert(Participant { name, team, index }))
    }

    pub fn leave(&mut self, id: &PeerId) -> Result<Participant, RosterError> {
        let participant = self
            .participants
            .remove(id)
            .ok_or_else(|| RosterError::UnknownParticipant(id.clone()))?;
        info!(participant = %id, name = %participant.name, "Participant left roster");
        Ok(participant)
    }

    /// Move a participant. Returns false if it was already on `team`.
    pub fn set_team(&mut self, id: &PeerId, team: Team) -> Result<bool, RosterError> {
        let current = self
            .participants
            .get(id)
            .map(|p| p.team)
            .ok_or_else(|| RosterError::UnknownParticipant(id.clone()))?;

        if current == team {
            return Ok(false);
        }
        if team.is_playing() && self.team_size(team) >= self.max_per_team {
            return Err(RosterError::TeamFull(team));
        }

        let index = match (current.is_playing(), team.is_playing()) {
            (false, true) => Some(self.lowest_free_index()),
            (true, false) => Some(0),
            _ => None,
        };

        if let Some(participant) = self.participants.get_mut(id) {
            participant.team = team;
            if let Some(index) = index {
                participant.index = index;
            }
        }
        info!(participant = %id, from = %current, to = %team, "Participant changed team");
        Ok(true)
    }

    /// Immutable copy for a game frame
    pub fn snapshot(&self) -> GameState {
        GameState {
            host_id: self.host_id.clone(),
            participants: self.participants.clone(),
        }
    }

    fn lowest_free_index(&self) -> u32 {
        let taken: BTreeSet<u32> = self
            .participants
            .values()
            .filter(|p| p.team.is_playing())
            .map(|p| p.index)
            .collect();
        (0..).find(|i| !taken.contains(i)).unwrap_or_default()
    }
}
