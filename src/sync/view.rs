//! Entries the presentation surface should draw

use crate::protocol::{GameState, Participant, PeerId, PositionRecord, PositionSnapshot};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderable<'a> {
    pub id: &'a PeerId,
    pub participant: &'a Participant,
    pub position: PositionRecord,
}

/// Playing participants that have both a roster entry and a position, in
/// slot order. Position ids without a roster entry are skipped.
pub fn renderables<'a>(game: &'a GameState, positions: &PositionSnapshot) -> Vec<Renderable<'a>> {
    let mut entries: Vec<Renderable<'a>> = game
        .participants
        .iter()
        .filter(|(_, participant)| participant.team.is_playing())
        .filter_map(|(id, participant)| {
            positions.position(id).map(|position| Renderable {
                id,
                participant,
                position: *position,
            })
        })
        .collect();
    entries.sort_by(|a, b| {
        a.participant
            .index
            .cmp(&b.participant.index)
            .then_with(|| a.id.cmp(b.id))
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Team;

    #[test]
    fn skips_spectators_and_missing_positions() {
        let mut game = GameState::new(PeerId::from("A"));
        for (id, team, index) in [
            ("A", Team::Red, 1),
            ("B", Team::Blue, 0),
            ("S", Team::Spectator, 0),
            ("N", Team::Red, 2),
        ] {
            game.participants.insert(
                PeerId::from(id),
                Participant {
                    name: id.to_string(),
                    team,
                    index,
                },
            );
        }

        let mut positions = PositionSnapshot::default();
        for id in ["A", "B", "S"] {
            positions.positions.insert(
                PeerId::from(id),
                PositionRecord {
                    x: 0.0,
                    y: 0.0,
                    shooting: false,
                },
            );
        }

        let ids: Vec<&str> = renderables(&game, &positions)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["B", "A"]);
    }
}
