//! Camera follow controller
//!
//! Players are followed by their own position. Spectators follow a selected
//! target and keep the last origin while that target has no position.

use crate::protocol::{GameState, PeerId, PositionSnapshot, Team};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Viewport origin for `local_id` given the active state.
///
/// `previous` is returned when spectating a target with no known position;
/// `fallback` is used when a player's own position is not known yet.
pub fn compute_origin(
    local_id: &PeerId,
    game: &GameState,
    positions: &PositionSnapshot,
    spectate_target: Option<&PeerId>,
    previous: Point,
    fallback: Point,
) -> Point {
    if game.team_of(local_id) == Some(Team::Spectator) {
        return spectate_target
            .and_then(|target| positions.position(target))
            .map(|p| Point { x: p.x, y: p.y })
            .unwrap_or(previous);
    }

    positions
        .position(local_id)
        .map(|p| Point { x: p.x, y: p.y })
        .unwrap_or(fallback)
}

/// Playing participants a spectator can follow, in slot order
pub fn spectate_candidates(game: &GameState) -> Vec<PeerId> {
    let mut playing: Vec<(&PeerId, u32)> = game
        .participants
        .iter()
        .filter(|(_, p)| p.team.is_playing())
        .map(|(id, p)| (id, p.index))
        .collect();
    playing.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    playing.into_iter().map(|(id, _)| id.clone()).collect()
}

/// Holds the current origin and the spectate selection
#[derive(Debug, Clone)]
pub struct CameraController {
    origin: Point,
    fallback: Point,
    spectate_target: Option<PeerId>,
}

impl CameraController {
    pub fn new(fallback: Point) -> Self {
        Self {
            origin: fallback,
            fallback,
            spectate_target: None,
        }
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn spectate_target(&self) -> Option<&PeerId> {
        self.spectate_target.as_ref()
    }

    /// Select whom to follow. Validity is checked on the next update.
    pub fn set_spectate_target(&mut self, target: Option<PeerId>) {
        self.spectate_target = target;
    }

    /// Step to the next (or previous) candidate, wrapping around
    pub fn cycle_target(&mut self, game: &GameState, forward: bool) -> Option<&PeerId> {
        let candidates = spectate_candidates(game);
        if candidates.is_empty() {
            self.spectate_target = None;
            return None;
        }

        let len = candidates.len();
        let current = self
            .spectate_target
            .as_ref()
            .and_then(|t| candidates.iter().position(|c| c == t));
        let next = match (current, forward) {
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
            (None, true) => 0,
            (None, false) => len - 1,
        };

        self.spectate_target = Some(candidates[next].clone());
        self.spectate_target.as_ref()
    }

    /// Recompute the origin. Returns the new origin only when it changed.
    pub fn update(
        &mut self,
        local_id: &PeerId,
        game: &GameState,
        positions: &PositionSnapshot,
    ) -> Option<Point> {
        let next = compute_origin(
            local_id,
            game,
            positions,
            self.spectate_target.as_ref(),
            self.origin,
            self.fallback,
        );

        if next == self.origin {
            return None;
        }
        self.origin = next;
        Some(next)
    }

    pub fn reset(&mut self) {
        self.origin = self.fallback;
        self.spectate_target = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Participant, PositionRecord};

    const FALLBACK: Point = Point { x: 610.0, y: 360.0 };

    fn game(entries: &[(&str, Team, u32)]) -> GameState {
        let mut game = GameState::new(PeerId::from("A"));
        for (id, team, index) in entries {
            game.participants.insert(
                PeerId::from(*id),
                Participant {
                    name: id.to_string(),
                    team: *team,
                    index: *index,
                },
            );
        }
        game
    }

    fn positions(entries: &[(&str, f32, f32)]) -> PositionSnapshot {
        let mut snapshot = PositionSnapshot::default();
        for (id, x, y) in entries {
            snapshot.positions.insert(
                PeerId::from(*id),
                PositionRecord {
                    x: *x,
                    y: *y,
                    shooting: false,
                },
            );
        }
        snapshot
    }

    #[test]
    fn player_follows_own_position() {
        let g = game(&[("A", Team::Red, 0)]);
        let p = positions(&[("A", 10.0, 20.0)]);
        let origin = compute_origin(&PeerId::from("A"), &g, &p, None, Point::default(), FALLBACK);
        assert_eq!(origin, Point { x: 10.0, y: 20.0 });
    }

    #[test]
    fn player_without_position_uses_board_center() {
        let g = game(&[("A", Team::Red, 0)]);
        let p = PositionSnapshot::default();
        let previous = Point { x: 1.0, y: 1.0 };
        let origin = compute_origin(&PeerId::from("A"), &g, &p, None, previous, FALLBACK);
        assert_eq!(origin, FALLBACK);
    }

    #[test]
    fn spectator_follows_target() {
        let g = game(&[("A", Team::Red, 0), ("S", Team::Spectator, 0)]);
        let p = positions(&[("A", 42.0, 7.0)]);
        let target = PeerId::from("A");
        let origin = compute_origin(
            &PeerId::from("S"),
            &g,
            &p,
            Some(&target),
            Point::default(),
            FALLBACK,
        );
        assert_eq!(origin, Point { x: 42.0, y: 7.0 });
    }

    #[test]
    fn spectator_holds_previous_origin_for_missing_target() {
        let g = game(&[("A", Team::Red, 0), ("S", Team::Spectator, 0)]);
        let p = positions(&[("A", 42.0, 7.0)]);
        let previous = Point { x: 3.0, y: 4.0 };
        let gone = PeerId::from("gone");

        let origin = compute_origin(&PeerId::from("S"), &g, &p, Some(&gone), previous, FALLBACK);
        assert_eq!(origin, previous);

        let origin = compute_origin(&PeerId::from("S"), &g, &p, None, previous, FALLBACK);
        assert_eq!(origin, previous);
    }

    #[test]
    fn update_suppresses_unchanged_origin() {
        let mut camera = CameraController::new(FALLBACK);
        let g = game(&[("A", Team::Red, 0)]);
        let p = positions(&[("A", 10.0, 10.0)]);
        let me = PeerId::from("A");

        assert_eq!(camera.update(&me, &g, &p), Some(Point { x: 10.0, y: 10.0 }));
        assert_eq!(camera.update(&me, &g, &p), None);

        let moved = positions(&[("A", 11.0, 10.0)]);
        assert_eq!(camera.update(&me, &g, &moved), Some(Point { x: 11.0, y: 10.0 }));
    }

    #[test]
    fn cycle_walks_playing_participants_by_slot() {
        let g = game(&[
            ("A", Team::Red, 1),
            ("B", Team::Blue, 0),
            ("S", Team::Spectator, 0),
        ]);
        let mut camera = CameraController::new(FALLBACK);

        assert_eq!(camera.cycle_target(&g, true), Some(&PeerId::from("B")));
        assert_eq!(camera.cycle_target(&g, true), Some(&PeerId::from("A")));
        assert_eq!(camera.cycle_target(&g, true), Some(&PeerId::from("B")));
        assert_eq!(camera.cycle_target(&g, false), Some(&PeerId::from("A")));
    }

    #[test]
    fn cycle_with_nobody_playing_clears_target() {
        let g = game(&[("S", Team::Spectator, 0)]);
        let mut camera = CameraController::new(FALLBACK);
        camera.set_spectate_target(Some(PeerId::from("old")));
        assert_eq!(camera.cycle_target(&g, true), None);
        assert_eq!(camera.spectate_target(), None);
    }
}
