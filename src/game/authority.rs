//! Authority simulation seam
//!
//! The host advances the canonical game from buffered inputs once per tick.
//! The session only needs the two outputs: the per-tick position snapshot
//! and, through the roster, the full game state.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::protocol::{BallState, GameState, PeerId, PlayerInput, PositionRecord, PositionSnapshot};

/// Host-only simulation driven by the session's tick
pub trait AuthoritySimulation: Send {
    /// Align simulated bodies with the current participant set
    fn sync_roster(&mut self, game: &GameState);

    /// Buffer the latest input for a participant
    fn apply_input(&mut self, id: &PeerId, input: PlayerInput);

    /// Advance by `dt` seconds
    fn step(&mut self, dt: f32);

    fn positions(&self) -> PositionSnapshot;
}

/// Playable area, in board coordinates
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
    /// Keeps bodies this far from every edge
    pub margin: f32,
}

impl Bounds {
    fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        let max_x = (self.width - self.margin).max(self.margin);
        let max_y = (self.height - self.margin).max(self.margin);
        (x.clamp(self.margin, max_x), y.clamp(self.margin, max_y))
    }

    fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }
}

#[derive(Debug, Clone)]
struct Body {
    x: f32,
    y: f32,
    input: PlayerInput,
}

/// Constant-speed movement with board clamping; no collisions
pub struct KinematicAuthority {
    bounds: Bounds,
    /// Units per second at full input
    speed: f32,
    bodies: HashMap<PeerId, Body>,
    ball: BallState,
    rng: ChaCha8Rng,
}

impl KinematicAuthority {
    pub fn new(bounds: Bounds, speed: f32, seed: u64) -> Self {
        let (x, y) = bounds.center();
        Self {
            bounds,
            speed,
            bodies: HashMap::new(),
            ball: BallState { x, y },
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn spawn_point(&mut self) -> (f32, f32) {
        let (max_x, max_y) = self.bounds.clamp(f32::MAX, f32::MAX);
        let margin = self.bounds.margin;
        let x = if max_x > margin {
            self.rng.gen_range(margin..max_x)
        } else {
            margin
        };
        let y = if max_y > margin {
            self.rng.gen_range(margin..max_y)
        } else {
            margin
        };
        (x, y)
    }
}

/// Clamp one input axis to `[-1, 1]`. NaN and infinities count as no input.
fn axis(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

impl AuthoritySimulation for KinematicAuthority {
    fn sync_roster(&mut self, game: &GameState) {
        self.bodies.retain(|id, _| {
            game.participant(id)
                .map(|p| p.team.is_playing())
                .unwrap_or(false)
        });

        let mut joining: Vec<PeerId> = game
            .participants
            .iter()
            .filter(|(id, p)| p.team.is_playing() && !self.bodies.contains_key(*id))
            .map(|(id, _)| id.clone())
            .collect();
        joining.sort();

        for id in joining {
            let (x, y) = self.spawn_point();
            self.bodies.insert(
                id,
                Body {
                    x,
                    y,
                    input: PlayerInput::default(),
                },
            );
        }
    }

    fn apply_input(&mut self, id: &PeerId, input: PlayerInput) {
        if let Some(body) = self.bodies.get_mut(id) {
            body.input = PlayerInput {
                direction: [axis(input.direction[0]), axis(input.direction[1])],
                shooting: input.shooting,
            };
        }
    }

    fn step(&mut self, dt: f32) {
        for body in self.bodies.values_mut() {
            let [dx, dy] = body.input.direction;
            let len = (dx * dx + dy * dy).sqrt();
            if len <= f32::EPSILON {
                continue;
            }
            // Diagonals move no faster than straight lines.
            let scale = self.speed * dt / len.max(1.0);
            let (x, y) = self.bounds.clamp(body.x + dx * scale, body.y + dy * scale);
            body.x = x;
            body.y = y;
        }
    }

    fn positions(&self) -> PositionSnapshot {
        PositionSnapshot {
            positions: self
                .bodies
                .iter()
                .map(|(id, b)| {
                    (
                        id.clone(),
                        PositionRecord {
                            x: b.x,
                            y: b.y,
                            shooting: b.input.shooting,
                        },
                    )
                })
                .collect(),
            ball: self.ball,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Participant, Team};

    const BOUNDS: Bounds = Bounds {
        width: 200.0,
        height: 100.0,
        margin: 10.0,
    };

    fn roster(entries: &[(&str, Team)]) -> GameState {
        let mut game = GameState::new(PeerId::from("A"));
        for (i, (id, team)) in entries.iter().enumerate() {
            game.participants.insert(
                PeerId::from(*id),
                Participant {
                    name: id.to_string(),
                    team: *team,
                    index: i as u32,
                },
            );
        }
        game
    }

    #[test]
    fn spectators_have_no_position() {
        let mut sim = KinematicAuthority::new(BOUNDS, 100.0, 7);
        sim.sync_roster(&roster(&[("A", Team::Red), ("S", Team::Spectator)]));

        let snapshot = sim.positions();
        assert!(snapshot.position(&PeerId::from("A")).is_some());
        assert!(snapshot.position(&PeerId::from("S")).is_none());
        assert_eq!(snapshot.ball, BallState { x: 100.0, y: 50.0 });
    }

    #[test]
    fn departed_participants_are_removed() {
        let mut sim = KinematicAuthority::new(BOUNDS, 100.0, 7);
        sim.sync_roster(&roster(&[("A", Team::Red), ("B", Team::Blue)]));
        sim.sync_roster(&roster(&[("A", Team::Red)]));
        assert!(sim.positions().position(&PeerId::from("B")).is_none());
    }

    #[test]
    fn input_moves_and_clamps_to_board() {
        let mut sim = KinematicAuthority::new(BOUNDS, 1000.0, 7);
        let a = PeerId::from("A");
        sim.sync_roster(&roster(&[("A", Team::Red)]));
        sim.apply_input(
            &a,
            PlayerInput {
                direction: [5.0, 0.0],
                shooting: true,
            },
        );

        for _ in 0..10 {
            sim.step(0.1);
        }

        let p = *sim.positions().position(&a).unwrap();
        assert_eq!(p.x, 190.0);
        assert!(p.shooting);
        assert!(p.y >= 10.0 && p.y <= 90.0);
    }

    #[test]
    fn non_finite_input_leaves_body_in_place() {
        let mut sim = KinematicAuthority::new(BOUNDS, 100.0, 7);
        let a = PeerId::from("A");
        sim.sync_roster(&roster(&[("A", Team::Red)]));
        let before = *sim.positions().position(&a).unwrap();

        sim.apply_input(
            &a,
            PlayerInput {
                direction: [f32::NAN, f32::INFINITY],
                shooting: false,
            },
        );
        sim.step(0.1);
        assert_eq!(*sim.positions().position(&a).unwrap(), before);

        // The body still responds to later, valid input.
        sim.apply_input(
            &a,
            PlayerInput {
                direction: [0.0, 1.0],
                shooting: false,
            },
        );
        sim.step(0.1);
        let after = *sim.positions().position(&a).unwrap();
        assert!(after.x.is_finite() && after.y.is_finite());
        assert_eq!(after.x, before.x);
    }

    #[test]
    fn same_seed_same_spawns() {
        let game = roster(&[("A", Team::Red), ("B", Team::Blue)]);
        let mut one = KinematicAuthority::new(BOUNDS, 100.0, 42);
        let mut two = KinematicAuthority::new(BOUNDS, 100.0, 42);
        one.sync_roster(&game);
        two.sync_roster(&game);
        assert_eq!(one.positions(), two.positions());
    }
}
