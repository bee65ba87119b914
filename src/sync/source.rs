//! Role-dependent state sources
//!
//! Rendering and camera code read the active participant set and positions
//! through `StateSource`. On the host the source is fed by the local
//! simulation; on a follower it is fed by frames from the host. Which one is
//! active is decided once, by `select_source`.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::protocol::{GameState, PeerId, PositionSnapshot};

/// Single-writer slot holding an immutable snapshot. Readers get an `Arc`
/// to a complete value; writers swap in a new one.
#[derive(Debug, Default)]
pub struct SnapshotSlot<T> {
    current: RwLock<Arc<T>>,
}

impl<T> SnapshotSlot<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
        }
    }

    pub fn load(&self) -> Arc<T> {
        self.current.read().clone()
    }

    /// Swap in a new snapshot, returning the one it replaced
    pub fn store(&self, value: T) -> Arc<T> {
        std::mem::replace(&mut *self.current.write(), Arc::new(value))
    }
}

/// Read-only view of the state the local viewer should see
pub trait StateSource: Send + Sync {
    fn game(&self) -> Arc<GameState>;
    fn positions(&self) -> Arc<PositionSnapshot>;
}

#[derive(Debug, Default)]
struct Slots {
    game: SnapshotSlot<GameState>,
    positions: SnapshotSlot<PositionSnapshot>,
}

impl Slots {
    fn reset(&self) {
        self.game.store(GameState::default());
        self.positions.store(PositionSnapshot::default());
    }
}

/// Live output of the host's own simulation
#[derive(Debug, Default)]
pub struct LocalSimulationSource {
    slots: Slots,
}

impl LocalSimulationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_game(&self, game: GameState) {
        self.slots.game.store(game);
    }

    pub fn publish_positions(&self, positions: PositionSnapshot) {
        self.slots.positions.store(positions);
    }

    pub fn reset(&self) {
        self.slots.reset();
    }
}

impl StateSource for LocalSimulationSource {
    fn game(&self) -> Arc<GameState> {
        self.slots.game.load()
    }

    fn positions(&self) -> Arc<PositionSnapshot> {
        self.slots.positions.load()
    }
}

/// Most recent state received from the host
#[derive(Debug, Default)]
pub struct NetworkMirrorSource {
    slots: Slots,
}

impl NetworkMirrorSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the mirrored game state, returning the previous one
    pub fn replace_game(&self, game: GameState) -> Arc<GameState> {
        self.slots.game.store(game)
    }

    pub fn replace_positions(&self, positions: PositionSnapshot) {
        self.slots.positions.store(positions);
    }

    pub fn reset(&self) {
        self.slots.reset();
    }
}

impl StateSource for NetworkMirrorSource {
    fn game(&self) -> Arc<GameState> {
        self.slots.game.load()
    }

    fn positions(&self) -> Arc<PositionSnapshot> {
        self.slots.positions.load()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Follower,
}

impl Role {
    pub fn of(local_id: &PeerId, host_id: &PeerId) -> Self {
        if local_id == host_id {
            Role::Host
        } else {
            Role::Follower
        }
    }
}

/// Pick the active source for `(local_id, host_id)`
pub fn select_source(
    local_id: &PeerId,
    host_id: &PeerId,
    local: &Arc<LocalSimulationSource>,
    mirror: &Arc<NetworkMirrorSource>,
) -> Arc<dyn StateSource> {
    match Role::of(local_id, host_id) {
        Role::Host => local.clone(),
        Role::Follower => mirror.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::BallState;

    #[test]
    fn role_follows_id_comparison() {
        let a = PeerId::from("A");
        let b = PeerId::from("B");
        assert_eq!(Role::of(&a, &a), Role::Host);
        assert_eq!(Role::of(&b, &a), Role::Follower);
    }

    #[test]
    fn select_source_reads_from_matching_producer() {
        let local = Arc::new(LocalSimulationSource::new());
        let mirror = Arc::new(NetworkMirrorSource::new());
        local.publish_positions(PositionSnapshot {
            ball: BallState { x: 1.0, y: 1.0 },
            ..Default::default()
        });
        mirror.replace_positions(PositionSnapshot {
            ball: BallState { x: 2.0, y: 2.0 },
            ..Default::default()
        });

        let a = PeerId::from("A");
        let b = PeerId::from("B");
        let host_view = select_source(&a, &a, &local, &mirror);
        let follower_view = select_source(&b, &a, &local, &mirror);

        assert_eq!(host_view.positions().ball, BallState { x: 1.0, y: 1.0 });
        assert_eq!(follower_view.positions().ball, BallState { x: 2.0, y: 2.0 });
    }

    #[test]
    fn readers_keep_their_snapshot_across_replacement() {
        let mirror = NetworkMirrorSource::new();
        mirror.replace_game(GameState::new(PeerId::from("A")));
        let held = mirror.game();

        let previous = mirror.replace_game(GameState::new(PeerId::from("Z")));

        assert_eq!(held.host_id, PeerId::from("A"));
        assert_eq!(previous.host_id, PeerId::from("A"));
        assert_eq!(mirror.game().host_id, PeerId::from("Z"));
    }

    #[test]
    fn reset_restores_empty_state() {
        let mirror = NetworkMirrorSource::new();
        mirror.replace_game(GameState::new(PeerId::from("A")));
        mirror.reset();
        assert_eq!(*mirror.game(), GameState::default());
        assert_eq!(*mirror.positions(), PositionSnapshot::default());
    }
}
