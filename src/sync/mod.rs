//! State synchronizer: host packaging, follower reconciliation, and the
//! role-selected state source both sides publish into

pub mod follower;
pub mod host;
pub mod source;
pub mod view;

pub use follower::{FollowerStatus, FollowerSync, FrameOutcome};
pub use host::HostSync;
pub use source::{
    select_source, LocalSimulationSource, NetworkMirrorSource, Role, SnapshotSlot, StateSource,
};
pub use view::{renderables, Renderable};
