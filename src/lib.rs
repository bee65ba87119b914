//! Pitch Sync - host/follower state synchronization for peer-to-peer matches
//!
//! One participant (the host) runs the authoritative simulation and streams
//! it to every follower over already-open peer channels:
//! - `protocol`: frame types and the wire codec
//! - `link`: per-peer channel multiplexer
//! - `sync`: host packaging, follower reconciliation, role-selected state
//! - `camera`: viewport origin and spectator follow target
//! - `app`: the session event loop tying it together

pub mod app;
pub mod camera;
pub mod config;
pub mod control;
pub mod error;
pub mod game;
pub mod link;
pub mod notify;
pub mod protocol;
pub mod sync;
pub mod util;

pub use app::{Session, SessionCommand, SessionHandle, SessionParams, SessionStatus};
pub use config::Config;
pub use error::{LinkError, SessionError};
