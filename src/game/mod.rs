//! Host-side game state: roster and authority simulation

pub mod authority;
pub mod roster;

pub use authority::{AuthoritySimulation, Bounds, KinematicAuthority};
pub use roster::{Roster, RosterError};
