//! Synchronization protocol: frame types and the wire codec

pub mod codec;
pub mod frame;

pub use codec::{decode, encode, DecodeError, EncodeError};
pub use frame::{
    BallState, Frame, GameState, JoinLeft, Participant, PeerId, PlayerInput, PositionRecord,
    PositionSnapshot, Team,
};
