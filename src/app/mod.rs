//! Session wiring

pub mod session;

pub use session::{Session, SessionCommand, SessionHandle, SessionParams, SessionStatus};
