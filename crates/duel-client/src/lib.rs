//! Duel session client.
//!
//! This crate provides:
//! - Port traits for the two external real-time transports (media and
//!   signal channels)
//! - The reaction synchronizer that keeps the per-player tally consistent
//!   across clients
//! - The session controller state machine orchestrating join and leave
//! - In-memory loopback transports for tests and demos

#![forbid(unsafe_code)]

pub mod loopback;
pub mod ports;
pub mod reactions;
pub mod session;

pub use loopback::{FailureInjection, LoopbackHub};
pub use ports::{
    EventSubscription, LocalTrack, MediaEvents, MediaSession, RemoteTrack, SignalChannel,
    SignalEvents, SignalSession, TrackKind,
};
pub use reactions::ReactionSynchronizer;
pub use session::{SessionController, SessionEvent, SessionPhase, SessionView};
