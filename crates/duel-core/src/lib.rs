//! Core duel protocol types and the signal wire codec.
//!
//! This crate provides:
//! - Roles and participant identity resolution
//! - The per-player reaction tally carried between clients
//! - The delimited-string payload codec (`react:` / `sync:`) used on the
//!   signal channel

#![forbid(unsafe_code)]

pub mod identity;
pub mod payload;
pub mod tally;

pub use identity::{
    resolve_identity, ParticipantIdentity, Role, PLAYER1_IDENTITY, PLAYER2_IDENTITY,
    VIEWER_ID_SPACE,
};
pub use payload::{PayloadError, SignalPayload, REACT_PREFIX, SYNC_PREFIX};
pub use tally::{PlayerKey, ReactionTally};
